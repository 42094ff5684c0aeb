//! Invocation contexts.
//!
//! A context is built once per inbound interaction or message and then shared
//! (behind an [`Arc`]) between the command callback, its checks and hooks, and
//! every follow-up event the invocation produces.

use crate::error::RouterError;
use crate::id::Snowflake;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Option type code of a subcommand.
pub const SUB_COMMAND: u64 = 1;
/// Option type code of a subcommand group.
pub const SUB_COMMAND_GROUP: u64 = 2;

/// The kind of an inbound interaction, by wire type code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InteractionKind {
    Ping,
    ApplicationCommand,
    Component,
    Autocomplete,
    ModalSubmit,
}

impl InteractionKind {
    /// Maps a wire type code to a kind.
    pub fn from_code(code: u64) -> Option<Self> {
        match code {
            1 => Some(Self::Ping),
            2 => Some(Self::ApplicationCommand),
            3 => Some(Self::Component),
            4 => Some(Self::Autocomplete),
            5 => Some(Self::ModalSubmit),
            _ => None,
        }
    }

    /// Returns the wire type code.
    pub fn code(self) -> u64 {
        match self {
            Self::Ping => 1,
            Self::ApplicationCommand => 2,
            Self::Component => 3,
            Self::Autocomplete => 4,
            Self::ModalSubmit => 5,
        }
    }
}

/// Component type codes carried by component interactions.
pub mod component_type {
    pub const ACTION_ROW: u64 = 1;
    pub const BUTTON: u64 = 2;
    pub const STRING_SELECT: u64 = 3;
    pub const TEXT_INPUT: u64 = 4;
    pub const USER_SELECT: u64 = 5;
    pub const ROLE_SELECT: u64 = 6;
    pub const MENTIONABLE_SELECT: u64 = 7;
    pub const CHANNEL_SELECT: u64 = 8;

    /// Returns true for every select-menu flavour.
    pub fn is_select(code: u64) -> bool {
        matches!(
            code,
            STRING_SELECT | USER_SELECT | ROLE_SELECT | MENTIONABLE_SELECT | CHANNEL_SELECT
        )
    }
}

/// The context of a single interaction.
#[derive(Debug)]
pub struct InteractionContext {
    /// Interaction id.
    pub id: Snowflake,
    /// Continuation token used to respond.
    pub token: String,
    /// Interaction kind.
    pub kind: InteractionKind,
    pub guild_id: Option<Snowflake>,
    pub channel_id: Option<Snowflake>,
    /// The channel object, either inline in the payload or fetched from the cache.
    pub channel: Option<Value>,
    pub author_id: Option<Snowflake>,
    /// Effective permissions of the invoking member, if invoked in a guild.
    pub member_permissions: Option<u64>,
    /// Remote id of the invoked command.
    pub command_id: Option<Snowflake>,
    /// Command type code (chat input, user, message).
    pub command_type: Option<u64>,
    /// Target of a context-menu command.
    pub target_id: Option<Snowflake>,
    /// Resolved command name (`"base group sub"`) or the custom id for
    /// components and modals.
    pub invoke_target: String,
    /// Leaf option values by name.
    pub kwargs: Map<String, Value>,
    /// Name of the focused option of an autocomplete request.
    pub focused_option: Option<String>,
    pub custom_id: Option<String>,
    pub component_type: Option<u64>,
    /// Selected values of a select menu.
    pub values: Vec<String>,
    /// Message the component is attached to.
    pub message_id: Option<Snowflake>,
    /// Modal field values by custom id.
    pub responses: BTreeMap<String, String>,
    /// The untouched inbound payload.
    pub payload: Value,
    responded: AtomicBool,
    deferred: AtomicBool,
}

impl InteractionContext {
    /// Builds a context from a raw interaction payload.
    pub fn from_payload(payload: &Value) -> Result<Self, RouterError> {
        let code = payload
            .get("type")
            .and_then(Value::as_u64)
            .ok_or(RouterError::MalformedPayload("type"))?;
        let kind =
            InteractionKind::from_code(code).ok_or(RouterError::UnknownInteractionType(code))?;
        let id = snowflake_at(payload, "id").ok_or(RouterError::MalformedPayload("id"))?;
        let token = payload
            .get("token")
            .and_then(Value::as_str)
            .ok_or(RouterError::MalformedPayload("token"))?
            .to_owned();

        let member = payload.get("member");
        let author_id = member
            .and_then(|m| m.get("user"))
            .or_else(|| payload.get("user"))
            .and_then(|u| snowflake_at(u, "id"));
        let member_permissions = member
            .and_then(|m| m.get("permissions"))
            .and_then(Value::as_str)
            .and_then(|p| p.parse().ok());
        let channel = payload.get("channel").filter(|c| c.is_object()).cloned();
        let channel_id = snowflake_at(payload, "channel_id")
            .or_else(|| channel.as_ref().and_then(|c| snowflake_at(c, "id")));

        let mut ctx = Self {
            id,
            token,
            kind,
            guild_id: snowflake_at(payload, "guild_id"),
            channel_id,
            channel,
            author_id,
            member_permissions,
            command_id: None,
            command_type: None,
            target_id: None,
            invoke_target: String::new(),
            kwargs: Map::new(),
            focused_option: None,
            custom_id: None,
            component_type: None,
            values: Vec::new(),
            message_id: None,
            responses: BTreeMap::new(),
            payload: payload.clone(),
            responded: AtomicBool::new(false),
            deferred: AtomicBool::new(false),
        };

        let data = payload.get("data").unwrap_or(&Value::Null);
        match kind {
            InteractionKind::Ping => {}
            InteractionKind::ApplicationCommand | InteractionKind::Autocomplete => {
                let (target, kwargs, focused) = resolve_command(data)?;
                ctx.invoke_target = target;
                ctx.kwargs = kwargs;
                ctx.focused_option = focused;
                ctx.command_id = snowflake_at(data, "id");
                ctx.command_type = data.get("type").and_then(Value::as_u64);
                ctx.target_id = snowflake_at(data, "target_id");
            }
            InteractionKind::Component => {
                let custom_id = custom_id_of(data)?;
                ctx.invoke_target = custom_id.clone();
                ctx.custom_id = Some(custom_id);
                ctx.component_type = data.get("component_type").and_then(Value::as_u64);
                ctx.values = data
                    .get("values")
                    .and_then(Value::as_array)
                    .map(|values| {
                        values
                            .iter()
                            .filter_map(|v| v.as_str().map(str::to_owned))
                            .collect()
                    })
                    .unwrap_or_default();
                ctx.message_id = payload.get("message").and_then(|m| snowflake_at(m, "id"));
            }
            InteractionKind::ModalSubmit => {
                let custom_id = custom_id_of(data)?;
                ctx.invoke_target = custom_id.clone();
                ctx.custom_id = Some(custom_id);
                ctx.responses = modal_responses(data);
                ctx.message_id = payload.get("message").and_then(|m| snowflake_at(m, "id"));
            }
        }
        Ok(ctx)
    }

    /// Records that an initial response was sent. Returns the previous state.
    pub fn mark_responded(&self) -> bool {
        self.responded.swap(true, Ordering::AcqRel)
    }

    pub fn responded(&self) -> bool {
        self.responded.load(Ordering::Acquire)
    }

    /// Records that the interaction was deferred. Returns the previous state.
    pub fn mark_deferred(&self) -> bool {
        self.deferred.swap(true, Ordering::AcqRel)
    }

    pub fn deferred(&self) -> bool {
        self.deferred.load(Ordering::Acquire)
    }

    /// True if the interaction came from a button press.
    pub fn is_button(&self) -> bool {
        self.component_type == Some(component_type::BUTTON)
    }

    /// True if the interaction came from any select menu.
    pub fn is_select(&self) -> bool {
        self.component_type.is_some_and(component_type::is_select)
    }
}

fn snowflake_at(value: &Value, key: &str) -> Option<Snowflake> {
    value.get(key).and_then(Snowflake::from_value)
}

fn custom_id_of(data: &Value) -> Result<String, RouterError> {
    data.get("custom_id")
        .and_then(Value::as_str)
        .map(str::to_owned)
        .ok_or(RouterError::MalformedPayload("data.custom_id"))
}

/// Walks the subcommand chain of a command payload.
///
/// Returns the space-joined name, the leaf option values and the focused
/// option, if any.
fn resolve_command(
    data: &Value,
) -> Result<(String, Map<String, Value>, Option<String>), RouterError> {
    let name = data
        .get("name")
        .and_then(Value::as_str)
        .ok_or(RouterError::MalformedPayload("data.name"))?;
    let mut target = vec![name];
    let mut options = data.get("options").and_then(Value::as_array);

    while let Some(first) = options.and_then(|o| o.first()) {
        match first.get("type").and_then(Value::as_u64) {
            Some(SUB_COMMAND | SUB_COMMAND_GROUP) => {
                if let Some(sub) = first.get("name").and_then(Value::as_str) {
                    target.push(sub);
                }
                options = first.get("options").and_then(Value::as_array);
            }
            _ => break,
        }
    }

    let mut kwargs = Map::new();
    let mut focused = None;
    for option in options.into_iter().flatten() {
        let Some(option_name) = option.get("name").and_then(Value::as_str) else {
            continue;
        };
        if option.get("focused").and_then(Value::as_bool) == Some(true) {
            focused = Some(option_name.to_owned());
        }
        kwargs.insert(
            option_name.to_owned(),
            option.get("value").cloned().unwrap_or(Value::Null),
        );
    }
    Ok((target.join(" "), kwargs, focused))
}

fn modal_responses(data: &Value) -> BTreeMap<String, String> {
    let rows = data.get("components").and_then(Value::as_array);
    rows.into_iter()
        .flatten()
        .filter_map(|row| row.get("components").and_then(Value::as_array))
        .flatten()
        .filter_map(|field| {
            let id = field.get("custom_id")?.as_str()?;
            let value = field.get("value")?.as_str()?;
            Some((id.to_owned(), value.to_owned()))
        })
        .collect()
}

/// The context of a prefixed (text) command invocation.
#[derive(Debug, Clone, Default)]
pub struct PrefixedContext {
    pub message_id: Option<Snowflake>,
    pub channel_id: Option<Snowflake>,
    pub guild_id: Option<Snowflake>,
    pub author_id: Option<Snowflake>,
    /// Full message content.
    pub content: String,
    /// The prefix that matched.
    pub prefix: String,
    /// Space-joined resolved command path.
    pub invoke_target: String,
    /// Everything after the resolved command path.
    pub content_parameters: String,
    /// `content_parameters` split into arguments.
    pub args: Vec<String>,
    /// The untouched message payload.
    pub message: Value,
}

impl PrefixedContext {
    /// Builds an unresolved context from a message payload.
    pub fn from_message(message: &Value) -> Self {
        Self {
            message_id: snowflake_at(message, "id"),
            channel_id: snowflake_at(message, "channel_id"),
            guild_id: snowflake_at(message, "guild_id"),
            author_id: message.get("author").and_then(|a| snowflake_at(a, "id")),
            content: message
                .get("content")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_owned(),
            message: message.clone(),
            ..Self::default()
        }
    }
}

/// The context of any command invocation.
#[derive(Debug, Clone)]
pub enum InvokeContext {
    Interaction(Arc<InteractionContext>),
    Prefixed(Arc<PrefixedContext>),
}

impl InvokeContext {
    /// Resolved command path or custom id.
    pub fn invoke_target(&self) -> &str {
        match self {
            Self::Interaction(ctx) => &ctx.invoke_target,
            Self::Prefixed(ctx) => &ctx.invoke_target,
        }
    }

    pub fn channel_id(&self) -> Option<Snowflake> {
        match self {
            Self::Interaction(ctx) => ctx.channel_id,
            Self::Prefixed(ctx) => ctx.channel_id,
        }
    }

    pub fn guild_id(&self) -> Option<Snowflake> {
        match self {
            Self::Interaction(ctx) => ctx.guild_id,
            Self::Prefixed(ctx) => ctx.guild_id,
        }
    }

    pub fn author_id(&self) -> Option<Snowflake> {
        match self {
            Self::Interaction(ctx) => ctx.author_id,
            Self::Prefixed(ctx) => ctx.author_id,
        }
    }

    /// Returns the interaction context, if this invocation is one.
    pub fn as_interaction(&self) -> Option<&Arc<InteractionContext>> {
        match self {
            Self::Interaction(ctx) => Some(ctx),
            Self::Prefixed(_) => None,
        }
    }

    /// Returns the prefixed context, if this invocation is one.
    pub fn as_prefixed(&self) -> Option<&Arc<PrefixedContext>> {
        match self {
            Self::Interaction(_) => None,
            Self::Prefixed(ctx) => Some(ctx),
        }
    }

    /// Renders the invocation the way a user would have typed it.
    pub fn describe(&self) -> String {
        match self {
            Self::Interaction(ctx) => {
                let mut out = format!("/{}", ctx.invoke_target);
                for (name, value) in &ctx.kwargs {
                    out.push_str(&format!(" {name}: {value}"));
                }
                out
            }
            Self::Prefixed(ctx) => format!("{}{}", ctx.prefix, ctx.invoke_target),
        }
    }
}

impl From<Arc<InteractionContext>> for InvokeContext {
    fn from(ctx: Arc<InteractionContext>) -> Self {
        Self::Interaction(ctx)
    }
}

impl From<Arc<PrefixedContext>> for InvokeContext {
    fn from(ctx: Arc<PrefixedContext>) -> Self {
        Self::Prefixed(ctx)
    }
}
