//! Structured (slash-style and context-menu) commands.

use crate::dispatch::lock;
use crate::extension::Extension;
use crate::hooks::auto_defer::AutoDefer;
use herald_core::{
    BoxError, Callback, Check, CommandError, Handler, InteractionContext, InvokeContext, Outcome,
    Scope, Snowflake,
};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use tracing::warn;

/// Command type codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CommandKind {
    #[default]
    ChatInput,
    /// Context menu on a user.
    User,
    /// Context menu on a message.
    Message,
}

impl CommandKind {
    pub fn code(self) -> u64 {
        match self {
            Self::ChatInput => 1,
            Self::User => 2,
            Self::Message => 3,
        }
    }

    /// Context-menu commands are never grouped.
    pub fn is_context_menu(self) -> bool {
        !matches!(self, Self::ChatInput)
    }
}

/// A structured command.
///
/// The name is the resolved name: up to three space-separated words
/// (`"base"`, `"base sub"`, `"base group sub"`).
pub struct InteractionCommand {
    name: String,
    description: String,
    base_description: Option<String>,
    group_description: Option<String>,
    kind: CommandKind,
    scopes: Vec<Scope>,
    options: Vec<Value>,
    name_localizations: Map<String, Value>,
    default_member_permissions: Option<u64>,
    dm_permission: bool,
    nsfw: bool,
    callback: Option<Callback<Arc<InteractionContext>>>,
    checks: Vec<Check<InvokeContext>>,
    autocomplete: HashMap<String, Callback<Arc<InteractionContext>>>,
    auto_defer: Option<AutoDefer>,
    extension: Option<Arc<Extension>>,
    cmd_ids: Mutex<HashMap<Scope, Snowflake>>,
}

impl InteractionCommand {
    /// A chat-input command. `name` is split on whitespace into at most three
    /// levels; extra words are folded into the last level.
    pub fn slash(name: &str, description: impl Into<String>) -> Self {
        let words: Vec<&str> = name.split_whitespace().collect();
        let name = if words.len() > 3 {
            let folded = format!("{} {} {}", words[0], words[1], words[2..].join("_"));
            warn!(requested = name, registered = %folded, "command name has more than three levels");
            folded
        } else {
            words.join(" ")
        };
        Self::new(name, description.into(), CommandKind::ChatInput)
    }

    /// A context-menu command. Its name may contain spaces and is never split.
    pub fn context_menu(name: impl Into<String>, kind: CommandKind) -> Self {
        Self::new(name.into(), String::new(), kind)
    }

    fn new(name: String, description: String, kind: CommandKind) -> Self {
        Self {
            name,
            description,
            base_description: None,
            group_description: None,
            kind,
            scopes: vec![Scope::Global],
            options: Vec::new(),
            name_localizations: Map::new(),
            default_member_permissions: None,
            dm_permission: true,
            nsfw: false,
            callback: None,
            checks: Vec::new(),
            autocomplete: HashMap::new(),
            auto_defer: None,
            extension: None,
            cmd_ids: Mutex::new(HashMap::new()),
        }
    }

    /// Replaces the scope set. Duplicates are ignored.
    pub fn with_scopes(mut self, scopes: impl IntoIterator<Item = Scope>) -> Self {
        self.scopes.clear();
        for scope in scopes {
            if !self.scopes.contains(&scope) {
                self.scopes.push(scope);
            }
        }
        self
    }

    /// Adds a leaf option definition, in wire form.
    pub fn with_option(mut self, option: Value) -> Self {
        self.options.push(option);
        self
    }

    pub fn with_base_description(mut self, description: impl Into<String>) -> Self {
        self.base_description = Some(description.into());
        self
    }

    pub fn with_group_description(mut self, description: impl Into<String>) -> Self {
        self.group_description = Some(description.into());
        self
    }

    /// Adds a localized name of the base command.
    pub fn with_localized_name(mut self, locale: &str, name: &str) -> Self {
        self.name_localizations
            .insert(locale.to_owned(), Value::String(name.to_owned()));
        self
    }

    pub fn with_default_member_permissions(mut self, permissions: u64) -> Self {
        self.default_member_permissions = Some(permissions);
        self
    }

    pub fn with_dm_permission(mut self, allowed: bool) -> Self {
        self.dm_permission = allowed;
        self
    }

    pub fn with_nsfw(mut self, nsfw: bool) -> Self {
        self.nsfw = nsfw;
        self
    }

    pub fn with_callback<H>(mut self, handler: H) -> Self
    where
        H: Handler<Arc<InteractionContext>, Output = Outcome>,
    {
        self.callback = Some(Arc::new(handler));
        self
    }

    pub fn with_check<H>(mut self, check: H) -> Self
    where
        H: Handler<InvokeContext, Output = Result<bool, BoxError>>,
    {
        self.checks.push(Arc::new(check));
        self
    }

    /// Binds an autocomplete callback to the option `option`.
    pub fn with_autocomplete<H>(mut self, option: &str, handler: H) -> Self
    where
        H: Handler<Arc<InteractionContext>, Output = Outcome>,
    {
        self.autocomplete.insert(option.to_owned(), Arc::new(handler));
        self
    }

    pub fn with_auto_defer(mut self, auto_defer: AutoDefer) -> Self {
        self.auto_defer = Some(auto_defer);
        self
    }

    pub fn with_extension(mut self, extension: Arc<Extension>) -> Self {
        self.extension = Some(extension);
        self
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    /// The resolved name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// First word of the resolved name.
    pub fn base(&self) -> &str {
        if self.kind.is_context_menu() {
            return &self.name;
        }
        self.name.split(' ').next().unwrap_or(&self.name)
    }

    /// Second word, for grouped commands.
    pub fn group(&self) -> Option<&str> {
        if self.kind.is_context_menu() {
            return None;
        }
        self.name.split(' ').nth(1)
    }

    /// Third word, for commands under a subcommand group.
    pub fn sub(&self) -> Option<&str> {
        if self.kind.is_context_menu() {
            return None;
        }
        self.name.split(' ').nth(2)
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn base_description(&self) -> Option<&str> {
        self.base_description.as_deref()
    }

    pub fn group_description(&self) -> Option<&str> {
        self.group_description.as_deref()
    }

    pub fn kind(&self) -> CommandKind {
        self.kind
    }

    pub fn scopes(&self) -> &[Scope] {
        &self.scopes
    }

    pub fn options(&self) -> &[Value] {
        &self.options
    }

    pub fn name_localizations(&self) -> &Map<String, Value> {
        &self.name_localizations
    }

    pub fn default_member_permissions(&self) -> Option<u64> {
        self.default_member_permissions
    }

    pub fn dm_permission(&self) -> bool {
        self.dm_permission
    }

    pub fn nsfw(&self) -> bool {
        self.nsfw
    }

    /// False for pure group placeholders.
    pub fn has_callback(&self) -> bool {
        self.callback.is_some()
    }

    pub fn checks(&self) -> &[Check<InvokeContext>] {
        &self.checks
    }

    pub fn autocomplete_callback(&self, option: &str) -> Option<&Callback<Arc<InteractionContext>>> {
        self.autocomplete.get(option)
    }

    pub fn auto_defer(&self) -> Option<&AutoDefer> {
        self.auto_defer.as_ref()
    }

    pub fn extension(&self) -> Option<&Arc<Extension>> {
        self.extension.as_ref()
    }

    /// The remote id of this command in `scope`, once known.
    pub fn cmd_id(&self, scope: Scope) -> Option<Snowflake> {
        lock(&self.cmd_ids).get(&scope).copied()
    }

    pub(crate) fn set_cmd_id(&self, scope: Scope, id: Snowflake) {
        lock(&self.cmd_ids).insert(scope, id);
    }

    // ------------------------------------------------------------------------
    // Invocation
    // ------------------------------------------------------------------------

    /// Runs every check in order, failing on the first that rejects.
    pub async fn can_run(&self, ctx: &InvokeContext) -> Outcome {
        for check in &self.checks {
            if !check.call_dyn(ctx.clone()).await? {
                return Err(Box::new(CommandError::CheckFailure(self.name.clone())));
            }
        }
        Ok(())
    }

    /// Runs the checks, then the callback.
    pub async fn invoke(&self, ctx: Arc<InteractionContext>) -> Outcome {
        self.can_run(&InvokeContext::Interaction(Arc::clone(&ctx))).await?;
        match &self.callback {
            Some(callback) => callback.call_dyn(ctx).await,
            None => Ok(()),
        }
    }
}

impl fmt::Debug for InteractionCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InteractionCommand")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("scopes", &self.scopes)
            .field("checks", &self.checks.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_levels() {
        let cmd = InteractionCommand::slash("mod  user ban", "Ban a user");
        assert_eq!(cmd.name(), "mod user ban");
        assert_eq!(cmd.base(), "mod");
        assert_eq!(cmd.group(), Some("user"));
        assert_eq!(cmd.sub(), Some("ban"));

        let menu = InteractionCommand::context_menu("Report Message", CommandKind::Message);
        assert_eq!(menu.base(), "Report Message");
        assert_eq!(menu.group(), None);
    }

    #[test]
    fn test_extra_levels_fold_into_the_last() {
        let cmd = InteractionCommand::slash("mod user ban now", "Ban a user");
        assert_eq!(cmd.name(), "mod user ban_now");
        assert_eq!(cmd.sub(), Some("ban_now"));
    }

    #[test]
    fn test_scopes_dedup() {
        let cmd = InteractionCommand::slash("ping", "Pong")
            .with_scopes([Scope::Global, Scope::Guild(Snowflake(1)), Scope::Global]);
        assert_eq!(cmd.scopes(), [Scope::Global, Scope::Guild(Snowflake(1))]);
    }

    #[tokio::test]
    async fn test_failing_check_blocks_callback() {
        let cmd = InteractionCommand::slash("ping", "Pong")
            .with_check(|_ctx: InvokeContext| async { Ok::<_, BoxError>(false) })
            .with_callback(|_ctx: Arc<InteractionContext>| async {
                Err(BoxError::from("callback must not run"))
            });
        let payload = serde_json::json!({
            "id": "1", "token": "t", "type": 2, "data": {"id": "5", "name": "ping"}
        });
        let ctx = Arc::new(InteractionContext::from_payload(&payload).unwrap());
        let err = cmd.invoke(ctx).await.unwrap_err();
        assert!(err.downcast_ref::<CommandError>().is_some());
    }
}
