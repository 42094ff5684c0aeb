//! Client configuration.

use herald_core::{Handler, Intents, InvokeContext, Outcome, Snowflake};
use herald_std::commands::DEFAULT_THROTTLE;
use herald_std::hooks::auto_defer::AutoDefer;
use herald_std::hooks::run::RunHooks;
use herald_std::routing::{MENTION_PREFIX, Prefix, PrefixGenerator};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Settings captured once by a [`Client`](crate::Client).
///
/// # Example
///
/// ```rust,ignore
/// let config = ClientConfig::new()
///     .with_intents(Intents::DEFAULT | Intents::MESSAGE_CONTENT)
///     .with_prefixes(["!", "?"])
///     .with_debug_scope(Snowflake(1234));
/// ```
#[derive(Clone)]
pub struct ClientConfig {
    pub intents: Intents,
    /// Prefixes for prefixed commands, tried in order.
    pub default_prefixes: Vec<Prefix>,
    /// Computes prefixes per message; overrides `default_prefixes`.
    pub prefix_generator: Option<PrefixGenerator>,
    /// The bot's user id, used by the mention prefix. Learned from the
    /// ready event when unset.
    pub bot_id: Option<Snowflake>,
    /// Needed to sync commands. Learned from the ready event when unset.
    pub application_id: Option<Snowflake>,
    /// Auto-defer policy for commands whose command and extension set none.
    pub auto_defer: AutoDefer,
    /// Whether startup pushes local commands, or only reads the remote ones.
    pub sync_interactions: bool,
    pub delete_unused_application_cmds: bool,
    /// Checks the invoker's permissions locally before running a command.
    pub enforce_interaction_perms: bool,
    /// Whether the default `command_error` listener replies with the error.
    pub send_command_tracebacks: bool,
    /// Registers every structured command in this guild only.
    pub debug_scope: Option<Snowflake>,
    pub disable_dm_commands: bool,
    /// Delay between throttled remote calls.
    pub request_throttle: Duration,
    /// Guilds whose commands are considered when deleting unused ones.
    pub guild_ids: Vec<Snowflake>,
    /// Pre- and post-run hooks around every command and callback.
    pub hooks: RunHooks,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            intents: Intents::DEFAULT,
            default_prefixes: vec![MENTION_PREFIX],
            prefix_generator: None,
            bot_id: None,
            application_id: None,
            auto_defer: AutoDefer::disabled(),
            sync_interactions: true,
            delete_unused_application_cmds: false,
            enforce_interaction_perms: true,
            send_command_tracebacks: true,
            debug_scope: None,
            disable_dm_commands: false,
            request_throttle: DEFAULT_THROTTLE,
            guild_ids: Vec::new(),
            hooks: RunHooks::default(),
        }
    }
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_intents(mut self, intents: Intents) -> Self {
        self.intents = intents;
        self
    }

    pub fn with_prefixes<I, P>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<Prefix>,
    {
        self.default_prefixes = prefixes.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_prefix_generator<H>(mut self, generator: H) -> Self
    where
        H: Handler<Value, Output = Vec<Prefix>>,
    {
        self.prefix_generator = Some(Arc::new(generator));
        self
    }

    pub fn with_bot_id(mut self, bot_id: Snowflake) -> Self {
        self.bot_id = Some(bot_id);
        self
    }

    pub fn with_application_id(mut self, application_id: Snowflake) -> Self {
        self.application_id = Some(application_id);
        self
    }

    pub fn with_auto_defer(mut self, auto_defer: AutoDefer) -> Self {
        self.auto_defer = auto_defer;
        self
    }

    pub fn with_sync_interactions(mut self, sync: bool) -> Self {
        self.sync_interactions = sync;
        self
    }

    pub fn with_delete_unused_application_cmds(mut self, delete: bool) -> Self {
        self.delete_unused_application_cmds = delete;
        self
    }

    pub fn with_enforce_interaction_perms(mut self, enforce: bool) -> Self {
        self.enforce_interaction_perms = enforce;
        self
    }

    pub fn with_send_command_tracebacks(mut self, send: bool) -> Self {
        self.send_command_tracebacks = send;
        self
    }

    pub fn with_debug_scope(mut self, guild_id: Snowflake) -> Self {
        self.debug_scope = Some(guild_id);
        self
    }

    pub fn with_disable_dm_commands(mut self, disable: bool) -> Self {
        self.disable_dm_commands = disable;
        self
    }

    pub fn with_request_throttle(mut self, throttle: Duration) -> Self {
        self.request_throttle = throttle;
        self
    }

    pub fn with_guild_ids(mut self, guild_ids: impl IntoIterator<Item = Snowflake>) -> Self {
        self.guild_ids = guild_ids.into_iter().collect();
        self
    }

    /// Runs before every command, component and modal callback; a failure
    /// stops the invocation.
    pub fn with_pre_run<H>(mut self, handler: H) -> Self
    where
        H: Handler<InvokeContext, Output = Outcome>,
    {
        self.hooks = self.hooks.with_pre_run(handler);
        self
    }

    pub fn with_post_run<H>(mut self, handler: H) -> Self
    where
        H: Handler<InvokeContext, Output = Outcome>,
    {
        self.hooks = self.hooks.with_post_run(handler);
        self
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("intents", &self.intents)
            .field("default_prefixes", &self.default_prefixes)
            .field("prefix_generator", &self.prefix_generator.is_some())
            .field("bot_id", &self.bot_id)
            .field("application_id", &self.application_id)
            .field("auto_defer", &self.auto_defer)
            .field("sync_interactions", &self.sync_interactions)
            .field(
                "delete_unused_application_cmds",
                &self.delete_unused_application_cmds,
            )
            .field("enforce_interaction_perms", &self.enforce_interaction_perms)
            .field("send_command_tracebacks", &self.send_command_tracebacks)
            .field("debug_scope", &self.debug_scope)
            .field("disable_dm_commands", &self.disable_dm_commands)
            .field("request_throttle", &self.request_throttle)
            .field("guild_ids", &self.guild_ids)
            .field("hooks", &self.hooks)
            .finish()
    }
}
