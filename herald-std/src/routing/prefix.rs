use super::Processor;
use crate::dispatch::{Dispatcher, read, write};
use crate::hooks::run::{RunHooks, guarded, report_failure};
use crate::prefixed::{PrefixedCommand, PrefixedRegistry, split_args};
use herald_core::{
    DynHandler, Event, EventKind, Handler, InvokeContext, Listener, Outcome, PrefixedContext,
    Snowflake, share,
};
use regex::Regex;
use serde_json::Value;
use std::fmt;
use std::sync::{Arc, RwLock};
use tracing::{debug, warn};

/// A command prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Prefix {
    /// A mention of the bot at the very start of the message, followed by whitespace.
    Mention,
    Text(String),
}

/// The prefix matching a mention of the bot.
pub const MENTION_PREFIX: Prefix = Prefix::Mention;

impl From<&str> for Prefix {
    fn from(text: &str) -> Self {
        Prefix::Text(text.to_owned())
    }
}

impl From<String> for Prefix {
    fn from(text: String) -> Self {
        Prefix::Text(text)
    }
}

/// Computes the prefixes that apply to one message, e.g. per guild.
pub type PrefixGenerator = Arc<dyn DynHandler<Value, Output = Vec<Prefix>>>;

/// Resolves prefixed commands from raw messages and runs them.
pub struct PrefixResolver {
    dispatcher: Dispatcher,
    commands: Arc<RwLock<PrefixedRegistry>>,
    prefixes: Vec<Prefix>,
    generator: Option<PrefixGenerator>,
    mention: RwLock<Option<Regex>>,
    hooks: RunHooks,
}

impl PrefixResolver {
    pub fn new(dispatcher: Dispatcher, commands: Arc<RwLock<PrefixedRegistry>>) -> Self {
        Self {
            dispatcher,
            commands,
            prefixes: vec![MENTION_PREFIX],
            generator: None,
            mention: RwLock::new(None),
            hooks: RunHooks::default(),
        }
    }

    /// Static prefixes, tried in order.
    pub fn with_prefixes(mut self, prefixes: Vec<Prefix>) -> Self {
        self.prefixes = prefixes;
        self
    }

    /// Replaces the static prefixes with a per-message generator.
    pub fn with_generator<H>(self, generator: H) -> Self
    where
        H: Handler<Value, Output = Vec<Prefix>>,
    {
        self.with_generator_callback(Arc::new(generator))
    }

    /// Like [`with_generator`](Self::with_generator), for an already erased generator.
    pub fn with_generator_callback(mut self, generator: PrefixGenerator) -> Self {
        self.generator = Some(generator);
        self
    }

    pub fn with_hooks(mut self, hooks: RunHooks) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn with_bot_id(self, bot_id: Snowflake) -> Self {
        self.set_bot_id(bot_id);
        self
    }

    /// Sets the user the mention prefix refers to.
    pub fn set_bot_id(&self, bot_id: Snowflake) {
        match Regex::new(&format!(r"^<@!?{bot_id}>\s")) {
            Ok(pattern) => *write(&self.mention) = Some(pattern),
            Err(error) => warn!(%bot_id, %error, "could not build the mention prefix"),
        }
    }

    /// Resolves and runs the command a message invokes, if any.
    ///
    /// Failures are reported through `command_error` events; a message that
    /// invokes nothing is silently ignored.
    pub async fn resolve(&self, message: &Value) {
        if read(&self.commands).is_empty() {
            return;
        }
        let content = message
            .get("content")
            .and_then(Value::as_str)
            .unwrap_or_default();
        if content.is_empty() {
            return;
        }
        let from_webhook = message.get("webhook_id").is_some_and(|id| !id.is_null());
        let from_bot = message
            .get("author")
            .and_then(|author| author.get("bot"))
            .and_then(Value::as_bool)
            .unwrap_or(false);
        if from_webhook || from_bot {
            return;
        }

        let Some(prefix) = self.active_prefix(message, content).await else {
            return;
        };
        let Some(after_prefix) = content.strip_prefix(prefix.as_str()) else {
            return;
        };
        let mut ctx = PrefixedContext::from_message(message);
        ctx.prefix = prefix;

        let mut remaining = after_prefix;
        let mut resolved: Option<Arc<PrefixedCommand>> = None;
        while let Some(word) = remaining.split_whitespace().next() {
            let next = match &resolved {
                Some(parent) => parent.subcommand(word).cloned(),
                None => read(&self.commands).get(word),
            };
            let Some(next) = next.filter(|command| command.enabled()) else {
                break;
            };
            remaining = remaining
                .trim_start()
                .strip_prefix(word)
                .unwrap_or(remaining)
                .trim_start();
            resolved = Some(Arc::clone(&next));

            if next.has_subcommands() && next.hierarchical_checking() {
                ctx.invoke_target = invoke_target(after_prefix, remaining);
                ctx.content_parameters = remaining.trim_end().to_owned();
                let snapshot = InvokeContext::Prefixed(Arc::new(ctx.clone()));
                if let Err(error) = guarded(next.can_run(&snapshot)).await {
                    debug!(command = next.name(), "hierarchical check failed");
                    report_failure(
                        &self.dispatcher,
                        next.error_callback(),
                        next.extension(),
                        share(error),
                        snapshot,
                    )
                    .await;
                    return;
                }
            }
        }

        let Some(command) = resolved.filter(|command| command.enabled() && command.has_callback())
        else {
            return;
        };
        ctx.invoke_target = invoke_target(after_prefix, remaining);
        ctx.content_parameters = remaining.trim_end().to_owned();
        ctx.args = split_args(remaining);
        let ctx = Arc::new(ctx);
        let invoke = InvokeContext::Prefixed(Arc::clone(&ctx));

        debug!(command = command.name(), target = %ctx.invoke_target, "running prefixed command");
        let result = guarded(self.hooks.around(&invoke, command.invoke(Arc::clone(&ctx)))).await;
        if let Err(error) = result {
            self.dispatcher.dispatch(Event::new(EventKind::CommandError {
                ctx: invoke.clone(),
                error: share(error),
            }));
        }
        self.dispatcher
            .dispatch(Event::new(EventKind::CommandCompletion { ctx: invoke }));
    }

    /// The first prefix, in order, that the content starts with.
    async fn active_prefix(&self, message: &Value, content: &str) -> Option<String> {
        let prefixes = match &self.generator {
            Some(generator) => generator.call_dyn(message.clone()).await,
            None => self.prefixes.clone(),
        };
        let mention = read(&self.mention).clone();
        prefixes.into_iter().find_map(|prefix| {
            let candidate = match prefix {
                Prefix::Mention => mention.as_ref()?.find(content)?.as_str().to_owned(),
                Prefix::Text(text) => text,
            };
            (!candidate.is_empty() && content.starts_with(&candidate)).then_some(candidate)
        })
    }
}

/// The command path as typed: everything between the prefix and the
/// arguments, with inner whitespace preserved.
fn invoke_target(after_prefix: &str, remaining: &str) -> String {
    after_prefix
        .strip_suffix(remaining)
        .unwrap_or(after_prefix)
        .trim()
        .to_owned()
}

impl fmt::Debug for PrefixResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrefixResolver")
            .field("prefixes", &self.prefixes)
            .field("generator", &self.generator.is_some())
            .finish_non_exhaustive()
    }
}

struct ResolveMessage(Arc<PrefixResolver>);

impl Handler<Event> for ResolveMessage {
    type Output = Outcome;

    async fn call(&self, event: Event) -> Outcome {
        if let Some(message) = event.data() {
            self.0.resolve(message).await;
        }
        Ok(())
    }
}

struct LearnBotId(Arc<PrefixResolver>);

impl Handler<Event> for LearnBotId {
    type Output = Outcome;

    async fn call(&self, event: Event) -> Outcome {
        let bot_id = event
            .data()
            .and_then(|data| data.get("user"))
            .and_then(|user| user.get("id"))
            .and_then(Snowflake::from_value);
        if let Some(bot_id) = bot_id {
            self.0.set_bot_id(bot_id);
        }
        Ok(())
    }
}

impl Processor for PrefixResolver {
    fn listeners(self: Arc<Self>) -> Vec<Listener> {
        vec![
            Listener::new("raw_message_create", ResolveMessage(Arc::clone(&self))).as_default(),
            Listener::new("raw_ready", LearnBotId(self)),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{RecordingListener, message_payload};
    use herald_core::{BoxError, CommandError, Intents};
    use std::sync::Mutex;

    type Seen = Arc<Mutex<Vec<Arc<PrefixedContext>>>>;

    fn recording(name: &str, seen: &Seen) -> PrefixedCommand {
        let seen = Arc::clone(seen);
        PrefixedCommand::new(name, move |ctx: Arc<PrefixedContext>| {
            let seen = Arc::clone(&seen);
            async move {
                seen.lock().unwrap().push(ctx);
                Outcome::Ok(())
            }
        })
    }

    fn resolver(registry: PrefixedRegistry) -> (PrefixResolver, RecordingListener) {
        let dispatcher = Dispatcher::new(Intents::DEFAULT);
        let recorder = RecordingListener::new();
        dispatcher.add_listener(recorder.listener("command_error"));
        dispatcher.add_listener(recorder.listener("command_completion"));
        let resolver = PrefixResolver::new(dispatcher, Arc::new(RwLock::new(registry)))
            .with_prefixes(vec!["!".into(), MENTION_PREFIX])
            .with_bot_id(Snowflake(123));
        (resolver, recorder)
    }

    async fn settle(resolver: &PrefixResolver) {
        resolver.dispatcher.wait_idle().await;
    }

    #[tokio::test]
    async fn test_subcommand_walk_and_invoke_target() {
        let seen: Seen = Arc::default();
        let mut registry = PrefixedRegistry::new();
        let mut tag = PrefixedCommand::group("tag");
        tag.add_subcommand(recording("create", &seen).with_alias("new")).unwrap();
        registry.add(tag).unwrap();
        let (resolver, recorder) = resolver(registry);

        resolver
            .resolve(&message_payload::message("!tag   new  greeting \"hello there\""))
            .await;
        settle(&resolver).await;

        let ctx = seen.lock().unwrap()[0].clone();
        assert_eq!(ctx.prefix, "!");
        assert_eq!(ctx.invoke_target, "tag   new");
        assert_eq!(ctx.content_parameters, "greeting \"hello there\"");
        assert_eq!(ctx.args, ["greeting", "hello there"]);
        assert_eq!(recorder.names(), ["command_completion"]);
    }

    #[tokio::test]
    async fn test_mention_prefix() {
        let seen: Seen = Arc::default();
        let mut registry = PrefixedRegistry::new();
        registry.add(recording("help", &seen)).unwrap();
        let (resolver, _recorder) = resolver(registry);

        resolver.resolve(&message_payload::message("<@123> help")).await;
        resolver.resolve(&message_payload::message("<@!123> help me")).await;
        resolver.resolve(&message_payload::message("<@999> help")).await;
        resolver.resolve(&message_payload::message("hey <@123> help")).await;

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].prefix, "<@123> ");
        assert_eq!(seen[1].args, ["me"]);
    }

    #[tokio::test]
    async fn test_ignored_messages() {
        let seen: Seen = Arc::default();
        let mut registry = PrefixedRegistry::new();
        registry.add(recording("ping", &seen)).unwrap();
        let (resolver, recorder) = resolver(registry);

        let mut from_bot = message_payload::message("!ping");
        from_bot["author"]["bot"] = serde_json::json!(true);
        let mut from_webhook = message_payload::message("!ping");
        from_webhook["webhook_id"] = serde_json::json!("77");

        for message in [
            from_bot,
            from_webhook,
            message_payload::message(""),
            message_payload::message("?ping"),
            message_payload::message("!pong"),
        ] {
            resolver.resolve(&message).await;
        }
        settle(&resolver).await;
        assert!(seen.lock().unwrap().is_empty());
        assert_eq!(recorder.count(), 0);
    }

    #[tokio::test]
    async fn test_group_without_callback_is_silent() {
        let seen: Seen = Arc::default();
        let mut registry = PrefixedRegistry::new();
        let mut admin = PrefixedCommand::group("admin");
        admin.add_subcommand(recording("reload", &seen)).unwrap();
        registry.add(admin).unwrap();
        let (resolver, recorder) = resolver(registry);

        resolver.resolve(&message_payload::message("!admin restart")).await;
        settle(&resolver).await;
        assert!(seen.lock().unwrap().is_empty());
        assert_eq!(recorder.count(), 0);
    }

    #[tokio::test]
    async fn test_hierarchical_check_blocks_descent() {
        let seen: Seen = Arc::default();
        let mut registry = PrefixedRegistry::new();
        let mut admin = PrefixedCommand::group("admin")
            .with_check(|_ctx: InvokeContext| async { Ok::<_, BoxError>(false) });
        admin.add_subcommand(recording("reload", &seen)).unwrap();
        registry.add(admin).unwrap();
        let (resolver, recorder) = resolver(registry);

        resolver.resolve(&message_payload::message("!admin reload")).await;
        settle(&resolver).await;

        assert!(seen.lock().unwrap().is_empty());
        assert_eq!(recorder.names(), ["command_error"]);
        let error = recorder.events()[0].error_value().cloned().unwrap();
        assert_eq!(
            error.downcast_ref::<CommandError>(),
            Some(&CommandError::CheckFailure("admin".into()))
        );
    }

    #[tokio::test]
    async fn test_hierarchical_failure_goes_to_error_callback() {
        let handled = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&handled);
        let seen: Seen = Arc::default();
        let mut registry = PrefixedRegistry::new();
        let mut admin = PrefixedCommand::group("admin")
            .with_check(|_ctx: InvokeContext| async { Ok::<_, BoxError>(false) })
            .with_error_callback(move |_failure: (herald_core::SharedError, InvokeContext)| {
                let counter = Arc::clone(&counter);
                async move {
                    *counter.lock().unwrap() += 1;
                    Outcome::Ok(())
                }
            });
        admin.add_subcommand(recording("reload", &seen)).unwrap();
        registry.add(admin).unwrap();
        let (resolver, recorder) = resolver(registry);

        resolver.resolve(&message_payload::message("!admin reload")).await;
        settle(&resolver).await;
        assert_eq!(*handled.lock().unwrap(), 1);
        assert_eq!(recorder.count(), 0);
    }

    #[tokio::test]
    async fn test_disabled_subcommand_stops_the_walk() {
        let seen: Seen = Arc::default();
        let mut registry = PrefixedRegistry::new();
        let mut tag = recording("tag", &seen);
        tag.add_subcommand(recording("delete", &seen)).unwrap();
        let tag = registry.add(tag).unwrap();
        tag.subcommand("delete").unwrap().set_enabled(false);
        let (resolver, _recorder) = resolver(registry);

        resolver.resolve(&message_payload::message("!tag delete foo")).await;
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].invoke_target, "tag");
        assert_eq!(seen[0].args, ["delete", "foo"]);
    }

    #[tokio::test]
    async fn test_failure_reports_then_completes() {
        let mut registry = PrefixedRegistry::new();
        registry
            .add(PrefixedCommand::new("boom", |_ctx: Arc<PrefixedContext>| async {
                Err(BoxError::from("exploded"))
            }))
            .unwrap();
        let (resolver, recorder) = resolver(registry);

        resolver.resolve(&message_payload::message("!boom")).await;
        settle(&resolver).await;
        assert_eq!(recorder.names(), ["command_error", "command_completion"]);
    }
}
