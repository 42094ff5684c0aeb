//! The client: one dispatcher with every processor installed on it.

use crate::config::ClientConfig;
use herald_core::{
    EntityCache, Event, EventKind, Handler, HttpApi, Intents, Listener, Outcome, RegistrationError,
    Scope, Snowflake, SyncError, share,
};
use herald_std::callbacks::{CallbackRegistry, InteractionCallback};
use herald_std::commands::{CommandTree, InteractionCommand, Synchroniser};
use herald_std::dispatch::{ComponentCheck, Dispatcher, WaitFor};
use herald_std::hooks::defaults::default_listeners;
use herald_std::hooks::permissions::PermissionEnforcer;
use herald_std::prefixed::{PrefixedCommand, PrefixedRegistry};
use herald_std::routing::{InteractionRouter, Prefix, PrefixResolver, Processor};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};
use std::time::Duration;
use tracing::{debug, info, warn};

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

struct Inner {
    config: ClientConfig,
    dispatcher: Dispatcher,
    http: Arc<dyn HttpApi>,
    commands: Arc<RwLock<CommandTree>>,
    prefixed: Arc<RwLock<PrefixedRegistry>>,
    callbacks: Arc<RwLock<CallbackRegistry>>,
    application_id: RwLock<Option<Snowflake>>,
    started: AtomicBool,
}

/// The event dispatch and command routing engine of a chat client.
///
/// The transport feeds raw gateway events in through
/// [`dispatch_raw`](Self::dispatch_raw); everything else is derived from them
/// by the installed processors:
///
/// - the [`InteractionRouter`] turns `raw_interaction_create` into command,
///   component, autocomplete and modal events
/// - the [`PrefixResolver`] turns `raw_message_create` into prefixed command
///   invocations
/// - `raw_ready` binds commands to their remote ids, then marks the client
///   ready
///
/// Cloning is cheap; every clone drives the same registries.
#[derive(Clone)]
pub struct Client {
    inner: Arc<Inner>,
}

impl Client {
    pub fn new(config: ClientConfig, http: Arc<dyn HttpApi>) -> Self {
        Self::build(config, http, None)
    }

    /// Creates a client whose interactions get their channel filled in from `cache`.
    pub fn with_cache(
        config: ClientConfig,
        http: Arc<dyn HttpApi>,
        cache: Arc<dyn EntityCache>,
    ) -> Self {
        Self::build(config, http, Some(cache))
    }

    fn build(
        config: ClientConfig,
        http: Arc<dyn HttpApi>,
        cache: Option<Arc<dyn EntityCache>>,
    ) -> Self {
        let dispatcher = Dispatcher::new(config.intents);
        let commands = Arc::new(RwLock::new(CommandTree::new()));
        let prefixed = Arc::new(RwLock::new(PrefixedRegistry::new()));
        let callbacks = Arc::new(RwLock::new(CallbackRegistry::new()));

        let mut router = InteractionRouter::new(
            dispatcher.clone(),
            Arc::clone(&commands),
            Arc::clone(&callbacks),
            Arc::clone(&http),
        )
        .with_hooks(config.hooks.clone())
        .with_auto_defer(config.auto_defer);
        if let Some(cache) = cache {
            router = router.with_cache(cache);
        }

        let mut resolver = PrefixResolver::new(dispatcher.clone(), Arc::clone(&prefixed))
            .with_prefixes(config.default_prefixes.clone())
            .with_hooks(config.hooks.clone());
        if let Some(generator) = &config.prefix_generator {
            resolver = resolver.with_generator_callback(Arc::clone(generator));
        }
        if let Some(bot_id) = config.bot_id {
            resolver = resolver.with_bot_id(bot_id);
        }

        let listeners = Arc::new(router)
            .listeners()
            .into_iter()
            .chain(Arc::new(resolver).listeners())
            .chain(default_listeners(
                &dispatcher,
                Arc::clone(&http),
                config.send_command_tracebacks,
            ));
        for listener in listeners {
            dispatcher.add_listener(listener);
        }

        let inner = Arc::new(Inner {
            application_id: RwLock::new(config.application_id),
            config,
            dispatcher,
            http,
            commands,
            prefixed,
            callbacks,
            started: AtomicBool::new(false),
        });
        inner
            .dispatcher
            .add_listener(Listener::new("raw_ready", OnReady(Arc::downgrade(&inner))));
        Self { inner }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// The dispatcher every processor is installed on.
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.inner.dispatcher
    }

    pub fn intents(&self) -> Intents {
        self.inner.config.intents
    }

    pub fn application_id(&self) -> Option<Snowflake> {
        *read(&self.inner.application_id)
    }

    // ========================================================================
    // Events
    // ========================================================================

    /// Dispatches an event. Returns without waiting for listeners.
    pub fn dispatch(&self, event: Event) {
        self.inner.dispatcher.dispatch(event);
    }

    /// Dispatches a raw gateway event, e.g. `("INTERACTION_CREATE", data)`,
    /// as `raw_interaction_create`.
    pub fn dispatch_raw(&self, name: &str, data: serde_json::Value) {
        self.dispatch(Event::raw(name, data));
    }

    pub fn add_listener(&self, listener: Listener) -> Arc<Listener> {
        self.inner.dispatcher.add_listener(listener)
    }

    pub fn remove_listener(&self, listener: &Arc<Listener>) -> bool {
        self.inner.dispatcher.remove_listener(listener)
    }

    /// Waits for the next `event` for which `predicate` holds.
    pub fn wait_for<P>(&self, event: &str, predicate: P, timeout: Option<Duration>) -> WaitFor
    where
        P: Fn(&Event) -> bool + Send + Sync + 'static,
    {
        self.inner.dispatcher.wait_for(event, predicate, timeout)
    }

    pub fn wait_for_component(
        &self,
        messages: Vec<Snowflake>,
        custom_ids: Vec<String>,
        check: Option<ComponentCheck>,
        timeout: Option<Duration>,
    ) -> WaitFor {
        self.inner
            .dispatcher
            .wait_for_component(messages, custom_ids, check, timeout)
    }

    pub fn wait_for_modal(
        &self,
        custom_id: impl Into<String>,
        author: Option<Snowflake>,
        timeout: Option<Duration>,
    ) -> WaitFor {
        self.inner
            .dispatcher
            .wait_for_modal(custom_id, author, timeout)
    }

    pub fn is_ready(&self) -> bool {
        self.inner.dispatcher.is_ready()
    }

    pub async fn wait_until_ready(&self) {
        self.inner.dispatcher.wait_until_ready().await;
    }

    /// Waits until every in-flight listener has finished.
    pub async fn wait_idle(&self) {
        self.inner.dispatcher.wait_idle().await;
    }

    /// Aborts every in-flight listener and clears readiness.
    pub fn shutdown(&self) {
        info!("shutting down");
        self.inner.dispatcher.shutdown();
        self.inner.dispatcher.set_ready(false);
    }

    // ========================================================================
    // Registration
    // ========================================================================

    /// Registers a structured command.
    ///
    /// Returns `Ok(false)` without registering anything if the command has no
    /// callback. The debug scope, DM setting and permission enforcement of
    /// the configuration are applied first.
    pub fn add_interaction(&self, command: InteractionCommand) -> Result<bool, RegistrationError> {
        if !command.has_callback() {
            return Ok(false);
        }
        let config = &self.inner.config;
        let mut command = command;
        if let Some(guild_id) = config.debug_scope {
            command = command.with_scopes([Scope::Guild(guild_id)]);
        }
        if config.disable_dm_commands {
            command = command.with_dm_permission(false);
        }
        if config.enforce_interaction_perms {
            let enforcer = PermissionEnforcer {
                default_member_permissions: command.default_member_permissions(),
                dm_permission: command.dm_permission(),
            };
            command = command.with_check(enforcer);
        }
        write(&self.inner.commands).insert(Arc::new(command))?;
        Ok(true)
    }

    /// Registers a top-level prefixed command.
    pub fn add_prefixed_command(
        &self,
        command: PrefixedCommand,
    ) -> Result<Arc<PrefixedCommand>, RegistrationError> {
        let config = &self.inner.config;
        let mention = config.default_prefixes.contains(&Prefix::Mention);
        if !mention
            && config.prefix_generator.is_none()
            && !config.intents.contains(Intents::MESSAGE_CONTENT)
        {
            warn!(
                command = command.name(),
                "prefixed commands need the MESSAGE_CONTENT intent unless the mention prefix is used"
            );
        }
        write(&self.inner.prefixed).add(command)
    }

    pub fn add_component_callback(
        &self,
        callback: InteractionCallback,
    ) -> Result<(), RegistrationError> {
        write(&self.inner.callbacks).add_component(callback)
    }

    pub fn add_modal_callback(&self, callback: InteractionCallback) -> Result<(), RegistrationError> {
        write(&self.inner.callbacks).add_modal(callback)
    }

    pub fn get_application_cmd_by_id(&self, id: Snowflake) -> Option<Arc<InteractionCommand>> {
        read(&self.inner.commands).command_by_id(id)
    }

    /// Removes every listener, command and callback registered under the
    /// extension `name`. Returns how many registrations were removed.
    pub fn drop_extension(&self, name: &str) -> usize {
        let removed = self.inner.dispatcher.remove_extension_listeners(name)
            + write(&self.inner.commands).remove_extension(name)
            + write(&self.inner.prefixed).remove_extension(name)
            + write(&self.inner.callbacks).remove_extension(name);
        debug!(extension = name, removed, "dropped extension");
        removed
    }

    // ========================================================================
    // Remote commands
    // ========================================================================

    fn synchroniser(&self) -> Result<Synchroniser, SyncError> {
        let application_id = self
            .application_id()
            .ok_or(SyncError::MissingApplicationId)?;
        Ok(Synchroniser::new(
            Arc::clone(&self.inner.http),
            Arc::clone(&self.inner.commands),
            application_id,
        )
        .with_throttle(self.inner.config.request_throttle))
    }

    /// Scopes holding local commands, plus the global scope and the
    /// configured guilds when `with_guilds` is set.
    fn known_scopes(&self, with_guilds: bool) -> Vec<Scope> {
        let mut scopes: Vec<Scope> = read(&self.inner.commands).scopes().collect();
        if with_guilds {
            let extra = std::iter::once(Scope::Global)
                .chain(self.inner.config.guild_ids.iter().copied().map(Scope::Guild));
            for scope in extra {
                if !scopes.contains(&scope) {
                    scopes.push(scope);
                }
            }
        }
        scopes
    }

    /// Pushes local structured commands to the remote.
    ///
    /// `scopes` defaults to every scope holding a local command (plus the
    /// configured guilds when deleting); `delete` defaults to the
    /// configuration's `delete_unused_application_cmds`.
    pub async fn synchronise_interactions(
        &self,
        scopes: Option<&[Scope]>,
        delete: Option<bool>,
    ) -> Result<(), SyncError> {
        let synchroniser = self.synchroniser()?;
        let delete = delete.unwrap_or(self.inner.config.delete_unused_application_cmds);
        let scopes = match scopes {
            Some(scopes) => scopes.to_vec(),
            None => self.known_scopes(delete),
        };
        synchroniser.synchronise(&scopes, delete).await
    }

    /// Binds local commands to the ids of their remote copies without
    /// changing anything remotely.
    pub async fn cache_interactions(&self, warn_missing: bool) -> Result<(), SyncError> {
        let synchroniser = self.synchroniser()?;
        synchroniser
            .cache_interactions(&self.known_scopes(true), warn_missing)
            .await
    }

    /// Syncs or caches commands as configured. Failure is reported as an
    /// `error` event.
    pub async fn init_interactions(&self) {
        let result = if self.inner.config.sync_interactions {
            self.synchronise_interactions(None, None).await
        } else {
            self.cache_interactions(false).await
        };
        if let Err(error) = result {
            self.dispatch(Event::error(
                "Interaction Syncing",
                share(Box::new(error)),
                None,
            ));
        }
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("config", &self.inner.config)
            .field("dispatcher", &self.inner.dispatcher)
            .field("application_id", &self.application_id())
            .finish_non_exhaustive()
    }
}

/// Runs the startup sequence on the first `raw_ready`, then marks the client
/// ready on every one.
struct OnReady(Weak<Inner>);

impl Handler<Event> for OnReady {
    type Output = Outcome;

    async fn call(&self, event: Event) -> Outcome {
        let Some(inner) = self.0.upgrade() else {
            return Ok(());
        };
        let client = Client { inner };

        let application_id = event
            .data()
            .and_then(|data| data.get("application"))
            .and_then(|application| application.get("id"))
            .and_then(Snowflake::from_value);
        if let Some(application_id) = application_id {
            write(&client.inner.application_id).get_or_insert(application_id);
        }

        if !client.inner.started.swap(true, Ordering::SeqCst) {
            client.init_interactions().await;
            client.dispatch(Event::new(EventKind::Startup));
        }
        client.inner.dispatcher.set_ready(true);
        client.dispatch(Event::new(EventKind::Ready));
        Ok(())
    }
}
