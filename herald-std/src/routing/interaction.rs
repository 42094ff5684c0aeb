use super::Processor;
use crate::callbacks::CallbackRegistry;
use crate::commands::{CommandTree, InteractionCommand};
use crate::dispatch::{Dispatcher, read};
use crate::hooks::auto_defer::AutoDefer;
use crate::hooks::run::{RunHooks, guarded};
use herald_core::{
    BoxError, CacheError, CommandError, EntityCache, Event, EventKind, Handler, HttpApi,
    InteractionContext, InteractionKind, InvokeContext, Listener, Outcome, RouterError, Snowflake,
    share,
};
use serde_json::Value;
use std::sync::{Arc, RwLock};
use tracing::{debug, error};

/// Turns raw interactions into command, autocomplete, component and modal
/// events.
pub struct InteractionRouter {
    dispatcher: Dispatcher,
    commands: Arc<RwLock<CommandTree>>,
    callbacks: Arc<RwLock<CallbackRegistry>>,
    http: Arc<dyn HttpApi>,
    cache: Option<Arc<dyn EntityCache>>,
    hooks: RunHooks,
    auto_defer: AutoDefer,
}

impl InteractionRouter {
    pub fn new(
        dispatcher: Dispatcher,
        commands: Arc<RwLock<CommandTree>>,
        callbacks: Arc<RwLock<CallbackRegistry>>,
        http: Arc<dyn HttpApi>,
    ) -> Self {
        Self {
            dispatcher,
            commands,
            callbacks,
            http,
            cache: None,
            hooks: RunHooks::default(),
            auto_defer: AutoDefer::default(),
        }
    }

    /// Cache used to fill in the channel of interactions that only carry its id.
    pub fn with_cache(mut self, cache: Arc<dyn EntityCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_hooks(mut self, hooks: RunHooks) -> Self {
        self.hooks = hooks;
        self
    }

    /// The client-wide auto-defer policy, used when neither the command nor
    /// its extension sets one.
    pub fn with_auto_defer(mut self, auto_defer: AutoDefer) -> Self {
        self.auto_defer = auto_defer;
        self
    }

    /// Routes one raw interaction payload.
    ///
    /// Only payloads the router cannot classify are errors; everything that
    /// goes wrong while running callbacks is reported through events.
    pub async fn route(&self, payload: &Value) -> Result<(), RouterError> {
        let mut ctx = InteractionContext::from_payload(payload)?;
        if ctx.kind == InteractionKind::Ping {
            debug!(interaction = %ctx.id, "ignoring ping interaction");
            return Ok(());
        }
        self.backfill_channel(&mut ctx).await;
        let ctx = Arc::new(ctx);

        match ctx.kind {
            InteractionKind::ApplicationCommand | InteractionKind::Autocomplete => {
                self.route_command(ctx).await
            }
            InteractionKind::Component => {
                self.route_component(ctx).await;
                Ok(())
            }
            InteractionKind::ModalSubmit => {
                self.route_modal(ctx).await;
                Ok(())
            }
            InteractionKind::Ping => Ok(()),
        }
    }

    async fn backfill_channel(&self, ctx: &mut InteractionContext) {
        if ctx.channel.is_some() {
            return;
        }
        let (Some(cache), Some(channel_id)) = (&self.cache, ctx.channel_id) else {
            return;
        };
        match cache.fetch_channel(channel_id).await {
            Ok(channel) => ctx.channel = Some(channel),
            Err(CacheError::NotFound | CacheError::Forbidden) => {}
            Err(error) => debug!(%channel_id, %error, "could not fetch interaction channel"),
        }
    }

    async fn route_command(&self, ctx: Arc<InteractionContext>) -> Result<(), RouterError> {
        let command_id = ctx.command_id.ok_or(RouterError::MalformedPayload("data.id"))?;
        let Some(command) = self.resolve(command_id, &ctx.invoke_target) else {
            return Ok(());
        };

        if ctx.kind == InteractionKind::Autocomplete {
            if let Some(option) = ctx.focused_option.clone() {
                self.run_autocomplete(&command, option, ctx).await;
                return Ok(());
            }
        }

        let auto_defer = command
            .auto_defer()
            .or_else(|| command.extension().and_then(|ext| ext.auto_defer()))
            .copied()
            .unwrap_or(self.auto_defer);
        let invoke = InvokeContext::Interaction(Arc::clone(&ctx));
        if let Err(error) = guarded(self.run_command(&command, &ctx, &invoke, auto_defer)).await {
            self.dispatcher.dispatch(Event::new(EventKind::CommandError {
                ctx: invoke.clone(),
                error: share(error),
            }));
        }
        self.dispatcher
            .dispatch(Event::new(EventKind::CommandCompletion { ctx: invoke }));
        Ok(())
    }

    fn resolve(
        &self,
        command_id: Snowflake,
        name: &str,
    ) -> Option<Arc<InteractionCommand>> {
        let tree = read(&self.commands);
        let Some(scope) = tree.scope_of(command_id) else {
            error!(%command_id, name, "unknown command id received");
            return None;
        };
        let command = tree.get(scope, name).cloned();
        match &command {
            Some(command) => debug!(%scope, command = command.name(), "command should be called"),
            None => error!(%scope, %command_id, name, "no local command for a known command id"),
        }
        command
    }

    async fn run_command(
        &self,
        command: &InteractionCommand,
        ctx: &Arc<InteractionContext>,
        invoke: &InvokeContext,
        auto_defer: AutoDefer,
    ) -> Outcome {
        auto_defer.apply(&self.http, ctx).await?;
        self.hooks
            .around(invoke, command.invoke(Arc::clone(ctx)))
            .await
    }

    async fn run_autocomplete(
        &self,
        command: &InteractionCommand,
        option: String,
        ctx: Arc<InteractionContext>,
    ) {
        let result: Outcome = match command.autocomplete_callback(&option) {
            Some(callback) => guarded(callback.call_dyn(Arc::clone(&ctx))).await,
            None => Err(CommandError::MissingAutocomplete {
                command: command.name().to_owned(),
                option,
            }
            .into()),
        };
        if let Err(error) = result {
            self.dispatcher.dispatch(Event::new(EventKind::AutocompleteError {
                ctx: Arc::clone(&ctx),
                error: share(error),
            }));
        }
        self.dispatcher
            .dispatch(Event::new(EventKind::AutocompleteCompletion { ctx }));
    }

    async fn route_component(&self, ctx: Arc<InteractionContext>) {
        self.dispatcher.dispatch(Event::new(EventKind::Component {
            ctx: Arc::clone(&ctx),
        }));

        let callback = ctx
            .custom_id
            .as_deref()
            .and_then(|id| read(&self.callbacks).component(id));
        if let Some(callback) = callback {
            let invoke = InvokeContext::Interaction(Arc::clone(&ctx));
            let result = guarded(self.hooks.around(&invoke, callback.call(Arc::clone(&ctx)))).await;
            if let Err(error) = result {
                self.dispatcher.dispatch(Event::new(EventKind::ComponentError {
                    ctx: Arc::clone(&ctx),
                    error: share(error),
                }));
            }
            self.dispatcher.dispatch(Event::new(EventKind::ComponentCompletion {
                ctx: Arc::clone(&ctx),
            }));
        }

        if ctx.is_button() {
            self.dispatcher
                .dispatch(Event::new(EventKind::ButtonPressed { ctx }));
        } else if ctx.is_select() {
            self.dispatcher.dispatch(Event::new(EventKind::Select { ctx }));
        }
    }

    async fn route_modal(&self, ctx: Arc<InteractionContext>) {
        self.dispatcher.dispatch(Event::new(EventKind::ModalCompletion {
            ctx: Arc::clone(&ctx),
        }));

        let callback = ctx
            .custom_id
            .as_deref()
            .and_then(|id| read(&self.callbacks).modal(id));
        let Some(callback) = callback else {
            return;
        };
        let invoke = InvokeContext::Interaction(Arc::clone(&ctx));
        if let Err(error) = guarded(self.hooks.around(&invoke, callback.call(Arc::clone(&ctx)))).await
        {
            self.dispatcher.dispatch(Event::new(EventKind::ModalError {
                ctx,
                error: share(error),
            }));
        }
    }
}

struct RouteInteraction(Arc<InteractionRouter>);

impl Handler<Event> for RouteInteraction {
    type Output = Outcome;

    async fn call(&self, event: Event) -> Outcome {
        let Some(payload) = event.data() else {
            return Ok(());
        };
        self.0.route(payload).await.map_err(BoxError::from)
    }
}

impl Processor for InteractionRouter {
    fn listeners(self: Arc<Self>) -> Vec<Listener> {
        vec![Listener::new("raw_interaction_create", RouteInteraction(self))]
    }
}
