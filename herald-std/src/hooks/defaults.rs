//! Library-provided listeners.
//!
//! Every listener here except `resume` is a default: registering a listener
//! for the same event with [`Listener::disable_defaults`] removes it.

use super::logging::{default_error_handler, error_chain};
use crate::dispatch::Dispatcher;
use herald_core::{
    CommandError, Event, EventKind, Handler, HttpApi, HttpError, InvokeContext, Listener, Outcome,
};
use std::sync::Arc;
use tracing::{debug, info};

/// Reply sent when a command check rejects the invoker.
pub const CHECK_FAILURE_REPLY: &str = "You do not have permission to run this command!";

/// Longest traceback echoed back to a user, leaving room for the code fence.
pub const TRACEBACK_LIMIT: usize = 4096 - 8;

/// Builds the default listeners.
pub fn default_listeners(
    dispatcher: &Dispatcher,
    http: Arc<dyn HttpApi>,
    send_command_tracebacks: bool,
) -> Vec<Listener> {
    let forward = || ForwardError {
        dispatcher: dispatcher.clone(),
    };
    let readiness = |ready| Readiness {
        dispatcher: dispatcher.clone(),
        ready,
    };
    vec![
        Listener::new("error", LogError).as_default(),
        Listener::new(
            "command_error",
            ReportCommandError {
                dispatcher: dispatcher.clone(),
                http,
                send_command_tracebacks,
            },
        )
        .as_default(),
        Listener::new("component_error", forward()).as_default(),
        Listener::new("autocomplete_error", forward()).as_default(),
        Listener::new("modal_error", forward()).as_default(),
        Listener::new("command_completion", LogCompletion).as_default(),
        Listener::new("component_completion", LogCompletion).as_default(),
        Listener::new("autocomplete_completion", LogCompletion).as_default(),
        Listener::new("modal_completion", LogCompletion).as_default(),
        Listener::new("disconnect", readiness(false)).as_default(),
        Listener::new("resume", readiness(true)),
    ]
}

struct LogError;

impl Handler<Event> for LogError {
    type Output = Outcome;

    async fn call(&self, event: Event) -> Outcome {
        if let EventKind::Error { source, error, .. } = event.kind() {
            default_error_handler(source, error.as_ref());
        }
        Ok(())
    }
}

struct ReportCommandError {
    dispatcher: Dispatcher,
    http: Arc<dyn HttpApi>,
    send_command_tracebacks: bool,
}

impl Handler<Event> for ReportCommandError {
    type Output = Outcome;

    async fn call(&self, event: Event) -> Outcome {
        let EventKind::CommandError { ctx, error } = event.kind() else {
            return Ok(());
        };
        self.dispatcher.dispatch(Event::error(
            format!("cmd `/{}`", ctx.invoke_target()),
            Arc::clone(error),
            Some(ctx.clone()),
        ));

        let reply = if matches!(
            error.downcast_ref::<CommandError>(),
            Some(CommandError::CheckFailure(_))
        ) {
            CHECK_FAILURE_REPLY.to_owned()
        } else if self.send_command_tracebacks {
            traceback_reply(error.as_ref(), self.http.token().as_deref())
        } else {
            return Ok(());
        };
        if let Err(error) = reply_to(self.http.as_ref(), ctx, &reply).await {
            debug!(%error, "could not reply to the failed invocation");
        }
        Ok(())
    }
}

/// Formats an error chain for a user-facing reply, with the token scrubbed.
pub fn traceback_reply(
    error: &(dyn std::error::Error + 'static),
    token: Option<&str>,
) -> String {
    let mut out = error_chain(error);
    if let Some(token) = token.filter(|token| !token.is_empty()) {
        out = out.replace(token, "[REDACTED TOKEN]");
    }
    let out: String = out.chars().take(TRACEBACK_LIMIT).collect();
    format!("```\n{out}```")
}

async fn reply_to(http: &dyn HttpApi, ctx: &InvokeContext, content: &str) -> Result<(), HttpError> {
    match ctx {
        InvokeContext::Interaction(ctx) => {
            ctx.mark_responded();
            http.respond_interaction(ctx.id, &ctx.token, content, false)
                .await
        }
        InvokeContext::Prefixed(ctx) => match ctx.channel_id {
            Some(channel_id) => http.create_message(channel_id, content).await,
            None => Ok(()),
        },
    }
}

struct ForwardError {
    dispatcher: Dispatcher,
}

impl Handler<Event> for ForwardError {
    type Output = Outcome;

    async fn call(&self, event: Event) -> Outcome {
        let (Some(error), Some(ctx)) = (event.error_value(), event.interaction()) else {
            return Ok(());
        };
        let custom_id = ctx.custom_id.as_deref().unwrap_or_default();
        let source = match event.kind() {
            EventKind::ComponentError { .. } => format!("Component Callback for {custom_id}"),
            EventKind::AutocompleteError { .. } => format!(
                "Autocomplete Callback for /{} - Option: {}",
                ctx.invoke_target,
                ctx.focused_option.as_deref().unwrap_or_default()
            ),
            EventKind::ModalError { .. } => format!("Modal Callback for custom_id {custom_id}"),
            _ => return Ok(()),
        };
        self.dispatcher
            .dispatch(Event::error(source, Arc::clone(error), event.context()));
        Ok(())
    }
}

struct LogCompletion;

impl Handler<Event> for LogCompletion {
    type Output = Outcome;

    async fn call(&self, event: Event) -> Outcome {
        match event.kind() {
            EventKind::CommandCompletion { ctx } => match ctx {
                InvokeContext::Interaction(ctx) => {
                    info!(kwargs = ?ctx.kwargs, "Command Called: /{}", ctx.invoke_target);
                }
                InvokeContext::Prefixed(ctx) => {
                    info!(args = ?ctx.args, "Command Called: @{}", ctx.invoke_target);
                }
            },
            EventKind::ComponentCompletion { ctx } => {
                info!(values = ?ctx.values, "Component Called: ¢{}", ctx.invoke_target);
            }
            EventKind::AutocompleteCompletion { ctx } => info!(
                focused_option = ?ctx.focused_option,
                kwargs = ?ctx.kwargs,
                "Autocomplete Called: ${}",
                ctx.invoke_target
            ),
            EventKind::ModalCompletion { ctx } => {
                info!(responses = ?ctx.responses, "Modal Called: {}", ctx.invoke_target);
            }
            _ => {}
        }
        Ok(())
    }
}

struct Readiness {
    dispatcher: Dispatcher,
    ready: bool,
}

impl Handler<Event> for Readiness {
    type Output = Outcome;

    async fn call(&self, _event: Event) -> Outcome {
        self.dispatcher.set_ready(self.ready);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockHttp, RecordingListener, message_payload};
    use herald_core::{BoxError, Intents, PrefixedContext, share};
    use thiserror::Error;

    #[derive(Debug, Error)]
    #[error("request with token abc.def failed")]
    struct Leaky;

    fn setup(tracebacks: bool) -> (Dispatcher, Arc<MockHttp>, RecordingListener) {
        let dispatcher = Dispatcher::new(Intents::DEFAULT);
        let http = Arc::new(MockHttp::new().with_token("abc.def"));
        for listener in default_listeners(&dispatcher, http.clone(), tracebacks) {
            dispatcher.add_listener(listener);
        }
        let recorder = RecordingListener::new();
        dispatcher.add_listener(recorder.listener("error"));
        (dispatcher, http, recorder)
    }

    fn prefixed_ctx() -> InvokeContext {
        let mut ctx = PrefixedContext::from_message(&message_payload::message("!ban"));
        ctx.invoke_target = "ban".into();
        InvokeContext::Prefixed(Arc::new(ctx))
    }

    #[tokio::test]
    async fn test_command_error_reports_and_redacts() {
        let (dispatcher, http, recorder) = setup(true);
        dispatcher.dispatch(Event::new(EventKind::CommandError {
            ctx: prefixed_ctx(),
            error: share(Box::new(Leaky)),
        }));
        dispatcher.wait_idle().await;

        let errors = recorder.events();
        assert_eq!(errors.len(), 1);
        match errors[0].kind() {
            EventKind::Error { source, .. } => assert_eq!(source, "cmd `/ban`"),
            other => panic!("unexpected event: {other:?}"),
        }
        let messages = http.messages();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].1.contains("[REDACTED TOKEN]"));
        assert!(!messages[0].1.contains("abc.def"));
    }

    #[tokio::test]
    async fn test_check_failure_gets_fixed_reply() {
        let (dispatcher, http, _recorder) = setup(false);
        dispatcher.dispatch(Event::new(EventKind::CommandError {
            ctx: prefixed_ctx(),
            error: share(Box::new(CommandError::CheckFailure("ban".into()))),
        }));
        dispatcher.wait_idle().await;
        assert_eq!(http.messages()[0].1, CHECK_FAILURE_REPLY);
    }

    #[tokio::test]
    async fn test_tracebacks_can_be_disabled() {
        let (dispatcher, http, _recorder) = setup(false);
        dispatcher.dispatch(Event::new(EventKind::CommandError {
            ctx: prefixed_ctx(),
            error: share(BoxError::from("boom")),
        }));
        dispatcher.wait_idle().await;
        assert!(http.messages().is_empty());
    }

    #[test]
    fn test_traceback_is_truncated() {
        let long = BoxError::from("x".repeat(TRACEBACK_LIMIT * 2));
        let reply = traceback_reply(long.as_ref(), None);
        assert_eq!(reply.chars().count(), TRACEBACK_LIMIT + 7);
    }

    #[tokio::test]
    async fn test_readiness_follows_connection() {
        let (dispatcher, _http, _recorder) = setup(true);
        dispatcher.dispatch(Event::new(EventKind::Resume));
        dispatcher.wait_idle().await;
        assert!(dispatcher.is_ready());

        dispatcher.dispatch(Event::new(EventKind::Disconnect));
        dispatcher.wait_idle().await;
        assert!(!dispatcher.is_ready());
    }
}
