//! Pre/post-run hooks and failure routing shared by every command flavour.

use crate::dispatch::Dispatcher;
use crate::extension::{ErrorCallback, Extension};
use futures::FutureExt;
use herald_core::{
    Callback, Event, EventKind, Handler, HookError, InvokeContext, Outcome, SharedError, share,
};
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

/// Client-wide callbacks run around every command, component and modal
/// callback.
#[derive(Clone, Default)]
pub struct RunHooks {
    pre_run: Option<Callback<InvokeContext>>,
    post_run: Option<Callback<InvokeContext>>,
}

impl RunHooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs before the body. A failure skips the body and the post-run hook.
    pub fn with_pre_run<H>(mut self, handler: H) -> Self
    where
        H: Handler<InvokeContext, Output = Outcome>,
    {
        self.pre_run = Some(Arc::new(handler));
        self
    }

    /// Runs after a successful body.
    pub fn with_post_run<H>(mut self, handler: H) -> Self
    where
        H: Handler<InvokeContext, Output = Outcome>,
    {
        self.post_run = Some(Arc::new(handler));
        self
    }

    /// Runs `body` between the hooks, stopping at the first failure.
    pub async fn around<F>(&self, ctx: &InvokeContext, body: F) -> Outcome
    where
        F: Future<Output = Outcome>,
    {
        if let Some(pre_run) = &self.pre_run {
            pre_run.call_dyn(ctx.clone()).await?;
        }
        body.await?;
        if let Some(post_run) = &self.post_run {
            post_run.call_dyn(ctx.clone()).await?;
        }
        Ok(())
    }
}

impl fmt::Debug for RunHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunHooks")
            .field("pre_run", &self.pre_run.is_some())
            .field("post_run", &self.post_run.is_some())
            .finish()
    }
}

/// Awaits `body`, turning a panic into [`HookError::Panic`].
pub async fn guarded<F>(body: F) -> Outcome
where
    F: Future<Output = Outcome>,
{
    match AssertUnwindSafe(body).catch_unwind().await {
        Ok(result) => result,
        Err(panic) => Err(Box::new(HookError::Panic(panic_message(panic.as_ref())))),
    }
}

/// Hands a failure to the command's own error callback, else the
/// extension's. Dispatches `command_error` when neither exists or the
/// callback itself fails.
pub(crate) async fn report_failure(
    dispatcher: &Dispatcher,
    own: Option<&ErrorCallback>,
    extension: Option<&Arc<Extension>>,
    error: SharedError,
    ctx: InvokeContext,
) {
    let handler = own.or_else(|| extension.and_then(|ext| ext.error_callback()));
    let error = match handler {
        Some(handler) => match guarded(handler.call_dyn((error, ctx.clone()))).await {
            Ok(()) => return,
            Err(callback_error) => share(callback_error),
        },
        None => error,
    };
    dispatcher.dispatch(Event::new(EventKind::CommandError { ctx, error }));
}

pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_owned()
    }
}
