//! Automatic deferral of slow commands.

use herald_core::{HttpApi, HttpError, InteractionContext};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Acknowledges a command invocation before its body runs, or after a delay
/// if the body has not responded by then.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AutoDefer {
    pub enabled: bool,
    /// Defer so that only the invoker sees the eventual response.
    pub ephemeral: bool,
    /// Zero defers immediately.
    pub time_until_defer: Duration,
}

impl AutoDefer {
    pub fn new(ephemeral: bool, time_until_defer: Duration) -> Self {
        Self {
            enabled: true,
            ephemeral,
            time_until_defer,
        }
    }

    pub fn disabled() -> Self {
        Self::default()
    }

    /// Applies the policy to an invocation.
    ///
    /// An immediate defer is awaited so its failure aborts the invocation; a
    /// delayed one runs on its own timer task and only logs failures.
    pub async fn apply(
        &self,
        http: &Arc<dyn HttpApi>,
        ctx: &Arc<InteractionContext>,
    ) -> Result<(), HttpError> {
        if !self.enabled {
            return Ok(());
        }
        if self.time_until_defer.is_zero() {
            return defer(http.as_ref(), ctx, self.ephemeral).await;
        }

        let http = Arc::clone(http);
        let ctx = Arc::clone(ctx);
        let (ephemeral, delay) = (self.ephemeral, self.time_until_defer);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if ctx.responded() {
                return;
            }
            if let Err(error) = defer(http.as_ref(), &ctx, ephemeral).await {
                warn!(interaction = %ctx.id, %error, "auto defer failed");
            }
        });
        Ok(())
    }
}

async fn defer(
    http: &dyn HttpApi,
    ctx: &InteractionContext,
    ephemeral: bool,
) -> Result<(), HttpError> {
    if ctx.responded() || ctx.mark_deferred() {
        return Ok(());
    }
    http.defer_interaction(ctx.id, &ctx.token, ephemeral).await
}
