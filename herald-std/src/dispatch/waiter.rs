//! One-shot waiters.

use super::dispatcher::{Dispatcher, Inner};
use super::lock;
use herald_core::{BoxFuture, Event, InteractionContext, Snowflake, WaitError};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Weak};
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::oneshot;

pub(super) type Predicate = Arc<dyn Fn(&Event) -> bool + Send + Sync>;

pub(super) struct Waiter {
    pub(super) id: u64,
    pub(super) predicate: Predicate,
    pub(super) slot: oneshot::Sender<Event>,
}

/// Removes its waiter from the registry when dropped, so a timed-out or
/// abandoned waiter never leaks.
pub(super) struct WaiterGuard {
    inner: Weak<Inner>,
    event: String,
    id: u64,
}

impl WaiterGuard {
    pub(super) fn new(inner: Weak<Inner>, event: String, id: u64) -> Self {
        Self { inner, event, id }
    }
}

impl Drop for WaiterGuard {
    fn drop(&mut self) {
        let Some(inner) = self.inner.upgrade() else {
            return;
        };
        let mut waiters = lock(&inner.waiters);
        if let Some(pending) = waiters.get_mut(&self.event) {
            pending.retain(|w| w.id != self.id);
            if pending.is_empty() {
                waiters.remove(&self.event);
            }
        }
    }
}

/// The pending result of a `wait_for` call.
///
/// The waiter is registered when this value is created, not when it is first
/// polled, so an event dispatched in between is not missed. Dropping it
/// unregisters the waiter.
#[must_use = "the waiter is removed as soon as this future is dropped"]
pub struct WaitFor {
    inner: BoxFuture<'static, Result<Event, WaitError>>,
}

impl WaitFor {
    fn failed(error: WaitError) -> Self {
        Self {
            inner: Box::pin(async move { Err(error) }),
        }
    }
}

impl Future for WaitFor {
    type Output = Result<Event, WaitError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.inner.as_mut().poll(cx)
    }
}

/// An extra predicate over a component interaction.
pub type ComponentCheck = Arc<dyn Fn(&InteractionContext) -> bool + Send + Sync>;

impl Dispatcher {
    /// Waits for the next `event` for which `predicate` holds.
    ///
    /// With a timeout, the result is [`WaitError::Timeout`] if nothing
    /// matched in time; the waiter is removed either way. The predicate runs
    /// without any registry lock held and may call back into the dispatcher.
    pub fn wait_for<P>(&self, event: &str, predicate: P, timeout: Option<Duration>) -> WaitFor
    where
        P: Fn(&Event) -> bool + Send + Sync + 'static,
    {
        let (receiver, guard) = self.register_waiter(event, Arc::new(predicate));
        let inner = async move {
            let _guard = guard;
            let received = match timeout {
                Some(limit) => tokio::time::timeout(limit, receiver)
                    .await
                    .map_err(|_| WaitError::Timeout(limit))?,
                None => receiver.await,
            };
            received.map_err(|_| WaitError::Closed)
        };
        WaitFor {
            inner: Box::pin(inner),
        }
    }

    /// Waits for a component interaction on one of `messages` and/or with one
    /// of `custom_ids`, optionally filtered further by `check`.
    ///
    /// At least one of `messages` and `custom_ids` must be non-empty.
    pub fn wait_for_component(
        &self,
        messages: Vec<Snowflake>,
        custom_ids: Vec<String>,
        check: Option<ComponentCheck>,
        timeout: Option<Duration>,
    ) -> WaitFor {
        if messages.is_empty() && custom_ids.is_empty() {
            return WaitFor::failed(WaitError::Invalid(
                "a message or a custom id to wait on is required",
            ));
        }

        let predicate = move |event: &Event| {
            let Some(ctx) = event.interaction() else {
                return false;
            };
            let message_matches = messages.is_empty()
                || ctx.message_id.is_some_and(|id| messages.contains(&id));
            let component_matches = custom_ids.is_empty()
                || ctx
                    .custom_id
                    .as_ref()
                    .is_some_and(|id| custom_ids.contains(id));
            message_matches && component_matches && check.as_ref().is_none_or(|check| check(ctx))
        };
        self.wait_for("component", predicate, timeout)
    }

    /// Waits for the submission of the modal `custom_id`, optionally only by `author`.
    pub fn wait_for_modal(
        &self,
        custom_id: impl Into<String>,
        author: Option<Snowflake>,
        timeout: Option<Duration>,
    ) -> WaitFor {
        let custom_id = custom_id.into();
        let predicate = move |event: &Event| {
            event.interaction().is_some_and(|ctx| {
                ctx.custom_id.as_deref() == Some(custom_id.as_str())
                    && author.is_none_or(|author| ctx.author_id == Some(author))
            })
        };
        self.wait_for("modal_completion", predicate, timeout)
    }
}
