//! # Listeners
//!
//! A [`Listener`] binds a callback to a normalized event name together with
//! the flags the dispatcher consults before running it.

use crate::error::Outcome;
use crate::event::{Event, normalize_event_name};
use crate::handler::{Callback, Handler};
use std::fmt;
use std::sync::Arc;

/// A callback registered for one event name.
#[derive(Clone)]
pub struct Listener {
    event: String,
    callback: Callback<Event>,
    is_default: bool,
    disables_defaults: bool,
    requires_ready: bool,
    extension: Option<String>,
}

impl Listener {
    /// Creates a listener for `event`. The name is normalized, so
    /// `"on_message_create"` and `"MessageCreate"` register the same key.
    pub fn new<H>(event: &str, handler: H) -> Self
    where
        H: Handler<Event, Output = Outcome>,
    {
        Self::from_callback(event, Arc::new(handler))
    }

    /// Creates a listener from an already erased callback.
    pub fn from_callback(event: &str, callback: Callback<Event>) -> Self {
        Self {
            event: normalize_event_name(event),
            callback,
            is_default: false,
            disables_defaults: false,
            requires_ready: false,
            extension: None,
        }
    }

    /// Marks this listener as a framework default, removed as soon as a
    /// listener that disables defaults is registered for the same event.
    pub fn as_default(mut self) -> Self {
        self.is_default = true;
        self
    }

    /// Removes default listeners of the same event on registration.
    pub fn disable_defaults(mut self) -> Self {
        self.disables_defaults = true;
        self
    }

    /// Holds invocations back until the client is ready.
    pub fn delay_until_ready(mut self) -> Self {
        self.requires_ready = true;
        self
    }

    /// Attributes the listener to an extension.
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = Some(extension.into());
        self
    }

    pub fn event(&self) -> &str {
        &self.event
    }

    pub fn callback(&self) -> &Callback<Event> {
        &self.callback
    }

    pub fn is_default(&self) -> bool {
        self.is_default
    }

    pub fn disables_defaults(&self) -> bool {
        self.disables_defaults
    }

    pub fn requires_ready(&self) -> bool {
        self.requires_ready
    }

    pub fn extension(&self) -> Option<&str> {
        self.extension.as_deref()
    }

    /// Runs the callback.
    pub async fn call(&self, event: Event) -> Outcome {
        self.callback.call_dyn(event).await
    }
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listener")
            .field("event", &self.event)
            .field("is_default", &self.is_default)
            .field("disables_defaults", &self.disables_defaults)
            .field("requires_ready", &self.requires_ready)
            .field("extension", &self.extension)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventKind;

    #[tokio::test]
    async fn test_listener_normalizes_and_calls() {
        let listener = Listener::new("on_ready", |_event: Event| async { Ok(()) })
            .delay_until_ready()
            .with_extension("greeter");
        assert_eq!(listener.event(), "ready");
        assert!(listener.requires_ready());
        assert_eq!(listener.extension(), Some("greeter"));
        assert!(listener.call(Event::new(EventKind::Ready)).await.is_ok());
    }
}
