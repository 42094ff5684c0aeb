//! Extension metadata.
//!
//! Loading extensions is the embedding application's business; the engine
//! only needs to know which registrations belong together and the settings
//! an extension overrides for its commands.

use crate::hooks::auto_defer::AutoDefer;
use herald_core::{Callback, Handler, InvokeContext, Outcome, SharedError};
use std::fmt;
use std::sync::Arc;

/// Handles a failed hierarchical check in place of the `command_error` event.
pub type ErrorCallback = Callback<(SharedError, InvokeContext)>;

/// A named group of registrations.
#[derive(Clone)]
pub struct Extension {
    name: String,
    auto_defer: Option<AutoDefer>,
    error_callback: Option<ErrorCallback>,
}

impl Extension {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            auto_defer: None,
            error_callback: None,
        }
    }

    /// Auto-defer policy for this extension's commands, unless a command sets its own.
    pub fn with_auto_defer(mut self, auto_defer: AutoDefer) -> Self {
        self.auto_defer = Some(auto_defer);
        self
    }

    /// Error handler for this extension's prefixed command groups.
    pub fn with_error_callback<H>(mut self, handler: H) -> Self
    where
        H: Handler<(SharedError, InvokeContext), Output = Outcome>,
    {
        self.error_callback = Some(Arc::new(handler));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn auto_defer(&self) -> Option<&AutoDefer> {
        self.auto_defer.as_ref()
    }

    pub fn error_callback(&self) -> Option<&ErrorCallback> {
        self.error_callback.as_ref()
    }
}

impl fmt::Debug for Extension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Extension")
            .field("name", &self.name)
            .field("auto_defer", &self.auto_defer)
            .finish_non_exhaustive()
    }
}
