//! The event model.
//!
//! Every event carries a normalized snake_case name, which is the key listeners
//! and waiters register under, plus a typed payload.

use crate::context::{InteractionContext, InvokeContext};
use crate::error::SharedError;
use serde_json::Value;
use std::borrow::Cow;
use std::convert::Infallible;
use std::fmt;
use std::sync::Arc;

/// Normalizes an event name into its registry key.
///
/// CamelCase is folded into snake_case, leading underscores and a leading
/// `on_` are stripped, and the result is lowercased:
/// `"MessageCreate"`, `"on_message_create"` and `"_message_create"` all
/// become `"message_create"`.
pub fn normalize_event_name(name: &str) -> String {
    let mut snake = String::with_capacity(name.len() + 4);
    let mut prev: Option<char> = None;
    for ch in name.chars() {
        if ch.is_ascii_uppercase() {
            if prev.is_some_and(|p| p.is_ascii_lowercase() || p.is_ascii_digit()) {
                snake.push('_');
            }
            snake.push(ch.to_ascii_lowercase());
        } else {
            snake.push(ch);
        }
        prev = Some(ch);
    }
    let trimmed = snake.trim_start_matches('_');
    let trimmed = trimmed.strip_prefix("on_").unwrap_or(trimmed);
    trimmed.to_owned()
}

/// The typed payload of an [`Event`].
#[derive(Debug, Clone)]
pub enum EventKind {
    /// An unparsed gateway event.
    Raw {
        /// Gateway event name, e.g. `MESSAGE_CREATE`.
        name: String,
        data: Value,
    },
    /// An error report. Never re-reported if a listener of it fails.
    Error {
        /// Where the failure happened.
        source: String,
        error: SharedError,
        ctx: Option<InvokeContext>,
    },
    CommandError {
        ctx: InvokeContext,
        error: SharedError,
    },
    CommandCompletion {
        ctx: InvokeContext,
    },
    Component {
        ctx: Arc<InteractionContext>,
    },
    ComponentError {
        ctx: Arc<InteractionContext>,
        error: SharedError,
    },
    ComponentCompletion {
        ctx: Arc<InteractionContext>,
    },
    ButtonPressed {
        ctx: Arc<InteractionContext>,
    },
    Select {
        ctx: Arc<InteractionContext>,
    },
    AutocompleteError {
        ctx: Arc<InteractionContext>,
        error: SharedError,
    },
    AutocompleteCompletion {
        ctx: Arc<InteractionContext>,
    },
    ModalCompletion {
        ctx: Arc<InteractionContext>,
    },
    ModalError {
        ctx: Arc<InteractionContext>,
        error: SharedError,
    },
    Startup,
    Login,
    Ready,
    Resume,
    Disconnect,
    /// A user-defined event.
    Custom {
        name: String,
        data: Value,
    },
}

impl EventKind {
    fn name(&self) -> Cow<'static, str> {
        let name = match self {
            Self::Raw { name, .. } => {
                return Cow::Owned(format!("raw_{}", normalize_event_name(name)));
            }
            Self::Custom { name, .. } => return Cow::Owned(normalize_event_name(name)),
            Self::Error { .. } => "error",
            Self::CommandError { .. } => "command_error",
            Self::CommandCompletion { .. } => "command_completion",
            Self::Component { .. } => "component",
            Self::ComponentError { .. } => "component_error",
            Self::ComponentCompletion { .. } => "component_completion",
            Self::ButtonPressed { .. } => "button_pressed",
            Self::Select { .. } => "select",
            Self::AutocompleteError { .. } => "autocomplete_error",
            Self::AutocompleteCompletion { .. } => "autocomplete_completion",
            Self::ModalCompletion { .. } => "modal_completion",
            Self::ModalError { .. } => "modal_error",
            Self::Startup => "startup",
            Self::Login => "login",
            Self::Ready => "ready",
            Self::Resume => "resume",
            Self::Disconnect => "disconnect",
        };
        Cow::Borrowed(name)
    }
}

/// A named, typed event.
#[derive(Debug, Clone)]
pub struct Event {
    name: String,
    kind: EventKind,
}

impl Event {
    /// Creates an event, deriving its name from the kind.
    pub fn new(kind: EventKind) -> Self {
        Self {
            name: kind.name().into_owned(),
            kind,
        }
    }

    /// An unparsed gateway event. `MESSAGE_CREATE` is named `raw_message_create`.
    pub fn raw(name: impl Into<String>, data: Value) -> Self {
        Self::new(EventKind::Raw {
            name: name.into(),
            data,
        })
    }

    /// A user-defined event.
    pub fn custom(name: impl Into<String>, data: Value) -> Self {
        Self::new(EventKind::Custom {
            name: name.into(),
            data,
        })
    }

    /// An error report.
    pub fn error(source: impl Into<String>, error: SharedError, ctx: Option<InvokeContext>) -> Self {
        Self::new(EventKind::Error {
            source: source.into(),
            error,
            ctx,
        })
    }

    /// The normalized registry key of this event.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &EventKind {
        &self.kind
    }

    /// True for the error-report event, whose listeners must never trigger
    /// another report.
    pub fn is_error_report(&self) -> bool {
        matches!(self.kind, EventKind::Error { .. })
    }

    /// True for unparsed gateway events.
    pub fn is_raw(&self) -> bool {
        matches!(self.kind, EventKind::Raw { .. })
    }

    /// The JSON payload of raw and custom events.
    pub fn data(&self) -> Option<&Value> {
        match &self.kind {
            EventKind::Raw { data, .. } | EventKind::Custom { data, .. } => Some(data),
            _ => None,
        }
    }

    /// The error carried by any of the error variants.
    pub fn error_value(&self) -> Option<&SharedError> {
        match &self.kind {
            EventKind::Error { error, .. }
            | EventKind::CommandError { error, .. }
            | EventKind::ComponentError { error, .. }
            | EventKind::AutocompleteError { error, .. }
            | EventKind::ModalError { error, .. } => Some(error),
            _ => None,
        }
    }

    /// The invocation context, if the event carries one.
    pub fn context(&self) -> Option<InvokeContext> {
        match &self.kind {
            EventKind::Error { ctx, .. } => ctx.clone(),
            EventKind::CommandError { ctx, .. } | EventKind::CommandCompletion { ctx } => {
                Some(ctx.clone())
            }
            _ => self.interaction().cloned().map(InvokeContext::Interaction),
        }
    }

    /// The interaction context of component, autocomplete and modal events.
    pub fn interaction(&self) -> Option<&Arc<InteractionContext>> {
        match &self.kind {
            EventKind::Component { ctx }
            | EventKind::ComponentError { ctx, .. }
            | EventKind::ComponentCompletion { ctx }
            | EventKind::ButtonPressed { ctx }
            | EventKind::Select { ctx }
            | EventKind::AutocompleteError { ctx, .. }
            | EventKind::AutocompleteCompletion { ctx }
            | EventKind::ModalCompletion { ctx }
            | EventKind::ModalError { ctx, .. } => Some(ctx),
            EventKind::Error { ctx, .. } => ctx.as_ref().and_then(InvokeContext::as_interaction),
            EventKind::CommandError { ctx, .. } | EventKind::CommandCompletion { ctx } => {
                ctx.as_interaction()
            }
            _ => None,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            EventKind::Error { source, error, .. } => {
                write!(f, "{}(source={source:?}, error={error})", self.name)
            }
            _ => match self.context() {
                Some(ctx) => write!(f, "{}({})", self.name, ctx.describe()),
                None => f.write_str(&self.name),
            },
        }
    }
}

impl From<EventKind> for Event {
    fn from(kind: EventKind) -> Self {
        Self::new(kind)
    }
}

// ============================================================================
// Extraction
// ============================================================================

/// Error type for extraction failures.
#[derive(Debug)]
pub struct ExtractError {
    message: String,
}

impl ExtractError {
    /// Create a new extraction error with a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Get the error message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ExtractError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "extraction failed: {}", self.message)
    }
}

impl std::error::Error for ExtractError {}

/// Extracts typed data from an event.
#[diagnostic::on_unimplemented(
    message = "`{Self}` cannot be extracted from an `Event`",
    label = "missing `FromEvent` implementation"
)]
pub trait FromEvent: Sized {
    /// The error type returned if extraction fails.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Attempt to extract `Self` from the given event.
    fn from_event(event: &Event) -> Result<Self, Self::Error>;
}

impl<T: FromEvent> FromEvent for Option<T> {
    type Error = Infallible;

    fn from_event(event: &Event) -> Result<Self, Self::Error> {
        Ok(T::from_event(event).ok())
    }
}

impl FromEvent for Event {
    type Error = Infallible;

    fn from_event(event: &Event) -> Result<Self, Self::Error> {
        Ok(event.clone())
    }
}

impl FromEvent for Arc<InteractionContext> {
    type Error = ExtractError;

    fn from_event(event: &Event) -> Result<Self, Self::Error> {
        event
            .interaction()
            .cloned()
            .ok_or_else(|| ExtractError::new(format!("`{}` carries no interaction", event.name())))
    }
}

impl FromEvent for InvokeContext {
    type Error = ExtractError;

    fn from_event(event: &Event) -> Result<Self, Self::Error> {
        event
            .context()
            .ok_or_else(|| ExtractError::new(format!("`{}` carries no context", event.name())))
    }
}

impl FromEvent for Value {
    type Error = ExtractError;

    fn from_event(event: &Event) -> Result<Self, Self::Error> {
        event
            .data()
            .cloned()
            .ok_or_else(|| ExtractError::new(format!("`{}` carries no payload", event.name())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_event_name() {
        assert_eq!(normalize_event_name("MessageCreate"), "message_create");
        assert_eq!(normalize_event_name("on_message_create"), "message_create");
        assert_eq!(normalize_event_name("_on_ready"), "ready");
        assert_eq!(normalize_event_name("MESSAGE_CREATE"), "message_create");
        assert_eq!(normalize_event_name("ready"), "ready");
    }

    #[test]
    fn test_event_names() {
        assert_eq!(Event::raw("MESSAGE_CREATE", json!({})).name(), "raw_message_create");
        assert_eq!(Event::new(EventKind::Ready).name(), "ready");
        assert_eq!(Event::custom("OnSomethingHappened", json!(1)).name(), "something_happened");
    }

    #[test]
    fn test_extract_payload() {
        let event = Event::raw("GUILD_CREATE", json!({"id": "1"}));
        assert_eq!(Value::from_event(&event).unwrap(), json!({"id": "1"}));
        assert!(Arc::<InteractionContext>::from_event(&event).is_err());
        assert!(Option::<InvokeContext>::from_event(&event).unwrap().is_none());
    }
}
