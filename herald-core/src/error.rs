//! Error types for Herald.
//!
//! This module provides a structured error hierarchy using `thiserror`:
//!
//! - [`HeraldError`] - Top-level error type for all Herald operations
//! - [`RegistrationError`] - Conflicts detected while registering commands and callbacks
//! - [`WaitError`] - Failures of one-shot waiters
//! - [`HookError`] - Failures of individual listener executions
//! - [`RouterError`] - Malformed or unsupported inbound payloads
//! - [`SyncError`] - Remote command synchronization failures

use crate::id::Scope;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// A boxed error type for dynamic error handling.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A reference-counted error that can be carried by cloneable events.
pub type SharedError = Arc<dyn std::error::Error + Send + Sync + 'static>;

/// The result every listener and command callback returns.
pub type Outcome = Result<(), BoxError>;

/// Converts a boxed error into a shareable one.
pub fn share(err: BoxError) -> SharedError {
    Arc::from(err)
}

/// Top-level error type for all Herald operations.
#[derive(Error, Debug)]
pub enum HeraldError {
    /// A command or callback could not be registered.
    #[error("registration error: {0}")]
    Registration(#[from] RegistrationError),

    /// A waiter did not complete.
    #[error("wait error: {0}")]
    Wait(#[from] WaitError),

    /// An inbound payload could not be routed.
    #[error("routing error: {0}")]
    Router(#[from] RouterError),

    /// Remote command synchronization failed.
    #[error("sync error: {0}")]
    Sync(#[from] SyncError),

    /// A custom error occurred.
    #[error(transparent)]
    Custom(BoxError),
}

/// Conflicts detected while registering commands and callbacks.
///
/// Registration never partially applies: when one of these is returned the
/// registry is left exactly as it was.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    /// A structured command with this resolved name already exists in the scope.
    #[error("duplicate command `{name}` in scope {scope}")]
    DuplicateCommand {
        /// Scope that already holds the name.
        scope: Scope,
        /// The resolved command name.
        name: String,
    },

    /// A prefixed command name or alias is already taken.
    #[error("duplicate prefixed command name or alias `{0}`")]
    DuplicatePrefixed(String),

    /// A component callback is already bound to this custom id.
    #[error("duplicate component callback for `{0}`")]
    DuplicateComponent(String),

    /// A modal callback is already bound to this custom id.
    #[error("duplicate modal callback for `{0}`")]
    DuplicateModal(String),
}

/// Failures of one-shot waiters.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WaitError {
    /// No matching event arrived in time.
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// The dispatcher was dropped before a matching event arrived.
    #[error("dispatcher closed before the waiter resolved")]
    Closed,

    /// The waiter was built without anything to match against.
    #[error("invalid waiter: {0}")]
    Invalid(&'static str),
}

/// Errors that can occur while running a listener.
#[derive(Error, Debug)]
pub enum HookError {
    /// The listener panicked during execution.
    #[error("listener panicked: {0}")]
    Panic(String),

    /// The listener was cancelled.
    #[error("listener was cancelled")]
    Cancelled,

    /// A custom listener error.
    #[error(transparent)]
    Custom(BoxError),
}

/// Errors raised while turning raw payloads into contexts.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RouterError {
    /// The interaction type code is not one the router understands.
    #[error("unknown interaction type: {0}")]
    UnknownInteractionType(u64),

    /// A required payload field was missing or had the wrong shape.
    #[error("malformed payload: missing or invalid `{0}`")]
    MalformedPayload(&'static str),
}

/// Errors surfaced by command execution before the callback runs.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// A check returned `false`.
    #[error("a check failed for command `{0}`")]
    CheckFailure(String),

    /// An autocomplete request arrived for an option without a callback.
    #[error("no autocomplete callback for option `{option}` of `{command}`")]
    MissingAutocomplete {
        /// Resolved command name.
        command: String,
        /// The focused option.
        option: String,
    },
}

/// Failures reported by the remote HTTP collaborator.
#[derive(Error, Debug, Clone)]
pub enum HttpError {
    /// The credentials lack access to the resource.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// The remote rejected the request.
    #[error("http {status}: {message}")]
    Status {
        /// Response status code.
        status: u16,
        /// Human readable message.
        message: String,
        /// Structured error map, if the remote sent one.
        errors: Option<Value>,
    },

    /// The request never reached the remote.
    #[error("transport error: {0}")]
    Transport(String),
}

/// Failures reported by the entity cache collaborator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// The entity does not exist.
    #[error("entity not found")]
    NotFound,

    /// The entity exists but cannot be read with the current credentials.
    #[error("entity not accessible")]
    Forbidden,

    /// Anything else.
    #[error("{0}")]
    Other(String),
}

/// Remote command synchronization failures.
#[derive(Error, Debug, Clone)]
pub enum SyncError {
    /// The application has no access to the scope.
    #[error("missing access to commands in scope {0}")]
    MissingAccess(Scope),

    /// The remote rejected one or more command definitions.
    #[error("remote rejected commands in scope {scope}: {}", commands.join(", "))]
    InvalidCommands {
        /// Scope the overwrite targeted.
        scope: Scope,
        /// Names of the rejected commands.
        commands: Vec<String>,
    },

    /// No application id is known yet.
    #[error("application id is not known")]
    MissingApplicationId,

    /// Any other remote failure.
    #[error(transparent)]
    Http(#[from] HttpError),
}

// Convenience conversions
impl From<BoxError> for HeraldError {
    fn from(err: BoxError) -> Self {
        HeraldError::Custom(err)
    }
}

impl From<BoxError> for HookError {
    fn from(err: BoxError) -> Self {
        HookError::Custom(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::Snowflake;

    #[test]
    fn test_invalid_commands_message_lists_names() {
        let err = SyncError::InvalidCommands {
            scope: Scope::Guild(Snowflake(5)),
            commands: vec!["ban".into(), "kick".into()],
        };
        assert_eq!(err.to_string(), "remote rejected commands in scope 5: ban, kick");
    }

    #[test]
    fn test_share_preserves_message() {
        let boxed: BoxError = "boom".into();
        let shared = share(boxed);
        assert_eq!(shared.to_string(), "boom");
    }
}
