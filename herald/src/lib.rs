//! # herald - Event Dispatch and Command Routing
//!
//! `herald` is the event dispatch core of a chat client. Raw gateway events
//! go in; listeners, structured (slash) commands, prefixed text commands and
//! component/modal callbacks come out, each run isolated on its own task with
//! failures turned into events.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use herald::prelude::*;
//!
//! let client = Client::new(
//!     ClientConfig::new().with_prefixes(["!"]),
//!     http,
//! );
//!
//! client.add_interaction(
//!     InteractionCommand::slash("ping", "Pong!").with_callback(
//!         |ctx: Arc<InteractionContext>| async move { Ok(()) },
//!     ),
//! )?;
//!
//! #[herald::listen]
//! async fn on_command_error(event: Event) -> Outcome {
//!     tracing::warn!(%event, "a command failed");
//!     Ok(())
//! }
//! client.add_listener(on_command_error::listener());
//!
//! // Fed by the transport:
//! client.dispatch_raw("INTERACTION_CREATE", payload);
//! ```

#![deny(clippy::wildcard_imports)]

mod client;
mod config;

pub use client::Client;
pub use config::ClientConfig;

pub use herald_core::{
    // Errors
    BoxError,
    CacheError,
    // Handler
    Callback,
    Check,
    CommandError,
    DynHandler,
    // Collaborators
    EntityCache,
    // Events
    Event,
    EventKind,
    ExtractError,
    FromEvent,
    Handler,
    HeraldError,
    HookError,
    HttpApi,
    HttpError,
    Intents,
    // Contexts
    InteractionContext,
    InteractionKind,
    InvokeContext,
    Listener,
    Outcome,
    PrefixedContext,
    RegistrationError,
    RouterError,
    Scope,
    SharedError,
    Snowflake,
    SyncError,
    WaitError,
    async_trait,
    callback,
    check,
    component_type,
    normalize_event_name,
    required_intents,
    share,
};

pub use herald_std::callbacks::InteractionCallback;
pub use herald_std::commands::{CommandKind, InteractionCommand};
pub use herald_std::dispatch::{ComponentCheck, Dispatcher, WaitFor};
pub use herald_std::extension::Extension;
pub use herald_std::hooks::auto_defer::AutoDefer;
pub use herald_std::prefixed::PrefixedCommand;
pub use herald_std::routing::{MENTION_PREFIX, Prefix};

/// Standard hook implementations.
pub mod hooks {
    pub use herald_std::hooks::{auto_defer, defaults, logging, permissions, run};
}

/// Testing utilities.
pub mod testing {
    #![allow(clippy::wildcard_imports)]
    pub use herald_std::testing::*;
}

/// Prelude module - common imports for Herald.
///
/// # Usage
///
/// ```rust,ignore
/// use herald::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        AutoDefer,
        BoxError,
        Client,
        ClientConfig,
        Event,
        EventKind,
        Extension,
        Handler,
        Intents,
        InteractionCallback,
        InteractionCommand,
        InteractionContext,
        InvokeContext,
        Listener,
        MENTION_PREFIX,
        Outcome,
        PrefixedCommand,
        PrefixedContext,
        Scope,
        Snowflake,
    };
    pub use std::sync::Arc;
}

#[cfg(feature = "macros")]
pub use herald_macros::listen;
