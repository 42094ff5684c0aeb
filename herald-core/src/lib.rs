//! # herald-core
//!
//! Core types for the Herald event dispatch and command routing engine.
//!
//! This crate has minimal dependencies and is designed to be imported by
//! extensions that don't need the full `herald-std` implementation.
//!
//! # Building Blocks
//!
//! - [`Event`] - A named, typed event; names are normalized by
//!   [`normalize_event_name`]
//! - [`Handler`] / [`DynHandler`] - Async endpoints, erased as [`Callback`]s
//! - [`Listener`] - A callback bound to an event name plus dispatch flags
//! - [`InteractionContext`] / [`PrefixedContext`] - Per-invocation contexts
//! - [`HttpApi`] / [`EntityCache`] - Remote collaborators the engine drives
//!
//! # Error Types
//!
//! - [`HeraldError`] - Top-level error type
//! - [`RegistrationError`] - Registration conflicts
//! - [`SyncError`] - Command synchronization failures

#![deny(clippy::wildcard_imports)]

mod api;
mod context;
mod error;
mod event;
mod handler;
mod id;
mod intents;
mod listener;

// Re-exports
pub use api::{EntityCache, HttpApi};
pub use context::{
    InteractionContext, InteractionKind, InvokeContext, PrefixedContext, SUB_COMMAND,
    SUB_COMMAND_GROUP, component_type,
};
pub use error::{
    BoxError, CacheError, CommandError, HeraldError, HookError, HttpError, Outcome,
    RegistrationError, RouterError, SharedError, SyncError, WaitError, share,
};
pub use event::{Event, EventKind, ExtractError, FromEvent, normalize_event_name};
pub use handler::{BoxFuture, Callback, Check, DynHandler, Handler, callback, check};
pub use id::{Scope, Snowflake};
pub use intents::{Intents, required_intents};
pub use listener::Listener;

/// Re-exported for implementors of the collaborator traits.
pub use async_trait::async_trait;
