//! # herald-std
//!
//! Standard engine for the Herald event dispatch framework.
//!
//! This crate provides:
//! - **Dispatch**: [`dispatch::Dispatcher`], listener registries and one-shot waiters
//! - **Structured commands**: [`commands::CommandTree`] and remote synchronisation
//! - **Prefixed commands**: [`prefixed::PrefixedRegistry`] and argument splitting
//! - **Callbacks**: component and modal callbacks keyed by custom id
//! - **Routing**: processors turning raw payloads into invocations
//! - **Standard hooks**: Auto-defer, permission enforcement, run hooks, default listeners

#![deny(clippy::wildcard_imports)]

// Re-export core types
pub use herald_core;

// Modules
pub mod callbacks;
pub mod commands;
pub mod dispatch;
pub mod extension;
pub mod hooks;
pub mod prefixed;
pub mod routing;
pub mod testing;
