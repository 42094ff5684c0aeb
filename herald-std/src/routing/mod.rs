//! # Processors
//!
//! Processors turn raw gateway events into higher-level ones. Each is
//! installed on the [`Dispatcher`](crate::dispatch::Dispatcher) as a set of
//! ordinary listeners, so it runs isolated like any other listener and its
//! failures surface as `error` events.
//!
//! | Processor | Listens on | Produces |
//! |-----------|------------|----------|
//! | [`InteractionRouter`] | `raw_interaction_create` | command, autocomplete, component and modal events |
//! | [`PrefixResolver`] | `raw_message_create`, `raw_ready` | `command_error`, `command_completion` |

mod interaction;
mod prefix;

pub use interaction::InteractionRouter;
pub use prefix::{MENTION_PREFIX, Prefix, PrefixGenerator, PrefixResolver};

use herald_core::Listener;
use std::sync::Arc;

/// A component fed by raw events.
pub trait Processor: Send + Sync + 'static {
    /// The listeners that feed this processor.
    fn listeners(self: Arc<Self>) -> Vec<Listener>;
}
