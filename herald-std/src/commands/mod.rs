//! Structured commands: definitions, the per-scope registry and tree, and
//! synchronization with the remote command registry.

mod interaction;
pub mod payload;
mod sync;
mod tree;

pub use interaction::{CommandKind, InteractionCommand};
pub use sync::{DEFAULT_THROTTLE, Synchroniser};
pub use tree::{CommandTree, TreeNode};
