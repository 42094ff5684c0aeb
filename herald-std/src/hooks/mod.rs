//! Standard hooks around command execution, and the default listeners.

pub mod auto_defer;
pub mod defaults;
pub mod logging;
pub mod permissions;
pub mod run;
