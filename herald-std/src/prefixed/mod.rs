//! Prefixed (text) commands.

mod args;
mod command;
mod registry;

pub use args::split_args;
pub use command::PrefixedCommand;
pub use registry::PrefixedRegistry;
