//! Remote collaborators.
//!
//! The engine never talks to the network itself; it drives these traits.

use crate::error::{CacheError, HttpError};
use crate::id::{Scope, Snowflake};
use async_trait::async_trait;
use serde_json::Value;

/// The HTTP surface the engine needs.
#[async_trait]
pub trait HttpApi: Send + Sync + 'static {
    /// Lists the application commands registered remotely in `scope`.
    async fn get_application_commands(
        &self,
        application_id: Snowflake,
        scope: Scope,
    ) -> Result<Vec<Value>, HttpError>;

    /// Replaces every application command in `scope` with `commands` and
    /// returns the remote's view of them, ids included.
    async fn overwrite_application_commands(
        &self,
        application_id: Snowflake,
        commands: Vec<Value>,
        scope: Scope,
    ) -> Result<Vec<Value>, HttpError>;

    /// Acknowledges an interaction without content.
    async fn defer_interaction(
        &self,
        interaction_id: Snowflake,
        token: &str,
        ephemeral: bool,
    ) -> Result<(), HttpError>;

    /// Replies to an interaction with a message.
    async fn respond_interaction(
        &self,
        interaction_id: Snowflake,
        token: &str,
        content: &str,
        ephemeral: bool,
    ) -> Result<(), HttpError>;

    /// Posts a message in a channel.
    async fn create_message(&self, channel_id: Snowflake, content: &str) -> Result<(), HttpError>;

    /// The secret token, redacted from anything the engine echoes back to users.
    fn token(&self) -> Option<String> {
        None
    }
}

/// Read access to cached entities.
#[async_trait]
pub trait EntityCache: Send + Sync + 'static {
    /// Returns the channel, fetching it remotely if it is not cached.
    async fn fetch_channel(&self, channel_id: Snowflake) -> Result<Value, CacheError>;
}
