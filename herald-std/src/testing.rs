//! Testing utilities for Herald.
//!
//! This module provides in-memory stand-ins for the remote collaborators and
//! builders for the raw payloads the processors consume.
//!
//! # Features
//!
//! - [`RecordingListener`]: A listener that records every event it receives
//! - [`MockHttp`]: An in-memory remote command registry and reply sink
//! - [`MockCache`]: An in-memory channel cache
//! - [`interaction_payload`] / [`message_payload`]: Raw payload builders

use async_trait::async_trait;
use herald_core::{
    CacheError, EntityCache, Event, Handler, HttpApi, HttpError, Listener, Outcome, Scope,
    Snowflake,
};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

fn guard<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ============================================================================
// Recording Listener
// ============================================================================

/// A listener that records all events it receives.
///
/// One recorder can be registered for several events; it keeps a single
/// log in arrival order.
///
/// # Example
///
/// ```rust,ignore
/// let recorder = RecordingListener::new();
/// dispatcher.add_listener(recorder.listener("command_error"));
///
/// dispatcher.dispatch(event);
/// dispatcher.wait_idle().await;
/// assert_eq!(recorder.names(), ["command_error"]);
/// ```
#[derive(Clone, Default)]
pub struct RecordingListener {
    events: Arc<Mutex<Vec<Event>>>,
}

impl RecordingListener {
    pub fn new() -> Self {
        Self::default()
    }

    /// A listener for `event` that records into this recorder.
    pub fn listener(&self, event: &str) -> Listener {
        Listener::new(event, self.clone())
    }

    /// Get a clone of the recorded events.
    pub fn events(&self) -> Vec<Event> {
        guard(&self.events).clone()
    }

    /// Names of the recorded events, in arrival order.
    pub fn names(&self) -> Vec<String> {
        guard(&self.events)
            .iter()
            .map(|event| event.name().to_owned())
            .collect()
    }

    pub fn count(&self) -> usize {
        guard(&self.events).len()
    }

    pub fn clear(&self) {
        guard(&self.events).clear();
    }
}

impl Handler<Event> for RecordingListener {
    type Output = Outcome;

    async fn call(&self, event: Event) -> Outcome {
        guard(&self.events).push(event);
        Ok(())
    }
}

// ============================================================================
// Mock HTTP
// ============================================================================

#[derive(Default)]
struct HttpState {
    remote: HashMap<Scope, Vec<Value>>,
    forbidden: HashSet<Scope>,
    rejection: Option<Value>,
    overwrite_calls: usize,
    next_id: u64,
    deferrals: Vec<(Snowflake, bool)>,
    responses: Vec<(Snowflake, String)>,
    messages: Vec<(Snowflake, String)>,
}

/// An in-memory remote.
///
/// Overwrites store the payload with ids assigned (a command keeps its id
/// across overwrites while its name and type stay the same) and return it,
/// like the real registry.
#[derive(Default)]
pub struct MockHttp {
    state: Mutex<HttpState>,
    token: Option<String>,
}

impl MockHttp {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Places commands in the remote registry, assigning ids to those without one.
    pub fn seed(&self, scope: Scope, commands: Vec<Value>) {
        let mut state = guard(&self.state);
        let commands: Vec<Value> = commands
            .into_iter()
            .map(|mut command| {
                if command.get("id").is_none() {
                    state.next_id += 1;
                    command["id"] = Value::String((10_000 + state.next_id).to_string());
                }
                command
            })
            .collect();
        state.remote.insert(scope, commands);
    }

    /// The remote registry of `scope`.
    pub fn remote(&self, scope: Scope) -> Vec<Value> {
        guard(&self.state).remote.get(&scope).cloned().unwrap_or_default()
    }

    /// Makes every request against `scope` fail as forbidden.
    pub fn forbid(&self, scope: Scope) {
        guard(&self.state).forbidden.insert(scope);
    }

    /// Makes the next overwrite fail with a form error carrying `errors`.
    pub fn reject_overwrite(&self, errors: Value) {
        guard(&self.state).rejection = Some(errors);
    }

    pub fn overwrite_calls(&self) -> usize {
        guard(&self.state).overwrite_calls
    }

    /// Deferred interactions and whether each was ephemeral.
    pub fn deferrals(&self) -> Vec<(Snowflake, bool)> {
        guard(&self.state).deferrals.clone()
    }

    /// Interaction replies.
    pub fn responses(&self) -> Vec<(Snowflake, String)> {
        guard(&self.state).responses.clone()
    }

    /// Channel messages.
    pub fn messages(&self) -> Vec<(Snowflake, String)> {
        guard(&self.state).messages.clone()
    }

    fn check_access(state: &HttpState, scope: Scope) -> Result<(), HttpError> {
        if state.forbidden.contains(&scope) {
            return Err(HttpError::Forbidden("Missing Access".into()));
        }
        Ok(())
    }
}

fn same_identity(a: &Value, b: &Value) -> bool {
    let kind = |v: &Value| v.get("type").and_then(Value::as_u64).unwrap_or(1);
    a.get("name") == b.get("name") && kind(a) == kind(b)
}

#[async_trait]
impl HttpApi for MockHttp {
    async fn get_application_commands(
        &self,
        _application_id: Snowflake,
        scope: Scope,
    ) -> Result<Vec<Value>, HttpError> {
        let state = guard(&self.state);
        Self::check_access(&state, scope)?;
        Ok(state.remote.get(&scope).cloned().unwrap_or_default())
    }

    async fn overwrite_application_commands(
        &self,
        application_id: Snowflake,
        commands: Vec<Value>,
        scope: Scope,
    ) -> Result<Vec<Value>, HttpError> {
        let mut state = guard(&self.state);
        Self::check_access(&state, scope)?;
        state.overwrite_calls += 1;
        if let Some(errors) = state.rejection.take() {
            return Err(HttpError::Status {
                status: 400,
                message: "Invalid Form Body".into(),
                errors: Some(errors),
            });
        }

        let previous = state.remote.remove(&scope).unwrap_or_default();
        let mut stored = Vec::with_capacity(commands.len());
        for mut command in commands {
            let id = previous
                .iter()
                .find(|old| same_identity(old, &command))
                .and_then(|old| old.get("id").cloned());
            let id = match id {
                Some(id) => id,
                None => {
                    state.next_id += 1;
                    Value::String((10_000 + state.next_id).to_string())
                }
            };
            command["id"] = id;
            command["application_id"] = Value::String(application_id.to_string());
            stored.push(command);
        }
        state.remote.insert(scope, stored.clone());
        Ok(stored)
    }

    async fn defer_interaction(
        &self,
        interaction_id: Snowflake,
        _token: &str,
        ephemeral: bool,
    ) -> Result<(), HttpError> {
        guard(&self.state).deferrals.push((interaction_id, ephemeral));
        Ok(())
    }

    async fn respond_interaction(
        &self,
        interaction_id: Snowflake,
        _token: &str,
        content: &str,
        _ephemeral: bool,
    ) -> Result<(), HttpError> {
        guard(&self.state)
            .responses
            .push((interaction_id, content.to_owned()));
        Ok(())
    }

    async fn create_message(&self, channel_id: Snowflake, content: &str) -> Result<(), HttpError> {
        guard(&self.state)
            .messages
            .push((channel_id, content.to_owned()));
        Ok(())
    }

    fn token(&self) -> Option<String> {
        self.token.clone()
    }
}

// ============================================================================
// Mock Cache
// ============================================================================

/// An in-memory channel cache. Unknown channels are [`CacheError::NotFound`].
#[derive(Default)]
pub struct MockCache {
    channels: Mutex<HashMap<Snowflake, Value>>,
}

impl MockCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Caches a channel object under its `id`.
    pub fn insert_channel(&self, channel: Value) {
        if let Some(id) = channel.get("id").and_then(Snowflake::from_value) {
            guard(&self.channels).insert(id, channel);
        }
    }
}

#[async_trait]
impl EntityCache for MockCache {
    async fn fetch_channel(&self, channel_id: Snowflake) -> Result<Value, CacheError> {
        guard(&self.channels)
            .get(&channel_id)
            .cloned()
            .ok_or(CacheError::NotFound)
    }
}

// ============================================================================
// Payload builders
// ============================================================================

/// Raw `INTERACTION_CREATE` payloads.
///
/// Every interaction is sent by user `42` in channel `100` with id `900`.
pub mod interaction_payload {
    use herald_core::{InteractionKind, SUB_COMMAND, SUB_COMMAND_GROUP};
    use serde_json::{Value, json};

    fn envelope(kind: InteractionKind, data: Value) -> Value {
        json!({
            "id": "900",
            "application_id": "1",
            "token": "interaction-token",
            "type": kind.code(),
            "channel_id": "100",
            "user": {"id": "42", "username": "tester"},
            "data": data,
        })
    }

    /// Nests `leaf_options` under the subcommand chain of a resolved name.
    fn command_data(command_id: &str, name: &str, leaf_options: Vec<Value>) -> Value {
        let words: Vec<&str> = name.split(' ').collect();
        let mut options = leaf_options;
        for (depth, word) in words.iter().enumerate().skip(1).rev() {
            let kind = if depth == words.len() - 1 {
                SUB_COMMAND
            } else {
                SUB_COMMAND_GROUP
            };
            options = vec![json!({"type": kind, "name": word, "options": options})];
        }
        json!({
            "id": command_id,
            "name": words[0],
            "type": 1,
            "options": options,
        })
    }

    /// A chat-input command invocation. `name` may name a subcommand
    /// (`"mod user ban"`).
    pub fn command(command_id: &str, name: &str) -> Value {
        command_with_options(command_id, name, Vec::new())
    }

    /// A command invocation with leaf options, e.g.
    /// `json!({"type": 3, "name": "reason", "value": "spam"})`.
    pub fn command_with_options(command_id: &str, name: &str, options: Vec<Value>) -> Value {
        envelope(
            InteractionKind::ApplicationCommand,
            command_data(command_id, name, options),
        )
    }

    /// An autocomplete request with `option` focused.
    pub fn autocomplete(command_id: &str, name: &str, option: &str, partial: &str) -> Value {
        let focused = json!({"type": 3, "name": option, "value": partial, "focused": true});
        envelope(
            InteractionKind::Autocomplete,
            command_data(command_id, name, vec![focused]),
        )
    }

    /// A component activation on message `message_id`.
    pub fn component(custom_id: &str, component_type: u64, message_id: &str) -> Value {
        let mut payload = envelope(
            InteractionKind::Component,
            json!({"custom_id": custom_id, "component_type": component_type, "values": []}),
        );
        payload["message"] = json!({"id": message_id, "channel_id": "100"});
        payload
    }

    /// A modal submission with one text field per `(custom_id, value)`.
    pub fn modal(custom_id: &str, fields: &[(&str, &str)]) -> Value {
        let rows: Vec<Value> = fields
            .iter()
            .map(|(id, value)| {
                json!({"type": 1, "components": [{"type": 4, "custom_id": id, "value": value}]})
            })
            .collect();
        envelope(
            InteractionKind::ModalSubmit,
            json!({"custom_id": custom_id, "components": rows}),
        )
    }

    /// Moves an interaction into guild `guild_id`, invoked by a member
    /// holding `permissions`.
    pub fn in_guild(mut payload: Value, guild_id: &str, permissions: u64) -> Value {
        let user = payload
            .as_object_mut()
            .and_then(|object| object.remove("user"))
            .unwrap_or(Value::Null);
        payload["guild_id"] = json!(guild_id);
        payload["member"] = json!({"user": user, "permissions": permissions.to_string()});
        payload
    }
}

/// Raw `MESSAGE_CREATE` payloads.
pub mod message_payload {
    use serde_json::{Value, json};

    /// A message by user `42` in channel `100`.
    pub fn message(content: &str) -> Value {
        json!({
            "id": "555",
            "channel_id": "100",
            "content": content,
            "author": {"id": "42", "username": "tester", "bot": false},
        })
    }

    /// The same message, sent in guild `guild_id`.
    pub fn in_guild(content: &str, guild_id: &str) -> Value {
        let mut payload = message(content);
        payload["guild_id"] = json!(guild_id);
        payload
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use herald_core::InteractionContext;

    #[test]
    fn test_command_payload_resolves() {
        let payload = interaction_payload::command("7", "mod user ban");
        let ctx = InteractionContext::from_payload(&payload).unwrap();
        assert_eq!(ctx.invoke_target, "mod user ban");
        assert_eq!(ctx.command_id, Some(Snowflake(7)));
    }

    #[tokio::test]
    async fn test_overwrite_keeps_ids() {
        let http = MockHttp::new();
        let ping = serde_json::json!({"name": "ping", "type": 1, "description": "d"});
        let first = http
            .overwrite_application_commands(Snowflake(1), vec![ping.clone()], Scope::Global)
            .await
            .unwrap();
        let second = http
            .overwrite_application_commands(Snowflake(1), vec![ping], Scope::Global)
            .await
            .unwrap();
        assert_eq!(first[0]["id"], second[0]["id"]);
        assert_eq!(http.overwrite_calls(), 2);
    }
}
