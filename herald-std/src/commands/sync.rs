//! Reconciliation of local structured commands with the remote registry.

use super::payload::{
    cache_sync_response, dedup, error_messages, same_command, scope_payload, strip_remote_fields,
    sync_needed,
};
use super::tree::CommandTree;
use crate::dispatch::{read, write};
use futures::future::join_all;
use herald_core::{HttpApi, HttpError, Scope, Snowflake, SyncError};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Default delay between throttled remote calls.
pub const DEFAULT_THROTTLE: Duration = Duration::from_millis(100);

/// Drives the cache and sync passes against the remote command registry.
pub struct Synchroniser {
    http: Arc<dyn HttpApi>,
    commands: Arc<RwLock<CommandTree>>,
    application_id: Snowflake,
    throttle: Duration,
}

impl Synchroniser {
    pub fn new(
        http: Arc<dyn HttpApi>,
        commands: Arc<RwLock<CommandTree>>,
        application_id: Snowflake,
    ) -> Self {
        Self {
            http,
            commands,
            application_id,
            throttle: DEFAULT_THROTTLE,
        }
    }

    pub fn with_throttle(mut self, throttle: Duration) -> Self {
        self.throttle = throttle;
        self
    }

    /// Fetches the remote commands of every scope in `scopes` and binds their
    /// ids to matching local commands, without changing anything remotely.
    ///
    /// Scopes the application cannot access are skipped. With `warn_missing`,
    /// local commands the remote lacks and remote commands with no local
    /// counterpart are logged.
    pub async fn cache_interactions(
        &self,
        scopes: &[Scope],
        warn_missing: bool,
    ) -> Result<(), SyncError> {
        let gate = tokio::sync::Mutex::new(());
        let fetches = scopes.iter().map(|&scope| {
            let gate = &gate;
            async move {
                {
                    let _permit = gate.lock().await;
                    tokio::time::sleep(self.throttle).await;
                }
                let fetched = match self
                    .http
                    .get_application_commands(self.application_id, scope)
                    .await
                {
                    Ok(remote) => Ok(Some(remote)),
                    Err(HttpError::Forbidden(_)) => Ok(None),
                    Err(error) => Err(error),
                };
                (scope, fetched)
            }
        });
        let results = join_all(fetches).await;

        let mut tree = write(&self.commands);
        for (scope, fetched) in results {
            let Some(remote) = fetched? else {
                debug!(%scope, "no access to application commands in scope");
                continue;
            };
            bind_remote_ids(&mut tree, scope, &remote, warn_missing);
        }
        Ok(())
    }

    /// Pushes local commands to the remote for every scope in `scopes`.
    ///
    /// A scope is only overwritten when a command differs from its remote
    /// copy, or when `delete` is set and the remote holds commands that
    /// are not registered locally.
    pub async fn synchronise(&self, scopes: &[Scope], delete: bool) -> Result<(), SyncError> {
        let started = Instant::now();
        let results = join_all(scopes.iter().map(|&scope| self.sync_scope(scope, delete))).await;
        debug!(
            scopes = scopes.len(),
            elapsed = ?started.elapsed(),
            "command sync finished"
        );
        results.into_iter().collect()
    }

    async fn sync_scope(&self, scope: Scope, delete: bool) -> Result<(), SyncError> {
        let remote = match self
            .http
            .get_application_commands(self.application_id, scope)
            .await
        {
            Ok(remote) => remote,
            Err(HttpError::Forbidden(_)) => {
                warn!(%scope, "missing access to application commands in scope");
                return Ok(());
            }
            Err(error) => return Err(SyncError::Http(error)),
        };
        // An up-to-date scope is never overwritten, so ids come from the fetch.
        bind_remote_ids(&mut write(&self.commands), scope, &remote, false);

        let local = scope_payload(read(&self.commands).commands_in(scope));
        let mut needed = false;
        let mut payload = Vec::with_capacity(local.len().max(remote.len()));
        let mut matched = HashSet::new();

        for definition in &local {
            let position = remote.iter().position(|r| same_command(r, definition));
            if let Some(index) = position {
                matched.insert(index);
            }
            let remote_copy = position.map(|index| &remote[index]);

            if sync_needed(definition, remote_copy) {
                needed = true;
                payload.push(definition.clone());
            } else if delete {
                payload.push(definition.clone());
            } else if let Some(remote_copy) = remote_copy {
                payload.push(strip_remote_fields(remote_copy));
            }
        }
        if !delete {
            for (index, remote_copy) in remote.iter().enumerate() {
                if !matched.contains(&index) {
                    payload.push(strip_remote_fields(remote_copy));
                }
            }
        }
        let payload = dedup(payload);

        if !(needed || (delete && payload.len() < remote.len())) {
            debug!(%scope, commands = remote.len(), "scope is already up to date");
            return Ok(());
        }

        info!(%scope, commands = payload.len(), "overwriting application commands");
        match self
            .http
            .overwrite_application_commands(self.application_id, payload.clone(), scope)
            .await
        {
            Ok(response) => {
                cache_sync_response(&mut write(&self.commands), &response, scope);
                Ok(())
            }
            Err(HttpError::Forbidden(_)) => Err(SyncError::MissingAccess(scope)),
            Err(error) => Err(sync_failure(error, &payload, scope)),
        }
    }
}

fn bind_remote_ids(tree: &mut CommandTree, scope: Scope, remote: &[Value], warn_missing: bool) {
    let by_name: HashMap<(&str, u64), &Value> = remote
        .iter()
        .filter_map(|definition| {
            let name = definition.get("name")?.as_str()?;
            let kind = definition.get("type").and_then(Value::as_u64).unwrap_or(1);
            Some(((name, kind), definition))
        })
        .collect();

    let mut found = HashSet::new();
    let mut reported = HashSet::new();
    let local: Vec<_> = tree.commands_in(scope).cloned().collect();
    for command in local {
        let key = (command.base(), command.kind().code());
        let Some(definition) = by_name.get(&key) else {
            if warn_missing && reported.insert(command.base().to_owned()) {
                error!(%scope, command = command.base(), "detected yet to sync command");
            }
            continue;
        };
        found.insert(key.0.to_owned());
        if let Some(id) = definition.get("id").and_then(Snowflake::from_value) {
            tree.record_scope(id, scope);
            command.set_cmd_id(scope, id);
        }
    }

    if warn_missing {
        for (name, _) in by_name.keys().filter(|(name, _)| !found.contains(*name)) {
            error!(%scope, command = name, "detected unimplemented command");
        }
    }
}

/// Decomposes a rejected overwrite into per-command log entries.
///
/// Returns the original error unchanged if its error map does not have the
/// expected index-keyed shape.
fn sync_failure(error: HttpError, payload: &[Value], scope: Scope) -> SyncError {
    let map = match &error {
        HttpError::Status {
            errors: Some(Value::Object(map)),
            ..
        } => map,
        _ => return SyncError::Http(error),
    };

    let mut rejected = Vec::with_capacity(map.len());
    for (index, detail) in map {
        let Some(definition) = index.parse::<usize>().ok().and_then(|i| payload.get(i)) else {
            return SyncError::Http(error.clone());
        };
        let name = definition
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or("<unnamed>");
        let messages = error_messages(detail);
        match messages.as_slice() {
            [] => error!(%scope, command = name, "command rejected without a message"),
            [message] => error!(%scope, command = name, "error in command: {message}"),
            _ => error!(
                %scope,
                command = name,
                "multiple errors found in command:\n{}",
                messages.join("\n")
            ),
        }
        rejected.push(name.to_owned());
    }
    SyncError::InvalidCommands {
        scope,
        commands: rejected,
    }
}
