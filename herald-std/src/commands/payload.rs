//! Wire definitions of structured commands and their comparison.

use super::interaction::InteractionCommand;
use super::tree::CommandTree;
use herald_core::{SUB_COMMAND, SUB_COMMAND_GROUP, Scope, Snowflake};
use indexmap::IndexMap;
use serde_json::{Map, Value, json};
use std::sync::Arc;

const NO_DESCRIPTION: &str = "No Description Set";

/// Fields the remote adds to a definition that must not be sent back.
const REMOTE_ONLY_FIELDS: [&str; 3] = ["id", "application_id", "version"];

/// Builds the wire definitions of a scope's commands: one definition per base
/// name and command type, with grouped commands folded into nested
/// subcommand and subcommand-group options.
pub fn scope_payload<'a>(
    commands: impl IntoIterator<Item = &'a Arc<InteractionCommand>>,
) -> Vec<Value> {
    let mut definitions: IndexMap<(String, u64), Map<String, Value>> = IndexMap::new();

    for command in commands {
        let key = (command.base().to_owned(), command.kind().code());
        let definition = definitions
            .entry(key)
            .or_insert_with(|| base_definition(command));

        let Some(group) = command.group() else {
            if !command.kind().is_context_menu() {
                definition.insert("description".into(), json!(command.description()));
                let options = options_mut(definition);
                options.extend(command.options().iter().cloned());
            }
            continue;
        };

        let leaf = json!({
            "type": SUB_COMMAND,
            "name": command.sub().unwrap_or(group),
            "description": description_or_default(command.description()),
            "options": command.options(),
        });
        let options = options_mut(definition);
        match command.sub() {
            None => options.push(leaf),
            Some(_) => {
                let position = options.iter().position(|option| {
                    option["type"] == json!(SUB_COMMAND_GROUP) && option["name"] == json!(group)
                });
                let index = position.unwrap_or_else(|| {
                    options.push(json!({
                        "type": SUB_COMMAND_GROUP,
                        "name": group,
                        "description": command.group_description().unwrap_or(NO_DESCRIPTION),
                        "options": [],
                    }));
                    options.len() - 1
                });
                if let Some(Value::Array(children)) = options[index].get_mut("options") {
                    children.push(leaf);
                }
            }
        }
    }

    definitions.into_values().map(Value::Object).collect()
}

fn base_definition(command: &InteractionCommand) -> Map<String, Value> {
    let mut definition = Map::new();
    definition.insert("name".into(), json!(command.base()));
    definition.insert("type".into(), json!(command.kind().code()));
    if !command.kind().is_context_menu() {
        let description = command.base_description().unwrap_or(NO_DESCRIPTION);
        definition.insert("description".into(), json!(description));
        definition.insert("options".into(), json!([]));
    }
    definition.insert(
        "default_member_permissions".into(),
        command
            .default_member_permissions()
            .map_or(Value::Null, |bits| json!(bits.to_string())),
    );
    definition.insert("dm_permission".into(), json!(command.dm_permission()));
    definition.insert("nsfw".into(), json!(command.nsfw()));
    if !command.name_localizations().is_empty() {
        definition.insert(
            "name_localizations".into(),
            Value::Object(command.name_localizations().clone()),
        );
    }
    definition
}

fn options_mut(definition: &mut Map<String, Value>) -> &mut Vec<Value> {
    let options = definition
        .entry("options")
        .or_insert_with(|| Value::Array(Vec::new()));
    if !options.is_array() {
        *options = Value::Array(Vec::new());
    }
    match options {
        Value::Array(options) => options,
        _ => unreachable!("options was just set to an array"),
    }
}

fn description_or_default(description: &str) -> &str {
    if description.is_empty() { NO_DESCRIPTION } else { description }
}

// ============================================================================
// Comparison
// ============================================================================

/// True if two definitions name the same remote command.
pub fn same_command(a: &Value, b: &Value) -> bool {
    a.get("name") == b.get("name") && type_of(a) == type_of(b)
}

fn type_of(definition: &Value) -> u64 {
    definition.get("type").and_then(Value::as_u64).unwrap_or(1)
}

/// True if the remote copy is missing or differs from the local definition
/// in anything the remote would apply.
pub fn sync_needed(local: &Value, remote: Option<&Value>) -> bool {
    remote.is_none_or(|remote| canonical(local) != canonical(remote))
}

/// Normalizes a definition: defaults filled in, permission bits as strings,
/// options sorted by name.
pub fn canonical(definition: &Value) -> Value {
    json!({
        "name": definition.get("name").cloned().unwrap_or(Value::Null),
        "type": type_of(definition),
        "description": string_or_empty(definition.get("description")),
        "default_member_permissions": permissions(definition.get("default_member_permissions")),
        "dm_permission": bool_or(definition.get("dm_permission"), true),
        "nsfw": bool_or(definition.get("nsfw"), false),
        "name_localizations": object_or_empty(definition.get("name_localizations")),
        "description_localizations": object_or_empty(definition.get("description_localizations")),
        "options": canonical_options(definition.get("options")),
    })
}

fn canonical_options(options: Option<&Value>) -> Value {
    let mut options: Vec<Value> = options
        .and_then(Value::as_array)
        .map(|options| options.iter().map(canonical_option).collect())
        .unwrap_or_default();
    options.sort_by(|a, b| a["name"].as_str().cmp(&b["name"].as_str()));
    Value::Array(options)
}

fn canonical_option(option: &Value) -> Value {
    let field = |key: &str| option.get(key).cloned().unwrap_or(Value::Null);
    json!({
        "name": field("name"),
        "type": field("type"),
        "description": string_or_empty(option.get("description")),
        "required": bool_or(option.get("required"), false),
        "autocomplete": bool_or(option.get("autocomplete"), false),
        "choices": option.get("choices").filter(|c| !c.is_null()).cloned().unwrap_or(json!([])),
        "channel_types": option.get("channel_types").filter(|c| !c.is_null()).cloned().unwrap_or(json!([])),
        "min_value": field("min_value"),
        "max_value": field("max_value"),
        "min_length": field("min_length"),
        "max_length": field("max_length"),
        "name_localizations": object_or_empty(option.get("name_localizations")),
        "description_localizations": object_or_empty(option.get("description_localizations")),
        "options": canonical_options(option.get("options")),
    })
}

fn string_or_empty(value: Option<&Value>) -> Value {
    value
        .filter(|v| v.is_string())
        .cloned()
        .unwrap_or_else(|| json!(""))
}

fn bool_or(value: Option<&Value>, default: bool) -> bool {
    value.and_then(Value::as_bool).unwrap_or(default)
}

fn object_or_empty(value: Option<&Value>) -> Value {
    value
        .filter(|v| v.is_object())
        .cloned()
        .unwrap_or_else(|| json!({}))
}

fn permissions(value: Option<&Value>) -> Value {
    match value {
        Some(Value::String(bits)) => json!(bits),
        Some(Value::Number(bits)) => json!(bits.to_string()),
        _ => Value::Null,
    }
}

/// A remote definition with the remote-assigned fields removed.
pub fn strip_remote_fields(remote: &Value) -> Value {
    let mut stripped = remote.clone();
    if let Value::Object(fields) = &mut stripped {
        for key in REMOTE_ONLY_FIELDS {
            fields.remove(key);
        }
    }
    stripped
}

/// Removes structurally equal duplicates, keeping first occurrences.
pub fn dedup(payload: Vec<Value>) -> Vec<Value> {
    let mut unique: Vec<Value> = Vec::with_capacity(payload.len());
    for definition in payload {
        if !unique.contains(&definition) {
            unique.push(definition);
        }
    }
    unique
}

/// Binds the ids of an overwrite response to the local commands they
/// describe, walking subcommand and subcommand-group options so every
/// grouped command learns its base's id.
pub fn cache_sync_response(tree: &mut CommandTree, response: &[Value], scope: Scope) {
    for definition in response {
        let Some(id) = definition.get("id").and_then(Snowflake::from_value) else {
            continue;
        };
        let Some(name) = definition.get("name").and_then(Value::as_str) else {
            continue;
        };
        tree.record_scope(id, scope);

        if let Some(command) = tree.get(scope, name) {
            command.set_cmd_id(scope, id);
            continue;
        }
        for option in definition
            .get("options")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
        {
            let option_name = option.get("name").and_then(Value::as_str).unwrap_or_default();
            match option.get("type").and_then(Value::as_u64) {
                Some(SUB_COMMAND) => {
                    if let Some(command) = tree.get(scope, &format!("{name} {option_name}")) {
                        command.set_cmd_id(scope, id);
                    }
                }
                Some(SUB_COMMAND_GROUP) => {
                    for sub in option
                        .get("options")
                        .and_then(Value::as_array)
                        .into_iter()
                        .flatten()
                    {
                        let sub_name = sub.get("name").and_then(Value::as_str).unwrap_or_default();
                        let path = format!("{name} {option_name} {sub_name}");
                        if let Some(command) = tree.get(scope, &path) {
                            command.set_cmd_id(scope, id);
                        }
                    }
                }
                _ => {}
            }
        }
    }
}

/// Collects every error message of a remote error map entry, each prefixed
/// with the path of the offending field.
pub fn error_messages(detail: &Value) -> Vec<String> {
    let mut messages = Vec::new();
    collect_messages(detail, &mut Vec::new(), &mut messages);
    messages
}

fn collect_messages<'a>(detail: &'a Value, path: &mut Vec<&'a str>, out: &mut Vec<String>) {
    let Value::Object(fields) = detail else {
        return;
    };
    for (key, value) in fields {
        if key == "_errors" {
            for error in value.as_array().into_iter().flatten() {
                let message = error
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown error");
                if path.is_empty() {
                    out.push(message.to_owned());
                } else {
                    out.push(format!("{}: {message}", path.join(".")));
                }
            }
        } else {
            path.push(key);
            collect_messages(value, path, out);
            path.pop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use herald_core::{InteractionContext, Outcome};

    fn cmd(name: &str) -> Arc<InteractionCommand> {
        Arc::new(
            InteractionCommand::slash(name, format!("{name} description"))
                .with_callback(|_ctx: Arc<InteractionContext>| async { Outcome::Ok(()) }),
        )
    }

    #[test]
    fn test_grouped_payload_shape() {
        let commands = [cmd("mod user ban"), cmd("mod user kick"), cmd("mod purge"), cmd("ping")];
        let payload = scope_payload(commands.iter());
        assert_eq!(payload.len(), 2);

        let moderation = &payload[0];
        assert_eq!(moderation["name"], "mod");
        let options = moderation["options"].as_array().unwrap();
        assert_eq!(options.len(), 2);
        assert_eq!(options[0]["type"], json!(SUB_COMMAND_GROUP));
        assert_eq!(options[0]["options"].as_array().unwrap().len(), 2);
        assert_eq!(options[1]["name"], "purge");
        assert_eq!(payload[1]["description"], "ping description");
    }

    #[test]
    fn test_canonical_ignores_defaults_and_order() {
        let local = json!({
            "name": "ping", "type": 1, "description": "d",
            "options": [{"type": 3, "name": "b", "description": "x"}, {"type": 3, "name": "a", "description": "y"}],
            "default_member_permissions": null, "dm_permission": true, "nsfw": false,
        });
        let remote = json!({
            "id": "9", "application_id": "1", "version": "3",
            "name": "ping", "type": 1, "description": "d",
            "options": [
                {"type": 3, "name": "a", "description": "y", "required": false},
                {"type": 3, "name": "b", "description": "x"}
            ],
            "default_member_permissions": null, "dm_permission": true, "nsfw": false,
            "name_localizations": null
        });
        assert!(!sync_needed(&local, Some(&remote)));
        assert!(sync_needed(&local, None));

        let mut changed = remote.clone();
        changed["description"] = json!("other");
        assert!(sync_needed(&local, Some(&changed)));
    }

    #[test]
    fn test_strip_and_dedup() {
        let remote = json!({"id": "1", "application_id": "2", "version": "3", "name": "x"});
        assert_eq!(strip_remote_fields(&remote), json!({"name": "x"}));
        assert_eq!(dedup(vec![json!(1), json!(2), json!(1)]), vec![json!(1), json!(2)]);
    }

    #[test]
    fn test_cache_sync_response_walks_groups() {
        let mut tree = CommandTree::new();
        let ban = cmd("mod user ban");
        let purge = cmd("mod purge");
        tree.insert(Arc::clone(&ban)).unwrap();
        tree.insert(Arc::clone(&purge)).unwrap();

        let response = [json!({
            "id": "55", "name": "mod", "type": 1,
            "options": [
                {"type": 2, "name": "user", "options": [{"type": 1, "name": "ban"}]},
                {"type": 1, "name": "purge"}
            ]
        })];
        cache_sync_response(&mut tree, &response, Scope::Global);

        assert_eq!(ban.cmd_id(Scope::Global), Some(Snowflake(55)));
        assert_eq!(purge.cmd_id(Scope::Global), Some(Snowflake(55)));
        assert_eq!(tree.scope_of(Snowflake(55)), Some(Scope::Global));
    }

    #[test]
    fn test_error_messages() {
        let detail = json!({
            "name": {"_errors": [{"code": "X", "message": "bad name"}]},
            "options": {"0": {"description": {"_errors": [{"message": "too long"}]}}}
        });
        let mut messages = error_messages(&detail);
        messages.sort();
        assert_eq!(messages, vec!["name: bad name", "options.0.description: too long"]);
    }
}
