//! Structured command registration, synchronisation and routing through the client.

use herald::hooks::defaults::CHECK_FAILURE_REPLY;
use herald::testing::{RecordingListener, interaction_payload};
use herald::{
    Client, CommandError, EventKind, Extension, InteractionCallback, InteractionCommand,
    InteractionContext, Listener, Outcome, PrefixedCommand, PrefixedContext, RegistrationError,
    Scope, Snowflake, component_type,
};
use serde_json::json;
use std::sync::Arc;

mod common;
use common::{config, harness};

fn ping(description: &str) -> InteractionCommand {
    InteractionCommand::slash("ping", description)
        .with_callback(|_ctx: Arc<InteractionContext>| async { Outcome::Ok(()) })
}

fn remote_id(remote: &[serde_json::Value], name: &str) -> String {
    remote
        .iter()
        .find(|command| command["name"] == name)
        .and_then(|command| command["id"].as_str())
        .unwrap()
        .to_owned()
}

#[tokio::test]
async fn test_duplicate_command_is_rejected() {
    let fx = harness(config(), &[]);
    assert_eq!(fx.client.add_interaction(ping("first")), Ok(true));
    assert_eq!(
        fx.client.add_interaction(ping("second")),
        Err(RegistrationError::DuplicateCommand {
            scope: Scope::Global,
            name: "ping".into()
        })
    );

    fx.client.synchronise_interactions(None, None).await.unwrap();
    let remote = fx.http.remote(Scope::Global);
    assert_eq!(remote.len(), 1);
    assert_eq!(remote[0]["description"], "first");
}

#[tokio::test]
async fn test_command_without_callback_is_not_registered() {
    let fx = harness(config(), &[]);
    let group = InteractionCommand::slash("settings", "Settings");
    assert_eq!(fx.client.add_interaction(group), Ok(false));
}

#[tokio::test]
async fn test_sync_is_idempotent() {
    let fx = harness(config(), &[]);
    for name in ["ping", "mod user ban", "mod purge"] {
        let command = InteractionCommand::slash(name, "desc")
            .with_callback(|_ctx: Arc<InteractionContext>| async { Outcome::Ok(()) });
        fx.client.add_interaction(command).unwrap();
    }

    fx.client.synchronise_interactions(None, None).await.unwrap();
    fx.client.synchronise_interactions(None, None).await.unwrap();
    assert_eq!(fx.http.overwrite_calls(), 1);

    let id: u64 = remote_id(&fx.http.remote(Scope::Global), "mod").parse().unwrap();
    let command = fx.client.get_application_cmd_by_id(Snowflake(id)).unwrap();
    assert_eq!(command.base(), "mod");
}

#[tokio::test]
async fn test_restarted_client_routes_already_synced_commands() {
    let first = harness(config(), &[]);
    first.client.add_interaction(ping("Pong")).unwrap();
    first.client.synchronise_interactions(None, None).await.unwrap();
    let id = remote_id(&first.http.remote(Scope::Global), "ping");

    let client = Client::new(config(), first.http.clone());
    let recorder = RecordingListener::new();
    client.add_listener(recorder.listener("command_completion"));
    client.add_interaction(ping("Pong")).unwrap();
    client.synchronise_interactions(None, None).await.unwrap();
    assert_eq!(first.http.overwrite_calls(), 1);
    assert!(client
        .get_application_cmd_by_id(Snowflake(id.parse().unwrap()))
        .is_some());

    client.dispatch_raw("INTERACTION_CREATE", interaction_payload::command(&id, "ping"));
    client.wait_idle().await;
    assert_eq!(recorder.names(), ["command_completion"]);
}

#[tokio::test]
async fn test_debug_scope_overrides_scopes() {
    let fx = harness(config().with_debug_scope(Snowflake(77)), &[]);
    fx.client.add_interaction(ping("Pong")).unwrap();
    fx.client.synchronise_interactions(None, None).await.unwrap();

    assert_eq!(fx.http.remote(Scope::Guild(Snowflake(77))).len(), 1);
    assert!(fx.http.remote(Scope::Global).is_empty());
}

#[tokio::test]
async fn test_disable_dm_commands() {
    let fx = harness(config().with_disable_dm_commands(true), &[]);
    fx.client.add_interaction(ping("Pong")).unwrap();
    fx.client.synchronise_interactions(None, None).await.unwrap();
    assert_eq!(fx.http.remote(Scope::Global)[0]["dm_permission"], false);
}

#[tokio::test]
async fn test_permission_enforcement() {
    let fx = harness(config(), &["command_error", "command_completion"]);
    let ban = InteractionCommand::slash("ban", "Ban")
        .with_default_member_permissions(1 << 2)
        .with_callback(|_ctx: Arc<InteractionContext>| async { Outcome::Ok(()) });
    fx.client.add_interaction(ban).unwrap();
    fx.client.synchronise_interactions(None, None).await.unwrap();
    let id = remote_id(&fx.http.remote(Scope::Global), "ban");

    let payload = interaction_payload::in_guild(interaction_payload::command(&id, "ban"), "9", 0);
    fx.client.dispatch_raw("INTERACTION_CREATE", payload);
    fx.settle().await;

    assert_eq!(fx.recorder.names(), ["command_error", "command_completion"]);
    let error = fx.recorder.events()[0].error_value().cloned().unwrap();
    assert!(matches!(
        error.downcast_ref::<CommandError>(),
        Some(CommandError::CheckFailure(_))
    ));
    assert_eq!(fx.http.responses()[0].1, CHECK_FAILURE_REPLY);
}

#[tokio::test]
async fn test_enforcement_can_be_disabled() {
    let fx = harness(
        config().with_enforce_interaction_perms(false),
        &["command_error", "command_completion"],
    );
    let ban = InteractionCommand::slash("ban", "Ban")
        .with_default_member_permissions(1 << 2)
        .with_callback(|_ctx: Arc<InteractionContext>| async { Outcome::Ok(()) });
    fx.client.add_interaction(ban).unwrap();
    fx.client.synchronise_interactions(None, None).await.unwrap();
    let id = remote_id(&fx.http.remote(Scope::Global), "ban");

    let payload = interaction_payload::in_guild(interaction_payload::command(&id, "ban"), "9", 0);
    fx.client.dispatch_raw("INTERACTION_CREATE", payload);
    fx.settle().await;
    assert_eq!(fx.recorder.names(), ["command_completion"]);
}

#[tokio::test]
async fn test_unknown_interaction_id_is_dropped() {
    let fx = harness(config(), &["command_error", "command_completion", "error"]);
    fx.client.add_interaction(ping("Pong")).unwrap();
    fx.client.synchronise_interactions(None, None).await.unwrap();

    fx.client
        .dispatch_raw("INTERACTION_CREATE", interaction_payload::command("424242", "ping"));
    fx.settle().await;
    assert_eq!(fx.recorder.count(), 0);
}

#[tokio::test]
async fn test_ready_runs_startup_once() {
    let fx = harness(config(), &["startup", "ready"]);
    fx.client.add_interaction(ping("Pong")).unwrap();
    let ready = json!({"user": {"id": "123"}, "application": {"id": "1"}});

    fx.client.dispatch_raw("READY", ready.clone());
    fx.settle().await;
    assert_eq!(fx.recorder.names(), ["startup", "ready"]);
    assert!(fx.client.is_ready());
    assert_eq!(fx.http.overwrite_calls(), 1);

    fx.client.dispatch_raw("READY", ready);
    fx.settle().await;
    assert_eq!(fx.recorder.names(), ["startup", "ready", "ready"]);
    assert_eq!(fx.http.overwrite_calls(), 1);
}

#[tokio::test]
async fn test_ready_learns_application_id() {
    let mut config = config();
    config.application_id = None;
    let fx = harness(config, &[]);
    assert!(fx.client.application_id().is_none());

    fx.client
        .dispatch_raw("READY", json!({"user": {"id": "123"}, "application": {"id": "42"}}));
    fx.settle().await;
    assert_eq!(fx.client.application_id(), Some(Snowflake(42)));
}

#[tokio::test]
async fn test_sync_failure_becomes_error_event() {
    let mut config = config();
    config.application_id = None;
    let fx = harness(config, &["error"]);

    fx.client.init_interactions().await;
    fx.settle().await;
    match fx.recorder.events()[0].kind() {
        EventKind::Error { source, .. } => assert_eq!(source, "Interaction Syncing"),
        other => panic!("unexpected event: {other:?}"),
    }
}

#[tokio::test]
async fn test_cache_only_startup() {
    let fx = harness(config().with_sync_interactions(false), &[]);
    fx.client.add_interaction(ping("Pong")).unwrap();
    fx.http.seed(
        Scope::Global,
        vec![json!({"id": "900", "name": "ping", "type": 1, "description": "Pong"})],
    );

    fx.client.init_interactions().await;
    assert_eq!(fx.http.overwrite_calls(), 0);
    assert!(fx.client.get_application_cmd_by_id(Snowflake(900)).is_some());
}

#[tokio::test]
async fn test_drop_extension_removes_everything() {
    let fx = harness(config(), &[]);
    let ext = Arc::new(Extension::new("admin"));

    fx.client
        .add_interaction(ping("Pong").with_extension(ext.clone()))
        .unwrap();
    fx.client
        .add_prefixed_command(
            PrefixedCommand::new("kick", |_ctx: Arc<PrefixedContext>| async { Outcome::Ok(()) })
                .with_extension(ext.clone()),
        )
        .unwrap();
    fx.client
        .add_component_callback(
            InteractionCallback::new(["confirm"], |_ctx: Arc<InteractionContext>| async {
                Outcome::Ok(())
            })
            .with_extension(ext),
        )
        .unwrap();
    fx.client
        .add_listener(fx.recorder.listener("ping").with_extension("admin"));

    assert_eq!(fx.client.drop_extension("admin"), 4);
    assert_eq!(fx.client.drop_extension("admin"), 0);
    assert_eq!(fx.client.add_interaction(ping("again")), Ok(true));
}

#[tokio::test]
async fn test_wait_for_component() {
    let fx = harness(config(), &[]);
    let waiter = fx
        .client
        .wait_for_component(vec![Snowflake(55)], Vec::new(), None, None);

    fx.client.dispatch_raw(
        "INTERACTION_CREATE",
        interaction_payload::component("other", component_type::BUTTON, "56"),
    );
    fx.client.dispatch_raw(
        "INTERACTION_CREATE",
        interaction_payload::component("confirm", component_type::BUTTON, "55"),
    );

    let event = waiter.await.unwrap();
    let ctx = event.interaction().unwrap();
    assert_eq!(ctx.custom_id.as_deref(), Some("confirm"));
}

#[tokio::test]
async fn test_wait_for_modal() {
    let fx = harness(config(), &[]);
    let waiter = fx
        .client
        .wait_for_modal("report", Some(Snowflake(42)), None);

    fx.client.dispatch_raw(
        "INTERACTION_CREATE",
        interaction_payload::modal("report", &[("reason", "spam")]),
    );

    let event = waiter.await.unwrap();
    let ctx = event.interaction().unwrap();
    assert_eq!(ctx.responses["reason"], "spam");
}

#[tokio::test]
async fn test_component_callback_runs() {
    let fx = harness(config(), &["component_completion", "button_pressed"]);
    fx.client
        .add_component_callback(InteractionCallback::new(
            ["confirm"],
            |_ctx: Arc<InteractionContext>| async { Outcome::Ok(()) },
        ))
        .unwrap();
    assert!(matches!(
        fx.client.add_component_callback(InteractionCallback::new(
            ["confirm"],
            |_ctx: Arc<InteractionContext>| async { Outcome::Ok(()) },
        )),
        Err(RegistrationError::DuplicateComponent(_))
    ));

    fx.client.dispatch_raw(
        "INTERACTION_CREATE",
        interaction_payload::component("confirm", component_type::BUTTON, "55"),
    );
    fx.settle().await;
    assert_eq!(fx.recorder.names(), ["component_completion", "button_pressed"]);
}

#[tokio::test]
async fn test_listener_for_unknown_interaction_type_sees_error() {
    let fx = harness(config(), &["error"]);
    let mut payload = interaction_payload::command("1", "ping");
    payload["type"] = json!(42);
    fx.client.dispatch_raw("INTERACTION_CREATE", payload);
    fx.settle().await;
    assert_eq!(fx.recorder.count(), 1);
}

#[tokio::test]
async fn test_listener_extension_attribute() {
    let fx = harness(config(), &[]);
    let listener = fx
        .client
        .add_listener(Listener::new("ping", fx.recorder.clone()).with_extension("fun"));
    assert_eq!(listener.extension(), Some("fun"));
}
