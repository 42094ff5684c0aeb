//! The `#[listen]` attribute.

#![cfg(feature = "macros")]

use herald::{Event, Outcome};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};

mod common;
use common::{config, harness};

static PINGS: AtomicUsize = AtomicUsize::new(0);

#[herald::listen]
async fn on_custom_ping(event: Event) -> Outcome {
    if event.data().is_some_and(|data| data["loud"] == true) {
        PINGS.fetch_add(1, Ordering::SeqCst);
    }
    Ok(())
}

#[herald::listen(event = "command_error", disable_defaults)]
async fn quiet() {}

#[herald::listen(delay_until_ready)]
async fn _on_member_add() {}

#[test]
fn test_event_names() {
    assert_eq!(on_custom_ping::EVENT, "custom_ping");
    assert_eq!(quiet::EVENT, "command_error");
    assert_eq!(_on_member_add::EVENT, "member_add");
}

#[tokio::test]
async fn test_listener_runs_on_dispatch() {
    let fx = harness(config(), &[]);
    fx.client.add_listener(on_custom_ping::listener());

    fx.client.dispatch(Event::custom("custom_ping", json!({"loud": true})));
    fx.client.dispatch(Event::custom("custom_ping", json!({"loud": false})));
    fx.settle().await;
    assert_eq!(PINGS.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_disable_defaults_argument() {
    let fx = harness(config(), &[]);
    fx.client.add_listener(quiet::listener());

    let listeners = fx.client.dispatcher().listeners("command_error");
    assert_eq!(listeners.len(), 1);
    assert!(!listeners[0].is_default());
}

#[test]
fn test_delay_until_ready_argument() {
    assert!(_on_member_add::listener().requires_ready());
    assert!(!quiet::listener().requires_ready());
}
