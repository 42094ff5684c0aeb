//! Listener isolation, ordering, default suppression and waiters.

use herald::{Event, EventKind, Listener, WaitError};
use serde_json::json;
use std::sync::{Arc, Mutex};
use std::time::Duration;

mod common;
use common::{FailingListener, OrderRecorder, config, harness};

#[tokio::test]
async fn test_failing_listener_is_isolated() {
    let fx = harness(config(), &["error"]);
    let order = Arc::new(Mutex::new(Vec::new()));
    fx.client.add_listener(Listener::new(
        "ping",
        OrderRecorder {
            id: 1,
            order: order.clone(),
        },
    ));
    fx.client.add_listener(Listener::new("ping", FailingListener));
    fx.client.add_listener(Listener::new(
        "ping",
        OrderRecorder {
            id: 3,
            order: order.clone(),
        },
    ));

    fx.client.dispatch(Event::custom("ping", json!({})));
    fx.settle().await;

    assert_eq!(*order.lock().unwrap(), [1, 3]);
    let errors = fx.recorder.events();
    assert_eq!(errors.len(), 1);
    match errors[0].kind() {
        EventKind::Error { error, .. } => assert_eq!(error.to_string(), "intentional failure"),
        other => panic!("unexpected event: {other:?}"),
    }
}

#[tokio::test]
async fn test_listener_order_is_stable() {
    let fx = harness(config(), &[]);
    let order = Arc::new(Mutex::new(Vec::new()));
    for id in 0..5 {
        fx.client.add_listener(Listener::new(
            "on_tick",
            OrderRecorder {
                id,
                order: order.clone(),
            },
        ));
    }

    for _ in 0..3 {
        fx.client.dispatch(Event::custom("tick", json!({})));
        fx.settle().await;
    }
    let expected: Vec<usize> = (0..3).flat_map(|_| 0..5).collect();
    assert_eq!(*order.lock().unwrap(), expected);
}

#[tokio::test]
async fn test_default_listener_suppression() {
    let fx = harness(config(), &[]);
    let defaults = fx.client.dispatcher().listeners("error");
    assert!(defaults.iter().any(|listener| listener.is_default()));

    let custom = fx
        .client
        .add_listener(fx.recorder.listener("error").disable_defaults());

    let listeners = fx.client.dispatcher().listeners("error");
    assert_eq!(listeners.len(), 1);
    assert!(Arc::ptr_eq(&listeners[0], &custom));
}

#[tokio::test]
async fn test_removed_listener_stops_firing() {
    let fx = harness(config(), &[]);
    let handle = fx.client.add_listener(fx.recorder.listener("ping"));
    assert!(fx.client.remove_listener(&handle));
    assert!(!fx.client.remove_listener(&handle));

    fx.client.dispatch(Event::custom("ping", json!({})));
    fx.settle().await;
    assert_eq!(fx.recorder.count(), 0);
}

#[tokio::test]
async fn test_waiter_single_fire() {
    let fx = harness(config(), &[]);
    let is = |n: u64| move |event: &Event| event.data().is_some_and(|data| data["n"] == n);
    let first = fx.client.wait_for("greet", is(1), None);
    let second = fx.client.wait_for("greet", is(2), None);

    fx.client.dispatch(Event::custom("greet", json!({"n": 1})));
    fx.client.dispatch(Event::custom("greet", json!({"n": 1})));
    assert_eq!(fx.client.dispatcher().pending_waiters("greet"), 1);
    let event = first.await.unwrap();
    assert_eq!(event.data().unwrap()["n"], 1);

    fx.client.dispatch(Event::custom("greet", json!({"n": 2})));
    assert_eq!(fx.client.dispatcher().pending_waiters("greet"), 0);
    assert_eq!(second.await.unwrap().data().unwrap()["n"], 2);
}

#[tokio::test(start_paused = true)]
async fn test_waiter_timeout_removes_waiter() {
    let fx = harness(config(), &[]);
    let limit = Duration::from_secs(5);
    let result = fx.client.wait_for("never", |_: &Event| true, Some(limit)).await;

    assert!(matches!(result, Err(WaitError::Timeout(elapsed)) if elapsed == limit));
    assert_eq!(fx.client.dispatcher().pending_waiters("never"), 0);
}

#[tokio::test]
async fn test_disconnect_clears_readiness() {
    let fx = harness(config(), &[]);
    fx.client.dispatch(Event::new(EventKind::Resume));
    fx.settle().await;
    assert!(fx.client.is_ready());

    fx.client.dispatch(Event::new(EventKind::Disconnect));
    fx.settle().await;
    assert!(!fx.client.is_ready());
}
