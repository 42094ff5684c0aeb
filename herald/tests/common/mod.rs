//! Shared fixtures for the client integration tests.

#![allow(dead_code)]

use herald::testing::{MockHttp, RecordingListener};
use herald::{BoxError, Client, ClientConfig, Event, Handler, Outcome, Snowflake};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const APP_ID: Snowflake = Snowflake(1);

// ============================================================================
// Fixtures
// ============================================================================

pub struct Harness {
    pub client: Client,
    pub http: Arc<MockHttp>,
    pub recorder: RecordingListener,
}

impl Harness {
    pub async fn settle(&self) {
        self.client.wait_idle().await;
    }
}

/// A configuration with a known application id, no request throttling and
/// the text prefixes `!` and `?`.
pub fn config() -> ClientConfig {
    ClientConfig::new()
        .with_application_id(APP_ID)
        .with_request_throttle(Duration::ZERO)
        .with_prefixes(["!", "?"])
}

/// A client whose recorder listens on each of `events`.
pub fn harness(config: ClientConfig, events: &[&str]) -> Harness {
    let http = Arc::new(MockHttp::new().with_token("secret.token"));
    let client = Client::new(config, http.clone());
    let recorder = RecordingListener::new();
    for event in events {
        client.add_listener(recorder.listener(event));
    }
    Harness {
        client,
        http,
        recorder,
    }
}

// ============================================================================
// Test Listeners
// ============================================================================

/// Records its id into a shared log.
pub struct OrderRecorder {
    pub id: usize,
    pub order: Arc<Mutex<Vec<usize>>>,
}

impl Handler<Event> for OrderRecorder {
    type Output = Outcome;

    async fn call(&self, _event: Event) -> Outcome {
        self.order.lock().unwrap().push(self.id);
        Ok(())
    }
}

/// Always fails.
pub struct FailingListener;

impl Handler<Event> for FailingListener {
    type Output = Outcome;

    async fn call(&self, _event: Event) -> Outcome {
        Err(BoxError::from("intentional failure"))
    }
}
