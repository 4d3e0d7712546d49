#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use callrelay::config::{RealtimeConfig, RelaySettings, TwilioConfig};
use callrelay::core::dispatch::{CallControl, FollowUpNotifier};
use callrelay::core::relay::{BookingPayload, CallSession};
use callrelay::{ServerConfig, state::AppState};

/// Configuration with every integration disabled
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        public_host: Some("relay.example.com".to_string()),
        realtime: RealtimeConfig::new("sk-test"),
        relay: RelaySettings::default(),
        twilio: TwilioConfig::default(),
        booking_form_url: None,
        short_call_threshold_seconds: 40,
    }
}

/// Records every dispatched action as a short string
#[derive(Default)]
pub struct RecordingDispatcher {
    events: Mutex<Vec<String>>,
}

impl RecordingDispatcher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().clone()
    }

    /// Poll until at least `count` events were recorded or `timeout` passed
    pub async fn wait_for(&self, count: usize, timeout: Duration) -> Vec<String> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let events = self.events();
            if events.len() >= count || tokio::time::Instant::now() >= deadline {
                return events;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    fn record(&self, event: String) {
        self.events.lock().push(event);
    }
}

#[async_trait]
impl CallControl for RecordingDispatcher {
    async fn notify_hangup(&self, session: &CallSession) {
        self.record(format!("hangup:{}", session.call_sid));
    }

    async fn notify_transfer(&self, session: &CallSession) {
        self.record(format!("transfer:{}", session.call_sid));
    }

    async fn notify_booking(&self, session: &CallSession, payload: &BookingPayload) {
        self.record(format!("booking:{}:{}", session.call_sid, payload.len()));
    }
}

#[async_trait]
impl FollowUpNotifier for RecordingDispatcher {
    async fn notify_missed_call(&self, session: &CallSession, terminal_status: &str) {
        self.record(format!(
            "missed:{}:{}:{}",
            session.call_sid,
            session.caller_number.as_deref().unwrap_or("-"),
            terminal_status
        ));
    }

    async fn notify_short_call(&self, session: &CallSession, duration_seconds: u64) {
        self.record(format!(
            "short:{}:{}:{}",
            session.call_sid,
            session.caller_number.as_deref().unwrap_or("-"),
            duration_seconds
        ));
    }
}

/// App state wired to one recording dispatcher for both roles
pub fn recording_state(config: ServerConfig) -> (Arc<AppState>, Arc<RecordingDispatcher>) {
    let recorder = RecordingDispatcher::new();
    let state = AppState::with_dispatchers(config, recorder.clone(), recorder.clone());
    (state, recorder)
}
