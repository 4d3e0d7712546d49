use std::sync::Arc;

use crate::config::ServerConfig;
use crate::core::dispatch::{CallControl, FollowUpNotifier, LoggingDispatcher, TwilioDispatcher};
use crate::core::relay::BridgeContext;

pub mod caller_registry;

pub use caller_registry::CallerRegistry;

/// Application state that can be shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: ServerConfig,
    /// Receives control signals parsed from the assistant's turns
    pub call_control: Arc<dyn CallControl>,
    /// Receives outcomes of forwarded calls
    pub follow_up: Arc<dyn FollowUpNotifier>,
    /// Callers of forwarded calls awaiting their status callbacks
    pub callers: Arc<CallerRegistry>,
}

impl AppState {
    pub async fn new(config: ServerConfig) -> Arc<Self> {
        // Fall back to logging when no outbound integration is usable
        let (call_control, follow_up): (Arc<dyn CallControl>, Arc<dyn FollowUpNotifier>) =
            match TwilioDispatcher::from_config(&config) {
                Ok(Some(dispatcher)) => {
                    let dispatcher = Arc::new(dispatcher);
                    (dispatcher.clone(), dispatcher)
                }
                Ok(None) => {
                    tracing::info!("No Twilio or booking backend configured, logging actions only");
                    (Arc::new(LoggingDispatcher), Arc::new(LoggingDispatcher))
                }
                Err(e) => {
                    tracing::warn!("Failed to initialize Twilio dispatcher: {:?}", e);
                    (Arc::new(LoggingDispatcher), Arc::new(LoggingDispatcher))
                }
            };

        Self::with_dispatchers(config, call_control, follow_up)
    }

    /// Build state around explicit dispatchers
    pub fn with_dispatchers(
        config: ServerConfig,
        call_control: Arc<dyn CallControl>,
        follow_up: Arc<dyn FollowUpNotifier>,
    ) -> Arc<Self> {
        Arc::new(Self {
            config,
            call_control,
            follow_up,
            callers: Arc::new(CallerRegistry::new()),
        })
    }

    /// Per-call inputs for the session bridge
    pub fn bridge_context(&self) -> BridgeContext {
        BridgeContext {
            realtime: self.config.realtime.clone(),
            relay: self.config.relay.clone(),
            control: self.call_control.clone(),
        }
    }
}
