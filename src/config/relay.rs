//! Relay engine configuration

use std::time::Duration;

use crate::core::relay::signals::MarkerGrammar;

/// Grace period after a hangup marker before the telephony leg is closed
pub const DEFAULT_HANGUP_DRAIN_MS: u64 = 2_000;
/// Pending-mark backlog that triggers a warning
pub const DEFAULT_MARK_BACKLOG_WARNING: usize = 256;

/// Per-call relay settings shared by every call
#[derive(Debug, Clone)]
pub struct RelaySettings {
    /// Bounded wait for trailing audio after a hangup signal
    pub hangup_drain: Duration,
    /// Unacknowledged mark count above which the outbound pump logs a warning
    pub mark_backlog_warning: usize,
    /// Control markers recognised in finalized AI turns
    pub markers: MarkerGrammar,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            hangup_drain: Duration::from_millis(DEFAULT_HANGUP_DRAIN_MS),
            mark_backlog_warning: DEFAULT_MARK_BACKLOG_WARNING,
            markers: MarkerGrammar::default(),
        }
    }
}
