//! Relay error taxonomy

use std::time::Duration;

use thiserror::Error;
use tracing::{debug, error, warn};

/// Which side of the bridge a failure came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Leg {
    Telephony,
    Realtime,
}

impl std::fmt::Display for Leg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Leg::Telephony => f.write_str("telephony"),
            Leg::Realtime => f.write_str("realtime"),
        }
    }
}

/// Failures that end a pump and therefore the whole call
#[derive(Debug, Error)]
pub enum RelayError {
    /// Peer went away; the expected end of most calls
    #[error("{0} connection closed")]
    TransportDisconnect(Leg),

    /// Malformed or incomplete frame
    #[error("failed to decode {leg} frame: {reason}")]
    ProtocolDecode { leg: Leg, reason: String },

    /// Socket-level failure while reading or writing
    #[error("{leg} transport error: {reason}")]
    Transport { leg: Leg, reason: String },

    #[error("failed to connect realtime session: {0}")]
    Connect(String),

    #[error("realtime session connect timed out after {0:?}")]
    ConnectTimeout(Duration),

    /// Writer task for this leg is gone
    #[error("{0} link closed")]
    LinkClosed(Leg),
}

impl RelayError {
    pub fn decode(leg: Leg, err: impl std::fmt::Display) -> Self {
        RelayError::ProtocolDecode {
            leg,
            reason: err.to_string(),
        }
    }

    pub fn transport(leg: Leg, err: impl std::fmt::Display) -> Self {
        RelayError::Transport {
            leg,
            reason: err.to_string(),
        }
    }

    /// True for errors that are a normal way for a call to end
    pub fn is_disconnect(&self) -> bool {
        matches!(
            self,
            RelayError::TransportDisconnect(_) | RelayError::LinkClosed(_)
        )
    }

    /// Log at a severity matching how surprising the error is
    pub fn log_with_context(&self, call_sid: Option<&str>) {
        match self {
            RelayError::TransportDisconnect(_) | RelayError::LinkClosed(_) => {
                debug!(call_sid = ?call_sid, error = %self, "Call ended by disconnect");
            }
            RelayError::ProtocolDecode { .. } | RelayError::Transport { .. } => {
                warn!(call_sid = ?call_sid, error = %self, "Call relay aborted");
            }
            RelayError::Connect(_) | RelayError::ConnectTimeout(_) => {
                error!(call_sid = ?call_sid, error = %self, "Could not open realtime session");
            }
        }
    }
}

pub type RelayResult<T> = Result<T, RelayError>;
