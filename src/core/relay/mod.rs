//! Per-call relay between the telephony media stream and the realtime session

pub mod bridge;
pub mod error;
pub mod inbound;
pub mod link;
pub mod outbound;
pub mod signals;
pub mod state;

pub use bridge::{BridgeContext, run_bridge};
pub use error::{Leg, RelayError, RelayResult};
pub use signals::{BookingPayload, ControlSignal, MarkerGrammar, SignalParseError};
pub use state::{CallSession, CallState, SharedCallState};
