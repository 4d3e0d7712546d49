pub mod dispatch;
pub mod realtime;
pub mod relay;
pub mod telephony;

// Re-export commonly used types for convenience
pub use dispatch::{
    CallControl, DispatchError, FollowUpNotifier, LoggingDispatcher, TwilioDispatcher,
};
pub use relay::{BridgeContext, CallSession, RelayError, RelayResult, run_bridge};
