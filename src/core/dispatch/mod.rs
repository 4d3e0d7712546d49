//! External call-control actions
//!
//! The relay reports control signals through [`CallControl`]; the webhook
//! layer reports finished call legs through [`FollowUpNotifier`]. Both are
//! fire-and-forget: implementations return as soon as the action is queued
//! and handle their own failures.

pub mod error;
pub mod logging;
pub mod twilio;

use async_trait::async_trait;

use crate::core::relay::signals::BookingPayload;
use crate::core::relay::state::CallSession;

pub use error::{DispatchError, DispatchResult};
pub use logging::LoggingDispatcher;
pub use twilio::TwilioDispatcher;

/// Actions triggered by control signals in the AI's output
#[async_trait]
pub trait CallControl: Send + Sync {
    /// The assistant ended the call
    async fn notify_hangup(&self, session: &CallSession);

    /// The caller should be redirected to a human
    async fn notify_transfer(&self, session: &CallSession);

    /// Structured booking details were collected
    async fn notify_booking(&self, session: &CallSession, payload: &BookingPayload);
}

/// Actions triggered after a forwarded call leg ends
#[async_trait]
pub trait FollowUpNotifier: Send + Sync {
    /// Forwarded leg was not answered (`busy`, `no-answer`, ...)
    async fn notify_missed_call(&self, session: &CallSession, terminal_status: &str);

    /// Forwarded leg was answered but the recording is short
    async fn notify_short_call(&self, session: &CallSession, duration_seconds: u64);
}
