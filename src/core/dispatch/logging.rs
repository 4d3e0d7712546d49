use async_trait::async_trait;
use tracing::info;

use super::{CallControl, FollowUpNotifier};
use crate::core::relay::signals::BookingPayload;
use crate::core::relay::state::CallSession;

/// Dispatcher used when no outbound integration is configured
///
/// Every action is logged and nothing else happens.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingDispatcher;

#[async_trait]
impl CallControl for LoggingDispatcher {
    async fn notify_hangup(&self, session: &CallSession) {
        info!(call_sid = %session.call_sid, "Hangup requested (no call-control backend)");
    }

    async fn notify_transfer(&self, session: &CallSession) {
        info!(call_sid = %session.call_sid, "Transfer requested (no call-control backend)");
    }

    async fn notify_booking(&self, session: &CallSession, payload: &BookingPayload) {
        info!(
            call_sid = %session.call_sid,
            fields = payload.len(),
            "Booking collected (no intake backend)"
        );
    }
}

#[async_trait]
impl FollowUpNotifier for LoggingDispatcher {
    async fn notify_missed_call(&self, session: &CallSession, terminal_status: &str) {
        info!(
            call_sid = %session.call_sid,
            caller = ?session.caller_number,
            status = %terminal_status,
            "Missed call (no SMS backend)"
        );
    }

    async fn notify_short_call(&self, session: &CallSession, duration_seconds: u64) {
        info!(
            call_sid = %session.call_sid,
            caller = ?session.caller_number,
            duration_seconds,
            "Short call (no SMS backend)"
        );
    }
}
