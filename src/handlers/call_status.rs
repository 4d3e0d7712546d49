//! Status callbacks for forwarded call legs
//!
//! Both endpoints always answer `204 No Content`; follow-up actions are
//! dispatched in the background.

use axum::{
    extract::{Form, State},
    http::StatusCode,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::core::relay::CallSession;
use crate::state::AppState;

/// Dial outcomes that count as a missed call
pub const MISSED_STATUSES: [&str; 4] = ["busy", "no-answer", "failed", "canceled"];

#[derive(Debug, Default, Deserialize)]
pub struct DialStatusWebhook {
    #[serde(rename = "CallSid", default)]
    pub call_sid: Option<String>,
    #[serde(rename = "From", default)]
    pub from: Option<String>,
    #[serde(rename = "DialCallStatus", default)]
    pub dial_call_status: Option<String>,
    #[serde(rename = "CallStatus", default)]
    pub call_status: Option<String>,
}

impl DialStatusWebhook {
    /// `DialCallStatus`, falling back to `CallStatus`
    pub fn status(&self) -> Option<&str> {
        self.dial_call_status
            .as_deref()
            .filter(|s| !s.is_empty())
            .or(self.call_status.as_deref().filter(|s| !s.is_empty()))
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct RecordingWebhook {
    #[serde(rename = "CallSid", default)]
    pub call_sid: Option<String>,
    #[serde(rename = "RecordingDuration", default)]
    pub recording_duration: Option<String>,
}

/// Forwarded leg finished; text the caller back if nobody answered
pub async fn missed_call(
    State(state): State<Arc<AppState>>,
    Form(params): Form<DialStatusWebhook>,
) -> StatusCode {
    let status = params.status().unwrap_or_default();
    let call_sid = params.call_sid.clone().unwrap_or_default();

    if !MISSED_STATUSES.contains(&status) {
        debug!(call_sid = %call_sid, status, "Forwarded call answered, no follow-up");
        return StatusCode::NO_CONTENT;
    }

    // No recording callback follows an unanswered leg
    let remembered = state.callers.take(&call_sid);
    let caller = params
        .from
        .clone()
        .filter(|from| !from.is_empty())
        .or(remembered);

    info!(call_sid = %call_sid, caller = ?caller, status, "Forwarded call missed");
    let session = CallSession::new(call_sid, String::new(), caller);
    state.follow_up.notify_missed_call(&session, status).await;
    StatusCode::NO_CONTENT
}

/// Recording of an answered forwarded leg is ready; follow up on short calls
pub async fn check_recording(
    State(state): State<Arc<AppState>>,
    Form(params): Form<RecordingWebhook>,
) -> StatusCode {
    let call_sid = params.call_sid.unwrap_or_default();
    let duration = match params.recording_duration.as_deref().map(str::trim) {
        None | Some("") => 0,
        Some(raw) => match raw.parse::<u64>() {
            Ok(duration) => duration,
            Err(e) => {
                warn!(call_sid = %call_sid, raw, "Invalid RecordingDuration: {}", e);
                return StatusCode::NO_CONTENT;
            }
        },
    };

    let Some(caller) = state.callers.take(&call_sid) else {
        info!(call_sid = %call_sid, duration, "No caller on record, skipping follow-up");
        return StatusCode::NO_CONTENT;
    };

    let threshold = state.config.short_call_threshold_seconds;
    if duration >= threshold {
        debug!(call_sid = %call_sid, duration, threshold, "Forwarded call long enough");
        return StatusCode::NO_CONTENT;
    }

    info!(call_sid = %call_sid, duration, threshold, "Short forwarded call");
    let session = CallSession::new(call_sid, String::new(), Some(caller));
    state.follow_up.notify_short_call(&session, duration).await;
    StatusCode::NO_CONTENT
}
