use axum::{Router, routing::post};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::handlers::{call_status, voice};
use crate::state::AppState;
use crate::utils::twiml::{CHECK_RECORDING_PATH, MISSED_CALL_PATH};

/// Create the router for Twilio voice webhooks
///
/// These routes are called by Twilio and answer with TwiML or an empty
/// `204`. Request signatures are not verified here.
pub fn create_webhook_router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/incoming-call",
            post(voice::incoming_call).get(voice::incoming_call),
        )
        .route("/forward-call", post(voice::forward_call))
        .route(MISSED_CALL_PATH, post(call_status::missed_call))
        .route(CHECK_RECORDING_PATH, post(call_status::check_recording))
        .layer(TraceLayer::new_for_http())
}
