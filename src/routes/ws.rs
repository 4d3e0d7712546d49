use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::handlers::{media_stream, voice::MEDIA_STREAM_PATH};
use crate::state::AppState;
use std::sync::Arc;

/// Create the WebSocket router
///
/// The media stream endpoint is unauthenticated; Twilio opens it from the
/// TwiML returned by `/incoming-call`.
pub fn create_ws_router() -> Router<Arc<AppState>> {
    Router::new()
        .route(MEDIA_STREAM_PATH, get(media_stream::media_stream_handler))
        .layer(TraceLayer::new_for_http())
}
