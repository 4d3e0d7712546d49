//! Media stream websocket endpoint

use axum::{
    extract::{Query, State, ws::WebSocketUpgrade},
    http::{HeaderMap, header},
    response::Response,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use crate::core::relay::run_bridge;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct MediaStreamQuery {
    /// Caller number, used when the stream carries no `caller` parameter
    #[serde(default)]
    pub caller: Option<String>,
}

/// First subprotocol offered by the client, echoed back on accept
fn offered_protocol(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::SEC_WEBSOCKET_PROTOCOL)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(|protocol| protocol.trim().to_string())
        .filter(|protocol| !protocol.is_empty())
}

/// Upgrade to a websocket and relay the call until either side hangs up
pub async fn media_stream_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<MediaStreamQuery>,
) -> Response {
    let protocol = offered_protocol(&headers);
    info!(protocol = ?protocol, "Media stream upgrade requested");

    let ws = match protocol {
        Some(protocol) => ws.protocols([protocol]),
        None => ws,
    };
    let ctx = state.bridge_context();
    let caller = query.caller.filter(|c| !c.trim().is_empty());

    ws.on_upgrade(move |socket| async move {
        if let Err(e) = run_bridge(socket, ctx, caller).await {
            e.log_with_context(None);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_offered_protocol_takes_first() {
        let mut headers = HeaderMap::new();
        assert_eq!(offered_protocol(&headers), None);

        headers.insert(
            header::SEC_WEBSOCKET_PROTOCOL,
            HeaderValue::from_static("audio.twilio.com, other"),
        );
        assert_eq!(offered_protocol(&headers).as_deref(), Some("audio.twilio.com"));
    }
}
