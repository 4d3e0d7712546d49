//! Twilio voice webhooks returning TwiML

use axum::{
    extract::{Form, State},
    http::{HeaderMap, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info};

use crate::errors::app_error::{AppError, AppResult};
use crate::state::AppState;
use crate::utils::twiml::{self, ForwardDial};

/// Path of the media stream websocket
pub const MEDIA_STREAM_PATH: &str = "/media-stream";

/// Fields Twilio sends with every voice webhook that this server reads
#[derive(Debug, Default, Deserialize)]
pub struct VoiceWebhook {
    #[serde(rename = "CallSid", default)]
    pub call_sid: Option<String>,
    #[serde(rename = "From", default)]
    pub from: Option<String>,
}

pub(crate) fn twiml_response(xml: String) -> Response {
    ([(header::CONTENT_TYPE, "application/xml")], xml).into_response()
}

/// Host the media stream URL should point at
///
/// The configured public host wins over the request's `Host` header.
fn stream_host(state: &AppState, headers: &HeaderMap) -> AppResult<String> {
    if let Some(host) = state.config.public_host.as_deref() {
        return Ok(host.trim_end_matches('/').to_string());
    }
    headers
        .get(header::HOST)
        .and_then(|value| value.to_str().ok())
        .filter(|host| !host.is_empty())
        .map(str::to_string)
        .ok_or_else(|| AppError::BadRequest("no PUBLIC_HOST and no Host header".to_string()))
}

/// Answer an incoming call by connecting it to the media stream
///
/// Twilio may call this with GET (query string) or POST (form body).
pub async fn incoming_call(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Form(params): Form<VoiceWebhook>,
) -> AppResult<Response> {
    let host = stream_host(&state, &headers)?;
    let stream_url = format!("wss://{host}{MEDIA_STREAM_PATH}");

    info!(
        call_sid = ?params.call_sid,
        caller = ?params.from,
        stream_url = %stream_url,
        "Incoming call"
    );

    let xml = twiml::connect_stream(
        &stream_url,
        params.from.as_deref(),
        state.config.twilio.greeting.as_deref(),
    );
    Ok(twiml_response(xml))
}

/// Hand the call to the configured human number
pub async fn forward_call(
    State(state): State<Arc<AppState>>,
    Form(params): Form<VoiceWebhook>,
) -> AppResult<Response> {
    let twilio = &state.config.twilio;
    let number = twilio
        .forward_to_number
        .as_deref()
        .ok_or_else(|| AppError::NotConfigured("FORWARD_TO_NUMBER".to_string()))?;

    if let (Some(call_sid), Some(from)) = (&params.call_sid, &params.from) {
        state.callers.remember(call_sid, from);
    }
    debug!(call_sid = ?params.call_sid, caller = ?params.from, "Forwarding call");

    let xml = twiml::forward_call(&ForwardDial {
        number,
        caller_id: twilio.phone_number.as_deref(),
        timeout_seconds: twilio.dial_timeout_seconds,
    });
    Ok(twiml_response(xml))
}
