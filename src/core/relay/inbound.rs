//! Telephony to realtime pump

use futures::{Stream, StreamExt};
use tracing::{debug, info};

use super::error::{Leg, RelayError, RelayResult};
use super::link::Link;
use super::state::{CallSession, SharedCallState};
use crate::core::realtime::ClientEvent;
use crate::core::telephony::StreamEvent;

/// Custom stream parameter carrying the caller's number
pub const CALLER_PARAMETER: &str = "caller";

/// Forward telephony audio to the realtime session until the stream ends
///
/// `caller_hint` is used when the `start` event carries no caller parameter.
/// Returns `Ok` on a clean disconnect (end of frames or a `stop` event) after
/// closing the realtime link. Decode and transport failures are returned
/// as-is.
pub async fn run_inbound<S>(
    mut frames: S,
    state: SharedCallState,
    realtime: Link<ClientEvent>,
    caller_hint: Option<String>,
) -> RelayResult<()>
where
    S: Stream<Item = RelayResult<String>> + Unpin,
{
    let mut media_frames: u64 = 0;

    while let Some(frame) = frames.next().await {
        let text = frame?;
        let event =
            StreamEvent::from_json(&text).map_err(|e| RelayError::decode(Leg::Telephony, e))?;

        match event {
            StreamEvent::Start { start } => {
                let caller = start
                    .custom_parameters
                    .get(CALLER_PARAMETER)
                    .filter(|value| !value.trim().is_empty())
                    .cloned()
                    .or_else(|| caller_hint.clone());
                info!(
                    call_sid = %start.call_sid,
                    stream_sid = %start.stream_sid,
                    caller = ?caller,
                    "Media stream started"
                );
                let session = CallSession::new(start.call_sid, start.stream_sid, caller);
                state.lock().start_stream(session);
            }
            StreamEvent::Media { media } => {
                state.lock().record_media_timestamp(media.timestamp);
                realtime.send(ClientEvent::append_audio(media.payload)).await?;
                media_frames += 1;
            }
            StreamEvent::Mark { mark } => {
                let acknowledged = state.lock().acknowledge_mark();
                debug!(mark = %mark.name, pending = ?acknowledged, "Playback mark acknowledged");
            }
            StreamEvent::Stop => {
                info!(media_frames, "Media stream stopped");
                break;
            }
            StreamEvent::Connected { protocol } => {
                debug!(protocol = ?protocol, "Media stream connected");
            }
            StreamEvent::Unknown => {
                debug!("Ignoring unknown media stream event");
            }
        }
    }

    debug!(media_frames, "Telephony stream ended");
    realtime.close().await;
    Ok(())
}
