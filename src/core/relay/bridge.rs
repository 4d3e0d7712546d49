//! Session bridge
//!
//! Owns one phone call from the accepted media-stream websocket until both
//! connections are closed.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures::{Stream, StreamExt, future};
use tracing::{debug, info};

use super::error::{Leg, RelayError, RelayResult};
use super::inbound::run_inbound;
use super::link::{LINK_BUFFER_SIZE, Link, WriterGuard, spawn_writer};
use super::outbound::OutboundPump;
use super::state::CallState;
use crate::config::{RealtimeConfig, RelaySettings};
use crate::core::dispatch::CallControl;
use crate::core::realtime::{self, ClientEvent, SessionConfig, client};
use crate::core::telephony::TelephonyCommand;

/// How long writers may keep flushing after the call ended
pub const WRITER_FLUSH_GRACE: Duration = Duration::from_secs(1);

/// Everything a call needs besides its websocket
#[derive(Clone)]
pub struct BridgeContext {
    pub realtime: RealtimeConfig,
    pub relay: RelaySettings,
    pub control: Arc<dyn CallControl>,
}

/// Relay one call between the telephony socket and a fresh realtime session
///
/// Returns once either side is done; both connections are closed by then.
/// A failed realtime connect closes the telephony socket and is returned
/// without retrying.
pub async fn run_bridge(
    socket: WebSocket,
    ctx: BridgeContext,
    caller_hint: Option<String>,
) -> RelayResult<()> {
    let (telephony_sink, telephony_stream) = socket.split();
    let mut writers = WriterGuard::new();

    let (telephony, telephony_rx) =
        Link::<TelephonyCommand>::channel(Leg::Telephony, LINK_BUFFER_SIZE);
    writers.push(spawn_writer(
        Leg::Telephony,
        telephony_sink,
        telephony_rx,
        |text| Message::Text(text.into()),
        Message::Close(None),
    ));

    let session = match realtime::connect(&ctx.realtime).await {
        Ok(session) => session,
        Err(e) => {
            telephony.close().await;
            writers.shutdown(WRITER_FLUSH_GRACE).await;
            return Err(e);
        }
    };
    let (realtime_sink, realtime_stream) = session.split();

    let (realtime, realtime_rx) = Link::<ClientEvent>::channel(Leg::Realtime, LINK_BUFFER_SIZE);
    writers.push(spawn_writer(
        Leg::Realtime,
        realtime_sink,
        realtime_rx,
        client::into_frame,
        client::close_frame(),
    ));

    realtime
        .send(ClientEvent::SessionUpdate {
            session: SessionConfig::from(&ctx.realtime),
        })
        .await?;
    if ctx.realtime.greet_on_connect {
        realtime.send(ClientEvent::ResponseCreate).await?;
    }

    let state = CallState::shared();
    let inbound = run_inbound(
        Box::pin(telephony_frames(telephony_stream)),
        state.clone(),
        realtime.clone(),
        caller_hint,
    );
    let outbound = OutboundPump::new(
        state.clone(),
        telephony.clone(),
        realtime.clone(),
        ctx.control,
        ctx.relay,
    )
    .run(Box::pin(client::text_frames(realtime_stream)));

    let result = tokio::select! {
        result = inbound => {
            debug!("Telephony pump finished first");
            result
        }
        result = outbound => {
            debug!("Realtime pump finished first");
            result
        }
    };

    telephony.close().await;
    realtime.close().await;
    writers.shutdown(WRITER_FLUSH_GRACE).await;

    let (call_sid, duration) = state
        .lock()
        .session()
        .map(|s| (s.call_sid.clone(), s.age()))
        .unzip();
    info!(call_sid = ?call_sid, ?duration, ok = result.is_ok(), "Call relay finished");
    result
}

/// Text frames of the telephony socket; a close frame ends the stream
pub fn telephony_frames<S>(stream: S) -> impl Stream<Item = RelayResult<String>>
where
    S: Stream<Item = Result<Message, axum::Error>>,
{
    stream
        .take_while(|message| future::ready(!matches!(message, Ok(Message::Close(_)))))
        .filter_map(|message| {
            future::ready(match message {
                Ok(Message::Text(text)) => Some(Ok(text.as_str().to_owned())),
                Ok(_) => None,
                Err(e) => Some(Err(RelayError::transport(Leg::Telephony, e))),
            })
        })
}
