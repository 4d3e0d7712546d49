//! Realtime to telephony pump
//!
//! Forwards synthesized audio with one playback mark per chunk, handles
//! barge-in, and turns finalized assistant turns into control signals.

use std::collections::HashSet;
use std::ops::ControlFlow;
use std::sync::Arc;

use futures::{Stream, StreamExt};
use tracing::{debug, info, warn};

use super::error::{Leg, RelayError, RelayResult};
use super::link::Link;
use super::signals::{ControlSignal, parse_control_signal};
use super::state::{CallSession, SharedCallState};
use crate::config::RelaySettings;
use crate::core::dispatch::CallControl;
use crate::core::realtime::{ClientEvent, ResponseBody, ServerEvent};
use crate::core::telephony::TelephonyCommand;

/// Drives one call's realtime event stream
pub struct OutboundPump {
    state: SharedCallState,
    telephony: Link<TelephonyCommand>,
    realtime: Link<ClientEvent>,
    control: Arc<dyn CallControl>,
    settings: RelaySettings,
    /// Response ids that already produced a dispatch
    dispatched: HashSet<String>,
    backlog_warned: bool,
}

impl OutboundPump {
    pub fn new(
        state: SharedCallState,
        telephony: Link<TelephonyCommand>,
        realtime: Link<ClientEvent>,
        control: Arc<dyn CallControl>,
        settings: RelaySettings,
    ) -> Self {
        Self {
            state,
            telephony,
            realtime,
            control,
            settings,
            dispatched: HashSet::new(),
            backlog_warned: false,
        }
    }

    /// Consume realtime frames until the session ends or the assistant hangs up
    ///
    /// Closes the telephony link before returning `Ok`.
    pub async fn run<S>(mut self, mut frames: S) -> RelayResult<()>
    where
        S: Stream<Item = RelayResult<String>> + Unpin,
    {
        while let Some(frame) = frames.next().await {
            let text = frame?;
            let event =
                ServerEvent::from_json(&text).map_err(|e| RelayError::decode(Leg::Realtime, e))?;

            if self.handle_event(event).await?.is_break() {
                return Ok(());
            }
        }

        debug!("Realtime session ended");
        self.telephony.close().await;
        Ok(())
    }

    async fn handle_event(&mut self, event: ServerEvent) -> RelayResult<ControlFlow<()>> {
        match event {
            ServerEvent::AudioDelta { delta, item_id, .. } => {
                self.forward_audio(delta, item_id.as_deref()).await?;
            }
            ServerEvent::SpeechStarted { audio_start_ms } => {
                self.barge_in(audio_start_ms).await?;
            }
            ServerEvent::ResponseDone { response } => {
                return self.finish_turn(&response).await;
            }
            ServerEvent::Error { error } => {
                warn!(
                    call_sid = ?self.call_sid(),
                    kind = ?error.kind,
                    code = ?error.code,
                    "Realtime session error: {}",
                    error.message
                );
            }
            other => {
                debug!(event = other.name(), "Realtime event");
            }
        }
        Ok(ControlFlow::Continue(()))
    }

    async fn forward_audio(&mut self, delta: String, item_id: Option<&str>) -> RelayResult<()> {
        let placement = self.state.lock().place_audio_delta(item_id);
        let Some(placement) = placement else {
            debug!("Dropping audio delta received before the stream started");
            return Ok(());
        };

        self.telephony
            .send(TelephonyCommand::media(placement.stream_sid.as_str(), delta))
            .await?;
        self.telephony
            .send(TelephonyCommand::mark(
                placement.stream_sid,
                placement.mark_name,
            ))
            .await?;
        self.check_backlog(placement.pending_marks);
        Ok(())
    }

    /// Warn once each time the unacknowledged mark count crosses the threshold
    fn check_backlog(&mut self, pending: usize) {
        let over = pending > self.settings.mark_backlog_warning;
        if over && !self.backlog_warned {
            warn!(
                call_sid = ?self.call_sid(),
                pending,
                threshold = self.settings.mark_backlog_warning,
                "Playback mark backlog is growing"
            );
        }
        self.backlog_warned = over;
    }

    async fn barge_in(&mut self, speech_start_ms: Option<u64>) -> RelayResult<()> {
        let truncation = self.state.lock().barge_in();
        let Some(truncation) = truncation else {
            debug!(?speech_start_ms, "Speech started with no assistant audio playing");
            return Ok(());
        };

        info!(
            item_id = %truncation.item_id,
            audio_end_ms = truncation.audio_end_ms,
            ?speech_start_ms,
            "Caller interrupted the assistant"
        );
        self.realtime
            .send(ClientEvent::truncate(
                truncation.item_id,
                truncation.audio_end_ms,
            ))
            .await?;
        if let Some(stream_sid) = truncation.stream_sid {
            self.telephony.send(TelephonyCommand::clear(stream_sid)).await?;
        }
        Ok(())
    }

    async fn finish_turn(&mut self, response: &ResponseBody) -> RelayResult<ControlFlow<()>> {
        let transcript = response.transcript();
        debug!(response_id = ?response.id, transcript = %transcript, "Assistant turn finished");

        let signal = match parse_control_signal(&transcript, &self.settings.markers) {
            Ok(Some(signal)) => signal,
            Ok(None) => return Ok(ControlFlow::Continue(())),
            Err(e) => {
                warn!(call_sid = ?self.call_sid(), "Ignoring control signal: {}", e);
                return Ok(ControlFlow::Continue(()));
            }
        };

        // turns without an id cannot be told apart and are always dispatched
        if let Some(id) = &response.id {
            if !self.dispatched.insert(id.clone()) {
                debug!(signal = signal.kind(), "Duplicate turn, signal already handled");
                return Ok(ControlFlow::Continue(()));
            }
        }

        let session = self.state.lock().session().cloned();
        let Some(session) = session else {
            warn!(signal = signal.kind(), "Control signal before the stream started, dropping");
            return Ok(ControlFlow::Continue(()));
        };

        info!(call_sid = %session.call_sid, signal = signal.kind(), "Control signal received");
        match signal {
            ControlSignal::Hangup => {
                self.hang_up(&session).await?;
                return Ok(ControlFlow::Break(()));
            }
            ControlSignal::Transfer => self.control.notify_transfer(&session).await,
            ControlSignal::Booking(payload) => {
                self.control.notify_booking(&session, &payload).await
            }
        }
        Ok(ControlFlow::Continue(()))
    }

    /// Let queued audio play out, then close the telephony leg
    async fn hang_up(&mut self, session: &CallSession) -> RelayResult<()> {
        let mark = self.state.lock().push_mark();
        if let Some((stream_sid, name)) = mark {
            self.telephony
                .send(TelephonyCommand::mark(stream_sid, name))
                .await?;
        }

        tokio::time::sleep(self.settings.hangup_drain).await;
        self.telephony.close().await;
        self.control.notify_hangup(session).await;
        Ok(())
    }

    fn call_sid(&self) -> Option<String> {
        self.state.lock().session().map(|s| s.call_sid.clone())
    }
}
