//! Per-call interruption and playback state
//!
//! Both pumps share one [`CallState`] behind a `parking_lot::Mutex`. Every
//! method here is a whole-record critical section, so a barge-in always sees
//! the item and offset committed by the most recent audio delta.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Identifiers of the telephony leg, captured from the stream `start` event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSession {
    pub call_sid: String,
    pub stream_sid: String,
    pub caller_number: Option<String>,
    pub created_at: Instant,
}

impl CallSession {
    pub fn new(
        call_sid: impl Into<String>,
        stream_sid: impl Into<String>,
        caller_number: Option<String>,
    ) -> Self {
        Self {
            call_sid: call_sid.into(),
            stream_sid: stream_sid.into(),
            caller_number,
            created_at: Instant::now(),
        }
    }

    /// Time since the stream started
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }
}

/// Playback progress of the assistant's current utterance
///
/// An utterance ends at a barge-in or when audio for a different item
/// arrives. A finished turn does not end it: its audio may still be queued at
/// the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaybackState {
    /// Item id of the utterance currently playing, if any
    pub last_assistant_item_id: Option<String>,
    /// Telephony clock value when the current utterance's first audio arrived
    pub response_start_offset_ms: Option<u64>,
    /// Most recent telephony media timestamp
    pub latest_media_timestamp_ms: u64,
}

impl PlaybackState {
    /// Forget the current utterance
    fn reset_utterance(&mut self) {
        self.last_assistant_item_id = None;
        self.response_start_offset_ms = None;
    }
}

/// FIFO of marks sent to telephony and not yet acknowledged
#[derive(Debug, Clone, Default)]
pub struct MarkQueue {
    pending: VecDeque<String>,
    sequence: u64,
}

impl MarkQueue {
    /// Append a fresh mark and return its name
    pub fn push(&mut self) -> String {
        self.sequence += 1;
        let name = format!("audio-{}", self.sequence);
        self.pending.push_back(name.clone());
        name
    }

    /// Drop the oldest pending mark; empty queue is a no-op
    pub fn pop(&mut self) -> Option<String> {
        self.pending.pop_front()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Truncation point computed on barge-in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Truncation {
    pub item_id: String,
    pub audio_end_ms: u64,
    pub stream_sid: Option<String>,
}

/// Outcome of recording one outbound audio chunk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeltaPlacement {
    pub stream_sid: String,
    pub mark_name: String,
    pub pending_marks: usize,
}

/// Mutable per-call record shared by the inbound and outbound pumps
#[derive(Debug, Default)]
pub struct CallState {
    session: Option<CallSession>,
    playback: PlaybackState,
    marks: MarkQueue,
}

/// Handle to the shared per-call record
pub type SharedCallState = Arc<Mutex<CallState>>;

impl CallState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedCallState {
        Arc::new(Mutex::new(Self::new()))
    }

    pub fn session(&self) -> Option<&CallSession> {
        self.session.as_ref()
    }

    pub fn stream_sid(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.stream_sid.as_str())
    }

    pub fn playback(&self) -> &PlaybackState {
        &self.playback
    }

    pub fn pending_marks(&self) -> usize {
        self.marks.len()
    }

    /// Stream (re)started: adopt the new identifiers and restart the clock
    pub fn start_stream(&mut self, session: CallSession) {
        self.session = Some(session);
        self.playback.latest_media_timestamp_ms = 0;
        self.playback.reset_utterance();
    }

    pub fn record_media_timestamp(&mut self, timestamp_ms: u64) {
        self.playback.latest_media_timestamp_ms = timestamp_ms;
    }

    /// Telephony acknowledged playback of one chunk
    pub fn acknowledge_mark(&mut self) -> Option<String> {
        self.marks.pop()
    }

    /// Register one AI audio chunk about to be forwarded to telephony
    ///
    /// Returns `None` while no stream is active; nothing is recorded then.
    pub fn place_audio_delta(&mut self, item_id: Option<&str>) -> Option<DeltaPlacement> {
        let stream_sid = self.session.as_ref()?.stream_sid.clone();

        if let Some(item_id) = item_id {
            if self.playback.last_assistant_item_id.as_deref() != Some(item_id) {
                self.playback.reset_utterance();
                self.playback.last_assistant_item_id = Some(item_id.to_string());
            }
        }
        if self.playback.response_start_offset_ms.is_none() {
            self.playback.response_start_offset_ms =
                Some(self.playback.latest_media_timestamp_ms);
        }

        let mark_name = self.marks.push();
        Some(DeltaPlacement {
            stream_sid,
            mark_name,
            pending_marks: self.marks.len(),
        })
    }

    /// Push a mark that is not tied to an audio chunk
    pub fn push_mark(&mut self) -> Option<(String, String)> {
        let stream_sid = self.session.as_ref()?.stream_sid.clone();
        Some((stream_sid, self.marks.push()))
    }

    /// Caller started speaking over the assistant
    ///
    /// Computes how much of the current utterance was heard, clamped at zero,
    /// and ends the utterance. Returns `None` when nothing is playing.
    pub fn barge_in(&mut self) -> Option<Truncation> {
        let item_id = self.playback.last_assistant_item_id.take()?;
        let latest = self.playback.latest_media_timestamp_ms;
        let start = self.playback.response_start_offset_ms.unwrap_or(latest);
        self.playback.reset_utterance();

        Some(Truncation {
            item_id,
            audio_end_ms: latest.saturating_sub(start),
            stream_sid: self.stream_sid().map(str::to_string),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn started() -> CallState {
        let mut state = CallState::new();
        state.start_stream(CallSession::new("CA1", "MZ1", None));
        state
    }

    #[test]
    fn test_session_age_counts_from_start() {
        let session = CallSession::new("CA1", "MZ1", None);
        std::thread::sleep(Duration::from_millis(5));
        assert!(session.age() >= Duration::from_millis(5));
    }

    #[test]
    fn test_mark_queue_fifo() {
        let mut queue = MarkQueue::default();
        let first = queue.push();
        let second = queue.push();

        assert_ne!(first, second);
        assert_eq!(queue.pop(), Some(first));
        assert_eq!(queue.pop(), Some(second));
        assert_eq!(queue.pop(), None);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_queue_length_is_deltas_minus_acks() {
        let mut state = started();
        for _ in 0..5 {
            state.place_audio_delta(Some("item_1")).unwrap();
        }
        for _ in 0..3 {
            state.acknowledge_mark();
        }
        assert_eq!(state.pending_marks(), 2);

        // extra acknowledgements never underflow
        for _ in 0..4 {
            state.acknowledge_mark();
        }
        assert_eq!(state.pending_marks(), 0);
    }

    #[test]
    fn test_first_delta_commits_offset() {
        let mut state = started();
        state.record_media_timestamp(1000);
        state.place_audio_delta(Some("item_1")).unwrap();

        state.record_media_timestamp(1200);
        state.place_audio_delta(Some("item_1")).unwrap();

        assert_eq!(state.playback().response_start_offset_ms, Some(1000));
        assert_eq!(
            state.playback().last_assistant_item_id.as_deref(),
            Some("item_1")
        );
    }

    #[test]
    fn test_barge_in_arithmetic() {
        let mut state = started();
        state.record_media_timestamp(1000);
        state.place_audio_delta(Some("item_1")).unwrap();
        state.record_media_timestamp(1450);

        let truncation = state.barge_in().unwrap();
        assert_eq!(truncation.item_id, "item_1");
        assert_eq!(truncation.audio_end_ms, 450);
        assert_eq!(truncation.stream_sid.as_deref(), Some("MZ1"));

        // utterance boundary: a second speech start has nothing to cut
        assert!(state.barge_in().is_none());
        assert_eq!(state.playback().response_start_offset_ms, None);
    }

    #[test]
    fn test_barge_in_before_any_delta() {
        let mut state = started();
        state.record_media_timestamp(800);
        assert!(state.barge_in().is_none());
    }

    #[test]
    fn test_barge_in_clamps_negative_elapsed() {
        let mut state = started();
        state.record_media_timestamp(5000);
        state.place_audio_delta(Some("item_1")).unwrap();
        // stream restarted mid-utterance would move the clock backwards
        state.record_media_timestamp(20);

        assert_eq!(state.barge_in().unwrap().audio_end_ms, 0);
    }

    #[test]
    fn test_stream_restart_resets_clock() {
        let mut state = started();
        state.record_media_timestamp(3000);
        state.place_audio_delta(Some("item_1")).unwrap();

        state.start_stream(CallSession::new("CA1", "MZ2", None));
        assert_eq!(state.playback(), &PlaybackState::default());
        assert_eq!(state.stream_sid(), Some("MZ2"));
        // pending marks survive a restart; telephony still acknowledges them
        assert_eq!(state.pending_marks(), 1);
    }

    #[test]
    fn test_delta_without_stream_is_not_recorded() {
        let mut state = CallState::new();
        assert!(state.place_audio_delta(Some("item_1")).is_none());
        assert_eq!(state.pending_marks(), 0);
        assert_eq!(state.playback().last_assistant_item_id, None);
    }

    #[test]
    fn test_new_item_starts_new_offset() {
        let mut state = started();
        state.record_media_timestamp(100);
        state.place_audio_delta(Some("item_1")).unwrap();

        state.record_media_timestamp(900);
        state.place_audio_delta(Some("item_2")).unwrap();
        assert_eq!(state.playback().response_start_offset_ms, Some(900));
        assert_eq!(
            state.playback().last_assistant_item_id.as_deref(),
            Some("item_2")
        );
    }

    #[test]
    fn test_delta_without_item_keeps_utterance() {
        let mut state = started();
        state.record_media_timestamp(100);
        state.place_audio_delta(Some("item_1")).unwrap();

        state.record_media_timestamp(300);
        state.place_audio_delta(None).unwrap();
        assert_eq!(state.playback().response_start_offset_ms, Some(100));
        assert_eq!(
            state.playback().last_assistant_item_id.as_deref(),
            Some("item_1")
        );
    }

    #[test]
    fn test_push_mark_requires_stream() {
        let mut state = CallState::new();
        assert!(state.push_mark().is_none());

        let mut state = started();
        let (stream_sid, _) = state.push_mark().unwrap();
        assert_eq!(stream_sid, "MZ1");
        assert_eq!(state.pending_marks(), 1);
    }
}
