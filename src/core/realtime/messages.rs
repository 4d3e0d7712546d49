//! OpenAI Realtime API wire messages
//!
//! Only the events the relay acts on are modelled in detail. Lifecycle and
//! rate-limit notices are decoded as unit variants so they can be logged by
//! name, and anything unrecognised lands in [`ServerEvent::Unknown`].

use serde::{Deserialize, Serialize};

use crate::config::RealtimeConfig;

/// Events sent from the relay to the realtime session
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type")]
pub enum ClientEvent {
    #[serde(rename = "session.update")]
    SessionUpdate { session: SessionConfig },
    #[serde(rename = "input_audio_buffer.append")]
    InputAudioBufferAppend {
        /// Base64 audio, forwarded byte-for-byte from telephony
        audio: String,
    },
    #[serde(rename = "conversation.item.truncate")]
    ConversationItemTruncate {
        item_id: String,
        content_index: u32,
        audio_end_ms: u64,
    },
    #[serde(rename = "response.create")]
    ResponseCreate,
}

impl ClientEvent {
    pub fn append_audio(audio: impl Into<String>) -> Self {
        Self::InputAudioBufferAppend {
            audio: audio.into(),
        }
    }

    /// Cut the first content part of `item_id` at `audio_end_ms`
    pub fn truncate(item_id: impl Into<String>, audio_end_ms: u64) -> Self {
        Self::ConversationItemTruncate {
            item_id: item_id.into(),
            content_index: 0,
            audio_end_ms,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TurnDetection {
    #[serde(rename = "type")]
    pub kind: String,
}

/// Body of `session.update`
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SessionConfig {
    pub turn_detection: TurnDetection,
    pub input_audio_format: String,
    pub output_audio_format: String,
    pub voice: String,
    pub instructions: String,
    pub modalities: Vec<String>,
    pub temperature: f32,
}

impl From<&RealtimeConfig> for SessionConfig {
    fn from(config: &RealtimeConfig) -> Self {
        Self {
            turn_detection: TurnDetection {
                kind: "server_vad".to_string(),
            },
            input_audio_format: config.audio_format.clone(),
            output_audio_format: config.audio_format.clone(),
            voice: config.voice.clone(),
            instructions: config.instructions.clone(),
            modalities: vec!["text".to_string(), "audio".to_string()],
            temperature: config.temperature,
        }
    }
}

/// Events received from the realtime session
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum ServerEvent {
    #[serde(rename = "response.audio.delta")]
    AudioDelta {
        delta: String,
        #[serde(default)]
        item_id: Option<String>,
    },
    #[serde(rename = "response.done")]
    ResponseDone { response: ResponseBody },
    #[serde(rename = "input_audio_buffer.speech_started")]
    SpeechStarted {
        /// Position of the speech start in the caller's input buffer
        #[serde(default)]
        audio_start_ms: Option<u64>,
    },
    #[serde(rename = "error")]
    Error { error: ErrorDetail },
    #[serde(rename = "session.created")]
    SessionCreated,
    #[serde(rename = "session.updated")]
    SessionUpdated,
    #[serde(rename = "rate_limits.updated")]
    RateLimitsUpdated,
    #[serde(rename = "input_audio_buffer.speech_stopped")]
    SpeechStopped,
    #[serde(rename = "input_audio_buffer.committed")]
    AudioCommitted,
    #[serde(rename = "response.content.done")]
    ContentDone,
    #[serde(other)]
    Unknown,
}

impl ServerEvent {
    /// Decode one text frame
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Wire name, for logging
    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::AudioDelta { .. } => "response.audio.delta",
            ServerEvent::ResponseDone { .. } => "response.done",
            ServerEvent::SpeechStarted { .. } => "input_audio_buffer.speech_started",
            ServerEvent::Error { .. } => "error",
            ServerEvent::SessionCreated => "session.created",
            ServerEvent::SessionUpdated => "session.updated",
            ServerEvent::RateLimitsUpdated => "rate_limits.updated",
            ServerEvent::SpeechStopped => "input_audio_buffer.speech_stopped",
            ServerEvent::AudioCommitted => "input_audio_buffer.committed",
            ServerEvent::ContentDone => "response.content.done",
            ServerEvent::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ResponseBody {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub output: Vec<OutputItem>,
}

impl ResponseBody {
    /// All transcript (or text) fragments of the turn joined in emission order
    pub fn transcript(&self) -> String {
        self.output
            .iter()
            .flat_map(|item| item.content.iter())
            .filter_map(ContentPart::text)
            .collect::<String>()
            .trim()
            .to_string()
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct OutputItem {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub content: Vec<ContentPart>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ContentPart {
    #[serde(default)]
    pub transcript: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

impl ContentPart {
    /// Spoken transcript, falling back to plain text
    fn text(&self) -> Option<&str> {
        self.transcript.as_deref().or(self.text.as_deref())
    }
}

/// Error reported by the realtime session itself
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ErrorDetail {
    #[serde(default)]
    pub message: String,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
}
