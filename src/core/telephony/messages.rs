//! Twilio Media Streams wire messages
//!
//! Inbound events arrive as JSON text frames tagged by `event`; outbound
//! commands use the same envelope. Audio payloads stay base64 strings and are
//! never decoded here.

use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};

/// Events sent by the telephony provider over the media stream
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum StreamEvent {
    Connected {
        #[serde(default)]
        protocol: Option<String>,
    },
    Start {
        start: StartMetadata,
    },
    Media {
        media: MediaChunk,
    },
    Mark {
        mark: MarkLabel,
    },
    Stop,
    #[serde(other)]
    Unknown,
}

impl StreamEvent {
    /// Decode one text frame
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StartMetadata {
    pub stream_sid: String,
    pub call_sid: String,
    #[serde(default)]
    pub account_sid: Option<String>,
    /// `<Parameter>` values from the TwiML `<Stream>` verb
    #[serde(default)]
    pub custom_parameters: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct MediaChunk {
    /// Milliseconds since the stream started
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub timestamp: u64,
    /// Base64 audio in the negotiated codec
    pub payload: String,
    #[serde(default)]
    pub track: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct MarkLabel {
    pub name: String,
}

/// Twilio sends the media timestamp as a numeric string; plain numbers are
/// accepted too. Anything that is not a non-negative integer is rejected.
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawTimestamp {
        Number(u64),
        Text(String),
    }

    match RawTimestamp::deserialize(deserializer)? {
        RawTimestamp::Number(value) => Ok(value),
        RawTimestamp::Text(text) => text.trim().parse::<u64>().map_err(|e| {
            serde::de::Error::custom(format!("invalid media timestamp {text:?}: {e}"))
        }),
    }
}

/// Outbound audio container
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct MediaPayload {
    pub payload: String,
}

/// Commands sent back to the telephony provider
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum TelephonyCommand {
    Media {
        #[serde(rename = "streamSid")]
        stream_sid: String,
        media: MediaPayload,
    },
    Mark {
        #[serde(rename = "streamSid")]
        stream_sid: String,
        mark: MarkLabel,
    },
    Clear {
        #[serde(rename = "streamSid")]
        stream_sid: String,
    },
}

impl TelephonyCommand {
    pub fn media(stream_sid: impl Into<String>, payload: impl Into<String>) -> Self {
        Self::Media {
            stream_sid: stream_sid.into(),
            media: MediaPayload {
                payload: payload.into(),
            },
        }
    }

    pub fn mark(stream_sid: impl Into<String>, name: impl Into<String>) -> Self {
        Self::Mark {
            stream_sid: stream_sid.into(),
            mark: MarkLabel { name: name.into() },
        }
    }

    pub fn clear(stream_sid: impl Into<String>) -> Self {
        Self::Clear {
            stream_sid: stream_sid.into(),
        }
    }
}
