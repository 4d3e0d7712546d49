//! Telephony media stream protocol

pub mod messages;

pub use messages::{MarkLabel, MediaChunk, StartMetadata, StreamEvent, TelephonyCommand};
