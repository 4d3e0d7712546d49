//! Realtime voice-AI session protocol and connection

pub mod client;
pub mod messages;

pub use client::{RealtimeSink, RealtimeStream, connect};
pub use messages::{ClientEvent, ResponseBody, ServerEvent, SessionConfig};
