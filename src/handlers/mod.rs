//! HTTP and WebSocket request handlers
//!
//! This module organizes all handlers into logical groups:
//! - `api` - Health check endpoint
//! - `voice` - TwiML webhooks answering and forwarding calls
//! - `call_status` - Status callbacks for forwarded calls
//! - `media_stream` - WebSocket media stream relayed to the realtime session

pub mod api;
pub mod call_status;
pub mod media_stream;
pub mod voice;

// Re-export commonly used handlers for convenient access
pub use media_stream::media_stream_handler;
