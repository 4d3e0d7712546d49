//! Voice-AI session configuration
//!
//! Settings used by the session bridge to open and configure the realtime
//! conversational AI connection for each call.

use std::time::Duration;

use url::Url;

/// Default realtime endpoint (model is appended as a query parameter)
pub const DEFAULT_REALTIME_URL: &str = "wss://api.openai.com/v1/realtime";
/// Default realtime model
pub const DEFAULT_REALTIME_MODEL: &str = "gpt-4o-realtime-preview-2024-12-17";
/// Default synthesized voice
pub const DEFAULT_VOICE: &str = "alloy";
/// Default sampling temperature
pub const DEFAULT_TEMPERATURE: f32 = 0.8;
/// Telephony codec name understood by the realtime API (8kHz mu-law)
pub const DEFAULT_AUDIO_FORMAT: &str = "g711_ulaw";
/// Default bound on the AI session connect handshake
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 10_000;

pub const DEFAULT_INSTRUCTIONS: &str = "You are a friendly phone receptionist. Keep answers short \
and conversational. When the caller is done, say goodbye and end your reply with <<HANGUP>>. \
If the caller asks for a human, end your reply with <<TRANSFER>>. When you have collected \
booking details, end your reply with <<BOOKING>> followed by a JSON object of the details.";

/// Realtime AI session settings
#[derive(Debug, Clone)]
pub struct RealtimeConfig {
    /// API key sent as a bearer token
    pub api_key: String,
    /// Websocket endpoint without the model query parameter
    pub url: String,
    pub model: String,
    pub voice: String,
    pub temperature: f32,
    /// System instructions for the assistant
    pub instructions: String,
    /// Input and output audio format; must match the telephony codec verbatim
    pub audio_format: String,
    pub connect_timeout: Duration,
    /// Ask the model to speak first once the session is configured
    pub greet_on_connect: bool,
}

impl RealtimeConfig {
    /// Create a configuration with defaults for everything but the API key
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            url: DEFAULT_REALTIME_URL.to_string(),
            model: DEFAULT_REALTIME_MODEL.to_string(),
            voice: DEFAULT_VOICE.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            instructions: DEFAULT_INSTRUCTIONS.to_string(),
            audio_format: DEFAULT_AUDIO_FORMAT.to_string(),
            connect_timeout: Duration::from_millis(DEFAULT_CONNECT_TIMEOUT_MS),
            greet_on_connect: false,
        }
    }

    /// Build the full websocket endpoint including the model query parameter
    pub fn endpoint(&self) -> Result<Url, url::ParseError> {
        let mut url = Url::parse(&self.url)?;
        if !self.model.is_empty() && !url.query_pairs().any(|(k, _)| k == "model") {
            url.query_pairs_mut().append_pair("model", &self.model);
        }
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_realtime_config_defaults() {
        let config = RealtimeConfig::new("sk-test");

        assert_eq!(config.api_key, "sk-test");
        assert_eq!(config.voice, "alloy");
        assert_eq!(config.audio_format, "g711_ulaw");
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert!(!config.greet_on_connect);
    }

    #[test]
    fn test_endpoint_appends_model() {
        let config = RealtimeConfig::new("sk-test");
        let url = config.endpoint().unwrap();

        assert_eq!(url.scheme(), "wss");
        assert_eq!(url.host_str(), Some("api.openai.com"));
        assert_eq!(
            url.query(),
            Some("model=gpt-4o-realtime-preview-2024-12-17")
        );
    }

    #[test]
    fn test_endpoint_keeps_explicit_model() {
        let mut config = RealtimeConfig::new("sk-test");
        config.url = "ws://127.0.0.1:9000/v1/realtime?model=custom".to_string();

        let url = config.endpoint().unwrap();
        assert_eq!(url.query(), Some("model=custom"));
    }

    #[test]
    fn test_endpoint_invalid_url() {
        let mut config = RealtimeConfig::new("sk-test");
        config.url = "not a url".to_string();

        assert!(config.endpoint().is_err());
    }
}
