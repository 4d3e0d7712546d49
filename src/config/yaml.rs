use serde::Deserialize;
use std::path::PathBuf;

/// Complete YAML configuration structure
///
/// All fields are optional to allow partial configuration. Values present in
/// the file take priority over environment variables.
///
/// # Example YAML structure
/// ```yaml
/// server:
///   host: "0.0.0.0"
///   port: 5050
///   public_host: "relay.example.com"
///
/// realtime:
///   api_key: "sk-..."
///   url: "wss://api.openai.com/v1/realtime"
///   model: "gpt-4o-realtime-preview-2024-12-17"
///   voice: "alloy"
///   temperature: 0.8
///   instructions_file: "/etc/callrelay/prompt.txt"
///   audio_format: "g711_ulaw"
///   connect_timeout_ms: 10000
///   greet_on_connect: true
///
/// relay:
///   hangup_drain_ms: 2000
///   mark_backlog_warning: 256
///   markers:
///     hangup: "<<HANGUP>>"
///     transfer: "<<TRANSFER>>"
///     booking: "<<BOOKING>>"
///
/// twilio:
///   account_sid: "AC..."
///   auth_token: "..."
///   phone_number: "+15550000000"
///   forward_to_number: "+15551112222"
///   dial_timeout_seconds: 20
///   follow_up_sms: "Sorry we missed you!"
///   greeting: "Please wait while we connect you."
///
/// booking:
///   form_url: "https://forms.example.com/f/abc"
///
/// follow_up:
///   short_call_threshold_seconds: 40
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub server: Option<ServerYaml>,
    pub realtime: Option<RealtimeYaml>,
    pub relay: Option<RelayYaml>,
    pub twilio: Option<TwilioYaml>,
    pub booking: Option<BookingYaml>,
    pub follow_up: Option<FollowUpYaml>,
}

/// Server configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ServerYaml {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub public_host: Option<String>,
}

/// Voice-AI session configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RealtimeYaml {
    pub api_key: Option<String>,
    pub url: Option<String>,
    pub model: Option<String>,
    pub voice: Option<String>,
    pub temperature: Option<f32>,
    pub instructions: Option<String>,
    /// Read instructions from a file instead of inlining them
    pub instructions_file: Option<String>,
    pub audio_format: Option<String>,
    pub connect_timeout_ms: Option<u64>,
    pub greet_on_connect: Option<bool>,
}

/// Relay engine configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RelayYaml {
    pub hangup_drain_ms: Option<u64>,
    pub mark_backlog_warning: Option<usize>,
    pub markers: Option<MarkersYaml>,
}

/// Control marker tokens from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct MarkersYaml {
    pub hangup: Option<String>,
    pub transfer: Option<String>,
    pub booking: Option<String>,
}

/// Twilio configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct TwilioYaml {
    pub account_sid: Option<String>,
    pub auth_token: Option<String>,
    pub phone_number: Option<String>,
    pub api_base: Option<String>,
    pub forward_to_number: Option<String>,
    pub dial_timeout_seconds: Option<u32>,
    pub follow_up_sms: Option<String>,
    pub greeting: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct BookingYaml {
    pub form_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct FollowUpYaml {
    pub short_call_threshold_seconds: Option<u64>,
}

impl YamlConfig {
    /// Load configuration from a YAML file
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or the YAML is malformed
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file {}: {e}", path.display()))?;

        let config: YamlConfig = serde_yaml::from_str(&contents)
            .map_err(|e| format!("Failed to parse YAML config: {e}"))?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_yaml_config_full() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.yaml");
        fs::write(
            &config_path,
            r#"
server:
  host: "127.0.0.1"
  port: 5050
realtime:
  api_key: "sk-test"
  voice: "shimmer"
  greet_on_connect: true
relay:
  hangup_drain_ms: 500
  markers:
    booking: "[[BOOK]]"
twilio:
  account_sid: "AC123"
  dial_timeout_seconds: 30
booking:
  form_url: "https://forms.example.com/f/1"
follow_up:
  short_call_threshold_seconds: 15
"#,
        )
        .unwrap();

        let config = YamlConfig::from_file(&config_path).unwrap();

        let server = config.server.unwrap();
        assert_eq!(server.host.as_deref(), Some("127.0.0.1"));
        assert_eq!(server.port, Some(5050));
        assert!(server.public_host.is_none());

        let realtime = config.realtime.unwrap();
        assert_eq!(realtime.api_key.as_deref(), Some("sk-test"));
        assert_eq!(realtime.voice.as_deref(), Some("shimmer"));
        assert_eq!(realtime.greet_on_connect, Some(true));
        assert!(realtime.temperature.is_none());

        let relay = config.relay.unwrap();
        assert_eq!(relay.hangup_drain_ms, Some(500));
        let markers = relay.markers.unwrap();
        assert_eq!(markers.booking.as_deref(), Some("[[BOOK]]"));
        assert!(markers.hangup.is_none());

        let twilio = config.twilio.unwrap();
        assert_eq!(twilio.account_sid.as_deref(), Some("AC123"));
        assert_eq!(twilio.dial_timeout_seconds, Some(30));

        assert_eq!(
            config.booking.unwrap().form_url.as_deref(),
            Some("https://forms.example.com/f/1")
        );
        assert_eq!(
            config.follow_up.unwrap().short_call_threshold_seconds,
            Some(15)
        );
    }

    #[test]
    fn test_yaml_config_empty_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("empty.yaml");
        fs::write(&config_path, "{}").unwrap();

        let config = YamlConfig::from_file(&config_path).unwrap();
        assert!(config.server.is_none());
        assert!(config.realtime.is_none());
        assert!(config.twilio.is_none());
    }

    #[test]
    fn test_yaml_config_missing_file() {
        let result = YamlConfig::from_file(&PathBuf::from("/nonexistent/callrelay.yaml"));
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to read config file")
        );
    }

    #[test]
    fn test_yaml_config_invalid_type() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("bad.yaml");
        fs::write(&config_path, "server:\n  port: \"not-a-port\"\n").unwrap();

        let result = YamlConfig::from_file(&config_path);
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to parse YAML config")
        );
    }
}
