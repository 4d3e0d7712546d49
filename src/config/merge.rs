use std::env;
use std::str::FromStr;
use std::time::Duration;

use super::ServerConfig;
use super::realtime::{
    DEFAULT_AUDIO_FORMAT, DEFAULT_CONNECT_TIMEOUT_MS, DEFAULT_INSTRUCTIONS, DEFAULT_REALTIME_MODEL,
    DEFAULT_REALTIME_URL, DEFAULT_TEMPERATURE, DEFAULT_VOICE, RealtimeConfig,
};
use super::relay::{DEFAULT_HANGUP_DRAIN_MS, DEFAULT_MARK_BACKLOG_WARNING, RelaySettings};
use super::twilio::{
    DEFAULT_DIAL_TIMEOUT_SECONDS, DEFAULT_FOLLOW_UP_SMS, DEFAULT_TWILIO_API_BASE, TwilioConfig,
};
use super::utils::parse_bool;
use super::yaml::YamlConfig;
use crate::core::relay::signals::MarkerGrammar;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 5050;
pub const DEFAULT_SHORT_CALL_THRESHOLD_SECONDS: u64 = 40;

/// Parse a numeric environment variable, failing loudly on malformed values
fn env_number<T>(name: &str) -> Result<Option<T>, Box<dyn std::error::Error>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| format!("Invalid {name} environment variable: {e}").into()),
        Err(_) => Ok(None),
    }
}

/// Merge YAML configuration with environment variables
///
/// Priority order (highest to lowest):
/// 1. YAML configuration values
/// 2. Environment variables
/// 3. Default values
///
/// The realtime API key has no default; loading fails when neither source
/// provides it.
pub fn merge_config(
    yaml_config: Option<YamlConfig>,
) -> Result<ServerConfig, Box<dyn std::error::Error>> {
    let yaml = yaml_config.unwrap_or_default();

    // Helper macro to get value with priority: YAML > ENV > Default
    macro_rules! get_value {
        ($env_var:expr, $yaml_value:expr, $default:expr) => {
            $yaml_value
                .or_else(|| env::var($env_var).ok())
                .unwrap_or_else(|| $default.to_string())
        };
    }

    // Helper macro for optional values: YAML > ENV
    macro_rules! get_optional {
        ($env_var:expr, $yaml_value:expr) => {
            $yaml_value.or_else(|| env::var($env_var).ok())
        };
    }

    // Helper macro for numeric values: YAML > ENV (parsed) > Default
    macro_rules! get_number {
        ($env_var:expr, $yaml_value:expr, $default:expr) => {
            match $yaml_value {
                Some(value) => value,
                None => env_number($env_var)?.unwrap_or($default),
            }
        };
    }

    // Server configuration
    let server = yaml.server.as_ref();
    let host = get_value!("HOST", server.and_then(|s| s.host.clone()), DEFAULT_HOST);
    let port = get_number!("PORT", server.and_then(|s| s.port), DEFAULT_PORT);
    let public_host = get_optional!("PUBLIC_HOST", server.and_then(|s| s.public_host.clone()));

    // Voice-AI session
    let rt = yaml.realtime.as_ref();
    let api_key = get_optional!("OPENAI_API_KEY", rt.and_then(|r| r.api_key.clone()))
        .filter(|key| !key.trim().is_empty())
        .ok_or("OPENAI_API_KEY is required (realtime.api_key in YAML)")?;

    let instructions_file = get_optional!(
        "OPENAI_INSTRUCTIONS_FILE",
        rt.and_then(|r| r.instructions_file.clone())
    );
    let instructions = match rt.and_then(|r| r.instructions.clone()) {
        Some(inline) => inline,
        None => match instructions_file {
            Some(path) => std::fs::read_to_string(&path)
                .map_err(|e| format!("Failed to read instructions file {path}: {e}"))?
                .trim()
                .to_string(),
            None => env::var("OPENAI_INSTRUCTIONS")
                .unwrap_or_else(|_| DEFAULT_INSTRUCTIONS.to_string()),
        },
    };

    let greet_on_connect = rt
        .and_then(|r| r.greet_on_connect)
        .or_else(|| {
            env::var("GREET_ON_CONNECT")
                .ok()
                .and_then(|s| parse_bool(&s))
        })
        .unwrap_or(false);

    let realtime = RealtimeConfig {
        api_key,
        url: get_value!(
            "OPENAI_REALTIME_URL",
            rt.and_then(|r| r.url.clone()),
            DEFAULT_REALTIME_URL
        ),
        model: get_value!(
            "OPENAI_REALTIME_MODEL",
            rt.and_then(|r| r.model.clone()),
            DEFAULT_REALTIME_MODEL
        ),
        voice: get_value!(
            "OPENAI_VOICE",
            rt.and_then(|r| r.voice.clone()),
            DEFAULT_VOICE
        ),
        temperature: get_number!(
            "OPENAI_TEMPERATURE",
            rt.and_then(|r| r.temperature),
            DEFAULT_TEMPERATURE
        ),
        instructions,
        audio_format: get_value!(
            "OPENAI_AUDIO_FORMAT",
            rt.and_then(|r| r.audio_format.clone()),
            DEFAULT_AUDIO_FORMAT
        ),
        connect_timeout: Duration::from_millis(get_number!(
            "OPENAI_CONNECT_TIMEOUT_MS",
            rt.and_then(|r| r.connect_timeout_ms),
            DEFAULT_CONNECT_TIMEOUT_MS
        )),
        greet_on_connect,
    };

    // Relay engine
    let relay_yaml = yaml.relay.as_ref();
    let markers_yaml = relay_yaml.and_then(|r| r.markers.as_ref());
    let default_markers = MarkerGrammar::default();
    let markers = MarkerGrammar {
        hangup: get_value!(
            "MARKER_HANGUP",
            markers_yaml.and_then(|m| m.hangup.clone()),
            default_markers.hangup
        ),
        transfer: get_value!(
            "MARKER_TRANSFER",
            markers_yaml.and_then(|m| m.transfer.clone()),
            default_markers.transfer
        ),
        booking: get_value!(
            "MARKER_BOOKING",
            markers_yaml.and_then(|m| m.booking.clone()),
            default_markers.booking
        ),
    };

    let relay = RelaySettings {
        hangup_drain: Duration::from_millis(get_number!(
            "RELAY_HANGUP_DRAIN_MS",
            relay_yaml.and_then(|r| r.hangup_drain_ms),
            DEFAULT_HANGUP_DRAIN_MS
        )),
        mark_backlog_warning: get_number!(
            "RELAY_MARK_BACKLOG_WARNING",
            relay_yaml.and_then(|r| r.mark_backlog_warning),
            DEFAULT_MARK_BACKLOG_WARNING
        ),
        markers,
    };

    // Telephony provider
    let tw = yaml.twilio.as_ref();
    let twilio = TwilioConfig {
        account_sid: get_optional!("TWILIO_ACCOUNT_SID", tw.and_then(|t| t.account_sid.clone())),
        auth_token: get_optional!("TWILIO_AUTH_TOKEN", tw.and_then(|t| t.auth_token.clone())),
        phone_number: get_optional!(
            "TWILIO_PHONE_NUMBER",
            tw.and_then(|t| t.phone_number.clone())
        ),
        api_base: get_value!(
            "TWILIO_API_BASE",
            tw.and_then(|t| t.api_base.clone()),
            DEFAULT_TWILIO_API_BASE
        ),
        forward_to_number: get_optional!(
            "FORWARD_TO_NUMBER",
            tw.and_then(|t| t.forward_to_number.clone())
        ),
        dial_timeout_seconds: get_number!(
            "DIAL_TIMEOUT_SECONDS",
            tw.and_then(|t| t.dial_timeout_seconds),
            DEFAULT_DIAL_TIMEOUT_SECONDS
        ),
        follow_up_sms: get_value!(
            "FOLLOW_UP_SMS",
            tw.and_then(|t| t.follow_up_sms.clone()),
            DEFAULT_FOLLOW_UP_SMS
        ),
        greeting: get_optional!("CALL_GREETING", tw.and_then(|t| t.greeting.clone())),
    };

    let booking_form_url = get_optional!(
        "BOOKING_FORM_URL",
        yaml.booking.as_ref().and_then(|b| b.form_url.clone())
    );

    let short_call_threshold_seconds = get_number!(
        "SHORT_CALL_THRESHOLD_SECONDS",
        yaml.follow_up
            .as_ref()
            .and_then(|f| f.short_call_threshold_seconds),
        DEFAULT_SHORT_CALL_THRESHOLD_SECONDS
    );

    Ok(ServerConfig {
        host,
        port,
        public_host,
        realtime,
        relay,
        twilio,
        booking_form_url,
        short_call_threshold_seconds,
    })
}
