//! Telephony provider configuration
//!
//! Twilio account credentials used for outbound call-control requests, and
//! the values rendered into TwiML by the voice webhooks.

/// Public Twilio REST API base
pub const DEFAULT_TWILIO_API_BASE: &str = "https://api.twilio.com";
/// Seconds the forwarded leg rings before giving up
pub const DEFAULT_DIAL_TIMEOUT_SECONDS: u32 = 20;
pub const DEFAULT_FOLLOW_UP_SMS: &str = "Hey! Sorry we missed your call. How can we help today?";

/// Twilio settings
///
/// `account_sid` and `auth_token` are only needed for REST requests (call
/// redirect, hangup, follow-up SMS). TwiML rendering works without them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TwilioConfig {
    pub account_sid: Option<String>,
    pub auth_token: Option<String>,
    /// The Twilio number used as caller id and SMS sender
    pub phone_number: Option<String>,
    /// REST API base URL (overridable for testing)
    pub api_base: String,
    /// Number that transferred calls are dialed to
    pub forward_to_number: Option<String>,
    pub dial_timeout_seconds: u32,
    /// Body of the missed-call / short-call follow-up SMS
    pub follow_up_sms: String,
    /// Optional spoken greeting before the media stream connects
    pub greeting: Option<String>,
}

impl Default for TwilioConfig {
    fn default() -> Self {
        Self {
            account_sid: None,
            auth_token: None,
            phone_number: None,
            api_base: DEFAULT_TWILIO_API_BASE.to_string(),
            forward_to_number: None,
            dial_timeout_seconds: DEFAULT_DIAL_TIMEOUT_SECONDS,
            follow_up_sms: DEFAULT_FOLLOW_UP_SMS.to_string(),
            greeting: None,
        }
    }
}

impl TwilioConfig {
    /// Returns true if both account SID and auth token are set
    pub fn has_api_credentials(&self) -> bool {
        self.account_sid.is_some() && self.auth_token.is_some()
    }
}
