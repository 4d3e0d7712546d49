//! Twilio REST and booking-intake dispatcher
//!
//! Call redirects and hangups go through the Calls resource, follow-up SMS
//! through the Messages resource. Booking details are posted form-encoded to
//! an external intake URL. Each trait method spawns the request and returns;
//! failures are logged through [`DispatchError::log_with_context`].

use std::future::Future;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::info;

use super::error::{DispatchError, DispatchResult};
use super::{CallControl, FollowUpNotifier};
use crate::config::ServerConfig;
use crate::core::relay::signals::BookingPayload;
use crate::core::relay::state::CallSession;
use crate::utils::phone_validation::validate_phone_number;

/// Per-request bound for outbound HTTP calls
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

const TWILIO_API_VERSION: &str = "2010-04-01";

/// Account credentials for the Twilio REST API
#[derive(Clone)]
pub struct TwilioAccount {
    pub account_sid: String,
    pub auth_token: String,
}

impl std::fmt::Debug for TwilioAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwilioAccount")
            .field("account_sid", &self.account_sid)
            .field("auth_token", &"<redacted>")
            .finish()
    }
}

/// HTTP-backed [`CallControl`] and [`FollowUpNotifier`]
#[derive(Debug, Clone)]
pub struct TwilioDispatcher {
    client: Client,
    api_base: String,
    account: Option<TwilioAccount>,
    from_number: Option<String>,
    follow_up_sms: String,
    /// Absolute base URL of this server, used for redirect webhooks
    public_base_url: Option<String>,
    booking_form_url: Option<String>,
}

impl TwilioDispatcher {
    /// Build a dispatcher when at least one outbound integration is configured
    ///
    /// Returns `Ok(None)` when neither Twilio credentials nor a booking form
    /// URL are set.
    pub fn from_config(config: &ServerConfig) -> Result<Option<Self>, reqwest::Error> {
        let account = match (&config.twilio.account_sid, &config.twilio.auth_token) {
            (Some(account_sid), Some(auth_token)) => Some(TwilioAccount {
                account_sid: account_sid.clone(),
                auth_token: auth_token.clone(),
            }),
            _ => None,
        };

        if account.is_none() && config.booking_form_url.is_none() {
            return Ok(None);
        }

        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .pool_max_idle_per_host(4)
            .build()?;

        Ok(Some(Self {
            client,
            api_base: config.twilio.api_base.trim_end_matches('/').to_string(),
            account,
            from_number: config.twilio.phone_number.clone(),
            follow_up_sms: config.twilio.follow_up_sms.clone(),
            public_base_url: config
                .public_host
                .as_ref()
                .map(|host| format!("https://{}", host.trim_end_matches('/'))),
            booking_form_url: config.booking_form_url.clone(),
        }))
    }

    fn account(&self) -> DispatchResult<&TwilioAccount> {
        self.account
            .as_ref()
            .ok_or(DispatchError::NotConfigured("TWILIO_ACCOUNT_SID"))
    }

    fn call_url(&self, account: &TwilioAccount, call_sid: &str) -> String {
        format!(
            "{}/{TWILIO_API_VERSION}/Accounts/{}/Calls/{call_sid}.json",
            self.api_base, account.account_sid
        )
    }

    fn messages_url(&self, account: &TwilioAccount) -> String {
        format!(
            "{}/{TWILIO_API_VERSION}/Accounts/{}/Messages.json",
            self.api_base, account.account_sid
        )
    }

    /// Complete an in-progress call
    pub async fn complete_call(&self, call_sid: &str) -> DispatchResult<()> {
        if call_sid.is_empty() {
            return Err(DispatchError::MissingCallData("call_sid"));
        }
        let account = self.account()?;
        let url = self.call_url(account, call_sid);
        self.post_twilio(account, &url, &[("Status", "completed")])
            .await
    }

    /// Redirect an in-progress call to the `/forward-call` TwiML
    pub async fn redirect_call(&self, call_sid: &str) -> DispatchResult<()> {
        if call_sid.is_empty() {
            return Err(DispatchError::MissingCallData("call_sid"));
        }
        let account = self.account()?;
        let base = self
            .public_base_url
            .as_deref()
            .ok_or(DispatchError::NotConfigured("PUBLIC_HOST"))?;
        let forward_url = format!("{base}/forward-call");
        let url = self.call_url(account, call_sid);
        let form = [("Url", forward_url.as_str()), ("Method", "POST")];
        self.post_twilio(account, &url, &form).await
    }

    /// Send the follow-up SMS to `to`
    pub async fn send_follow_up_sms(&self, to: Option<&str>) -> DispatchResult<()> {
        let account = self.account()?;
        let from = self
            .from_number
            .as_deref()
            .ok_or(DispatchError::NotConfigured("TWILIO_PHONE_NUMBER"))?;
        let to = to
            .and_then(|number| validate_phone_number(number).ok())
            .ok_or(DispatchError::MissingCallData("caller number"))?;

        let url = self.messages_url(account);
        let form = [
            ("From", from),
            ("To", to.as_str()),
            ("Body", self.follow_up_sms.as_str()),
        ];
        self.post_twilio(account, &url, &form).await
    }

    /// Post booking details to the intake form
    pub async fn submit_booking(&self, payload: &BookingPayload) -> DispatchResult<()> {
        let url = self
            .booking_form_url
            .as_deref()
            .ok_or(DispatchError::NotConfigured("BOOKING_FORM_URL"))?;
        let fields = flatten_booking(payload);

        let start = Instant::now();
        let response = self
            .client
            .post(url)
            .form(&fields)
            .send()
            .await
            .map_err(|e| DispatchError::Request {
                target: url.to_string(),
                error: e.to_string(),
            })?;

        check_response(url, response).await?;
        info!(
            fields = fields.len(),
            duration_ms = start.elapsed().as_millis(),
            "Booking submitted to intake form"
        );
        Ok(())
    }

    async fn post_twilio(
        &self,
        account: &TwilioAccount,
        url: &str,
        form: &[(&str, &str)],
    ) -> DispatchResult<()> {
        let start = Instant::now();
        let response = self
            .client
            .post(url)
            .basic_auth(&account.account_sid, Some(&account.auth_token))
            .form(form)
            .send()
            .await
            .map_err(|e| DispatchError::Request {
                target: url.to_string(),
                error: e.to_string(),
            })?;

        check_response(url, response).await?;
        info!(
            url = %url,
            duration_ms = start.elapsed().as_millis(),
            "Twilio request succeeded"
        );
        Ok(())
    }
}

/// Run `action` in the background, logging failures
fn spawn_action<F>(action: &'static str, call_sid: String, fut: F)
where
    F: Future<Output = DispatchResult<()>> + Send + 'static,
{
    tokio::spawn(async move {
        if let Err(e) = fut.await {
            e.log_with_context(action, &call_sid);
        }
    });
}

async fn check_response(target: &str, response: reqwest::Response) -> DispatchResult<()> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<unable to read body>".to_string());
    let body = match body.char_indices().nth(200) {
        Some((cut, _)) => format!("{}...", &body[..cut]),
        None => body,
    };

    Err(DispatchError::Rejected {
        target: target.to_string(),
        status: status.as_u16(),
        body,
    })
}

/// Flatten a booking object into form fields
///
/// Strings are sent as-is; other values use their JSON text.
pub fn flatten_booking(payload: &BookingPayload) -> Vec<(String, String)> {
    payload
        .iter()
        .map(|(key, value)| {
            let value = match value {
                Value::String(s) => s.clone(),
                Value::Null => String::new(),
                other => other.to_string(),
            };
            (key.clone(), value)
        })
        .collect()
}

#[async_trait]
impl CallControl for TwilioDispatcher {
    async fn notify_hangup(&self, session: &CallSession) {
        let this = self.clone();
        let call_sid = session.call_sid.clone();
        spawn_action("hangup", call_sid.clone(), async move {
            this.complete_call(&call_sid).await
        });
    }

    async fn notify_transfer(&self, session: &CallSession) {
        let this = self.clone();
        let call_sid = session.call_sid.clone();
        spawn_action("transfer", call_sid.clone(), async move {
            this.redirect_call(&call_sid).await
        });
    }

    async fn notify_booking(&self, session: &CallSession, payload: &BookingPayload) {
        let this = self.clone();
        let payload = payload.clone();
        spawn_action("booking", session.call_sid.clone(), async move {
            this.submit_booking(&payload).await
        });
    }
}

#[async_trait]
impl FollowUpNotifier for TwilioDispatcher {
    async fn notify_missed_call(&self, session: &CallSession, terminal_status: &str) {
        info!(
            call_sid = %session.call_sid,
            status = %terminal_status,
            "Sending missed-call follow-up"
        );
        let this = self.clone();
        let caller = session.caller_number.clone();
        spawn_action("missed_call_sms", session.call_sid.clone(), async move {
            this.send_follow_up_sms(caller.as_deref()).await
        });
    }

    async fn notify_short_call(&self, session: &CallSession, duration_seconds: u64) {
        info!(
            call_sid = %session.call_sid,
            duration_seconds,
            "Sending short-call follow-up"
        );
        let this = self.clone();
        let caller = session.caller_number.clone();
        spawn_action("short_call_sms", session.call_sid.clone(), async move {
            this.send_follow_up_sms(caller.as_deref()).await
        });
    }
}
