//! Dispatch error types

use thiserror::Error;
use tracing::{debug, info, warn};

/// A call-control or follow-up action that could not be delivered
///
/// Never propagated into the relay; the spawned request logs it and the call
/// carries on.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Setting required by this action is absent
    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    /// The call record lacks data the action needs
    #[error("call has no {0}")]
    MissingCallData(&'static str),

    /// Network error, timeout, connection refused
    #[error("request to {target} failed: {error}")]
    Request { target: String, error: String },

    /// Remote side answered with a non-2xx status
    #[error("{target} returned status {status}: {body}")]
    Rejected {
        target: String,
        status: u16,
        body: String,
    },
}

impl DispatchError {
    /// Logs this error with a severity matching its cause
    ///
    /// Missing call data is expected for anonymous callers and logs at debug.
    /// Missing configuration logs at info. Delivery failures log at warn.
    pub fn log_with_context(&self, action: &str, call_sid: &str) {
        match self {
            DispatchError::MissingCallData(field) => {
                debug!(
                    action = %action,
                    call_sid = %call_sid,
                    field = %field,
                    "Skipping call action: missing call data"
                );
            }
            DispatchError::NotConfigured(setting) => {
                info!(
                    action = %action,
                    call_sid = %call_sid,
                    setting = %setting,
                    "Skipping call action: not configured"
                );
            }
            DispatchError::Request { target, error } => {
                warn!(
                    action = %action,
                    call_sid = %call_sid,
                    target = %target,
                    error = %error,
                    "Call action request failed"
                );
            }
            DispatchError::Rejected {
                target,
                status,
                body,
            } => {
                warn!(
                    action = %action,
                    call_sid = %call_sid,
                    target = %target,
                    status = %status,
                    body = %body,
                    "Call action rejected"
                );
            }
        }
    }
}

pub type DispatchResult<T> = Result<T, DispatchError>;
