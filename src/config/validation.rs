use super::ServerConfig;
use crate::core::relay::signals::MarkerGrammar;
use crate::utils::phone_validation::validate_phone_number;

/// Validate the complete configuration after merging
pub fn validate_config(config: &ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    validate_temperature(config.realtime.temperature)?;
    validate_markers(&config.relay.markers)?;
    validate_twilio_credentials(
        &config.twilio.account_sid,
        &config.twilio.auth_token,
    )?;

    if let Some(number) = &config.twilio.forward_to_number {
        validate_phone_number(number).map_err(|e| format!("Invalid FORWARD_TO_NUMBER: {e}"))?;
    }

    if let Some(url) = &config.booking_form_url
        && !(url.starts_with("https://") || url.starts_with("http://"))
    {
        return Err(format!("BOOKING_FORM_URL must be an http(s) URL: {url}").into());
    }

    if config.realtime.connect_timeout.is_zero() {
        return Err("OPENAI_CONNECT_TIMEOUT_MS must be greater than zero".into());
    }

    Ok(())
}

/// Validate the sampling temperature accepted by the realtime API
pub fn validate_temperature(temperature: f32) -> Result<(), Box<dyn std::error::Error>> {
    if !(0.6..=1.2).contains(&temperature) {
        return Err(format!(
            "OPENAI_TEMPERATURE must be between 0.6 and 1.2, got {temperature}"
        )
        .into());
    }
    Ok(())
}

/// Validate control markers
///
/// Every marker must be non-empty and the three must be pairwise distinct,
/// otherwise a single token would map to several signals.
pub fn validate_markers(markers: &MarkerGrammar) -> Result<(), Box<dyn std::error::Error>> {
    let tokens = [
        ("hangup", &markers.hangup),
        ("transfer", &markers.transfer),
        ("booking", &markers.booking),
    ];

    for (name, token) in tokens {
        if token.trim().is_empty() {
            return Err(format!("Control marker '{name}' cannot be empty").into());
        }
    }

    for (i, (name_a, token_a)) in tokens.iter().enumerate() {
        for (name_b, token_b) in tokens.iter().skip(i + 1) {
            if token_a == token_b {
                return Err(format!(
                    "Control markers '{name_a}' and '{name_b}' must be distinct (both are {token_a})"
                )
                .into());
            }
        }
    }

    Ok(())
}

/// Validate Twilio REST credentials
///
/// Ensures that if either TWILIO_ACCOUNT_SID or TWILIO_AUTH_TOKEN is provided,
/// both are present.
pub fn validate_twilio_credentials(
    account_sid: &Option<String>,
    auth_token: &Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    match (account_sid, auth_token) {
        (Some(_), None) => {
            Err("TWILIO_AUTH_TOKEN is required when TWILIO_ACCOUNT_SID is set".into())
        }
        (None, Some(_)) => {
            Err("TWILIO_ACCOUNT_SID is required when TWILIO_AUTH_TOKEN is set".into())
        }
        _ => Ok(()),
    }
}
