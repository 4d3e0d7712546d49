//! Control signals embedded in finalized AI turns
//!
//! The assistant is instructed to end certain replies with marker tokens.
//! [`parse_control_signal`] is the single place those tokens are recognised,
//! so the grammar can change without touching the relay pumps.

use serde_json::{Map, Value};

pub const DEFAULT_HANGUP_MARKER: &str = "<<HANGUP>>";
pub const DEFAULT_TRANSFER_MARKER: &str = "<<TRANSFER>>";
pub const DEFAULT_BOOKING_MARKER: &str = "<<BOOKING>>";

/// Structured booking details extracted from a turn
pub type BookingPayload = Map<String, Value>;

/// Marker tokens recognised in AI output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerGrammar {
    /// End the call after trailing audio has played
    pub hangup: String,
    /// Redirect the call to a human
    pub transfer: String,
    /// Start of a JSON object with booking details
    pub booking: String,
}

impl Default for MarkerGrammar {
    fn default() -> Self {
        Self {
            hangup: DEFAULT_HANGUP_MARKER.to_string(),
            transfer: DEFAULT_TRANSFER_MARKER.to_string(),
            booking: DEFAULT_BOOKING_MARKER.to_string(),
        }
    }
}

/// Call-control instruction carried by one finalized turn
#[derive(Debug, Clone, PartialEq)]
pub enum ControlSignal {
    Hangup,
    Transfer,
    Booking(BookingPayload),
}

impl ControlSignal {
    /// Short label used in log fields
    pub fn kind(&self) -> &'static str {
        match self {
            ControlSignal::Hangup => "hangup",
            ControlSignal::Transfer => "transfer",
            ControlSignal::Booking(_) => "booking",
        }
    }
}

/// Booking marker present but its payload is unusable
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum SignalParseError {
    #[error("booking marker without a JSON object")]
    MissingPayload,
    #[error("booking payload is not a valid JSON object: {0}")]
    InvalidJson(String),
}

/// Extract at most one control signal from a finalized turn
///
/// Priority when several markers co-occur: hangup, then transfer, then
/// booking. Text without any marker yields `Ok(None)`.
pub fn parse_control_signal(
    text: &str,
    grammar: &MarkerGrammar,
) -> Result<Option<ControlSignal>, SignalParseError> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }

    if text.contains(grammar.hangup.as_str()) {
        return Ok(Some(ControlSignal::Hangup));
    }

    if text.contains(grammar.transfer.as_str()) {
        return Ok(Some(ControlSignal::Transfer));
    }

    if let Some(pos) = text.find(grammar.booking.as_str()) {
        let remainder = text[pos + grammar.booking.len()..].trim();
        return parse_booking_payload(remainder)
            .map(|payload| Some(ControlSignal::Booking(payload)));
    }

    Ok(None)
}

/// Decode the first `{` .. last `}` span of `remainder` as a JSON object
fn parse_booking_payload(remainder: &str) -> Result<BookingPayload, SignalParseError> {
    let (Some(start), Some(end)) = (remainder.find('{'), remainder.rfind('}')) else {
        return Err(SignalParseError::MissingPayload);
    };
    if end < start {
        return Err(SignalParseError::MissingPayload);
    }

    // The span always opens with '{', so anything that decodes is an object
    serde_json::from_str::<BookingPayload>(&remainder[start..=end])
        .map_err(|e| SignalParseError::InvalidJson(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(text: &str) -> Result<Option<ControlSignal>, SignalParseError> {
        parse_control_signal(text, &MarkerGrammar::default())
    }

    #[test]
    fn test_plain_text_has_no_signal() {
        assert_eq!(parse("Sure, we open at nine tomorrow."), Ok(None));
        assert_eq!(parse(""), Ok(None));
        assert_eq!(parse("   \n"), Ok(None));
    }

    #[test]
    fn test_hangup_anywhere() {
        assert_eq!(
            parse("Thanks, goodbye. <<HANGUP>>"),
            Ok(Some(ControlSignal::Hangup))
        );
        assert_eq!(
            parse("<<HANGUP>> was the plan"),
            Ok(Some(ControlSignal::Hangup))
        );
    }

    #[test]
    fn test_transfer() {
        assert_eq!(
            parse("Let me connect you with someone. <<TRANSFER>>"),
            Ok(Some(ControlSignal::Transfer))
        );
    }

    #[test]
    fn test_hangup_wins_over_transfer() {
        assert_eq!(
            parse("...ok, goodbye <<HANGUP>> please transfer <<TRANSFER>>"),
            Ok(Some(ControlSignal::Hangup))
        );
    }

    #[test]
    fn test_transfer_wins_over_booking() {
        assert_eq!(
            parse(r#"<<BOOKING>> {"name": "Ana"} <<TRANSFER>>"#),
            Ok(Some(ControlSignal::Transfer))
        );
    }

    #[test]
    fn test_hangup_wins_over_malformed_booking() {
        assert_eq!(
            parse("Bye! <<BOOKING>> {not json <<HANGUP>>"),
            Ok(Some(ControlSignal::Hangup))
        );
    }

    #[test]
    fn test_booking_payload() {
        let signal = parse(
            r#"Great, you're booked. <<BOOKING>> {"name": "Ana", "date": "2024-06-01", "guests": 2}"#,
        )
        .unwrap()
        .unwrap();

        let ControlSignal::Booking(payload) = signal else {
            panic!("expected booking, got {signal:?}");
        };
        assert_eq!(payload.get("name"), Some(&json!("Ana")));
        assert_eq!(payload.get("guests"), Some(&json!(2)));
    }

    #[test]
    fn test_booking_payload_with_trailing_text() {
        let signal = parse(r#"<<BOOKING>> here you go: {"name": "Ana"} thanks!"#).unwrap();
        assert!(matches!(signal, Some(ControlSignal::Booking(p)) if p.len() == 1));
    }

    #[test]
    fn test_booking_malformed_json() {
        let result = parse(r#"<<BOOKING>> {"name": "Ana", }"#);
        assert!(matches!(result, Err(SignalParseError::InvalidJson(_))));
    }

    #[test]
    fn test_booking_without_object() {
        assert_eq!(
            parse("<<BOOKING>> name Ana"),
            Err(SignalParseError::MissingPayload)
        );
        assert_eq!(parse("<<BOOKING>>"), Err(SignalParseError::MissingPayload));
        assert_eq!(
            parse("<<BOOKING>> } backwards {"),
            Err(SignalParseError::MissingPayload)
        );
    }

    #[test]
    fn test_booking_spanning_several_objects() {
        // first '{' to last '}' here spans two objects, which is not valid JSON
        assert!(parse(r#"<<BOOKING>> [{"a": 1}, {"b": 2}]"#).is_err());
        assert_eq!(
            parse(r#"<<BOOKING>> {"a": 1}"#).map(|s| s.map(|s| s.kind())),
            Ok(Some("booking"))
        );
    }

    #[test]
    fn test_custom_grammar() {
        let grammar = MarkerGrammar {
            hangup: "[[END]]".to_string(),
            transfer: "[[HUMAN]]".to_string(),
            booking: "[[DATA]]".to_string(),
        };

        assert_eq!(parse_control_signal("bye <<HANGUP>>", &grammar), Ok(None));
        assert_eq!(
            parse_control_signal("bye [[END]]", &grammar),
            Ok(Some(ControlSignal::Hangup))
        );
        assert!(matches!(
            parse_control_signal(r#"[[DATA]] {"x": true}"#, &grammar),
            Ok(Some(ControlSignal::Booking(_)))
        ));
    }

    #[test]
    fn test_parsing_is_deterministic() {
        let text = r#"<<BOOKING>> {"name": "Ana"}"#;
        assert_eq!(parse(text), parse(text));
    }
}
