//! TwiML documents returned by the voice webhooks

use crate::core::relay::inbound::CALLER_PARAMETER;

const XML_PROLOG: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

/// Webhook path Twilio calls when the forwarded leg ends
pub const MISSED_CALL_PATH: &str = "/missed-call";
/// Webhook path Twilio calls when the forwarded leg's recording is ready
pub const CHECK_RECORDING_PATH: &str = "/check-recording";

/// Escapes special XML characters for attribute values and text nodes.
///
/// Replaces `&`, `<`, `>`, `"` and `'` with their entity references.
///
/// # Example
///
/// ```rust
/// use callrelay::utils::twiml::escape_xml;
///
/// assert_eq!(escape_xml("Tom & Jerry's"), "Tom &amp; Jerry&apos;s");
/// ```
pub fn escape_xml(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&apos;"),
            _ => result.push(c),
        }
    }
    result
}

/// Builds the `/incoming-call` response that connects the call to the media stream.
///
/// An optional greeting is spoken before the stream starts, followed by a
/// one second pause. The caller's number travels as a custom stream parameter.
///
/// # Example
///
/// ```rust
/// use callrelay::utils::twiml::connect_stream;
///
/// let xml = connect_stream("wss://relay.example.com/media-stream", Some("+15550100"), None);
/// assert!(xml.contains(r#"<Stream url="wss://relay.example.com/media-stream">"#));
/// assert!(xml.contains(r#"<Parameter name="caller" value="+15550100"/>"#));
/// ```
pub fn connect_stream(stream_url: &str, caller: Option<&str>, greeting: Option<&str>) -> String {
    let mut xml = String::from(XML_PROLOG);
    xml.push_str("<Response>");

    if let Some(greeting) = greeting.map(str::trim).filter(|g| !g.is_empty()) {
        xml.push_str(&format!("<Say>{}</Say>", escape_xml(greeting)));
        xml.push_str(r#"<Pause length="1"/>"#);
    }

    xml.push_str(&format!(
        r#"<Connect><Stream url="{}">"#,
        escape_xml(stream_url)
    ));
    if let Some(caller) = caller.filter(|c| !c.is_empty()) {
        xml.push_str(&format!(
            r#"<Parameter name="{CALLER_PARAMETER}" value="{}"/>"#,
            escape_xml(caller)
        ));
    }
    xml.push_str("</Stream></Connect></Response>");
    xml
}

/// Parameters of the `<Dial>` used to hand a call to a human
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardDial<'a> {
    pub number: &'a str,
    pub caller_id: Option<&'a str>,
    pub timeout_seconds: u32,
}

/// Builds the `/forward-call` response.
///
/// The forwarded leg is recorded from answer so a short conversation can be
/// detected; its outcome is reported to [`MISSED_CALL_PATH`].
pub fn forward_call(dial: &ForwardDial<'_>) -> String {
    let mut attributes = format!(r#" timeout="{}""#, dial.timeout_seconds);
    if let Some(caller_id) = dial.caller_id {
        attributes.push_str(&format!(r#" callerId="{}""#, escape_xml(caller_id)));
    }
    attributes.push_str(&format!(
        r#" action="{MISSED_CALL_PATH}" method="POST" record="record-from-answer" recordingStatusCallback="{CHECK_RECORDING_PATH}" recordingStatusCallbackEvent="completed""#
    ));

    format!(
        "{XML_PROLOG}<Response><Dial{attributes}><Number>{}</Number></Dial></Response>",
        escape_xml(dial.number)
    )
}
