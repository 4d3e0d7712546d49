mod common;

use std::time::Duration;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use serde_json::Value;
use tower::util::ServiceExt;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use callrelay::{routes, state::AppState};
use common::{recording_state, test_config};

fn form_request(uri: &str, body: &'static str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body))
        .unwrap()
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn app(state: std::sync::Arc<AppState>) -> Router {
    routes::create_router(state)
}

#[tokio::test]
async fn test_health_check() {
    let (state, _) = recording_state(test_config());

    let request = Request::builder().uri("/").body(Body::empty()).unwrap();
    let response = app(state).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json: Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(json["status"], "OK");
}

#[tokio::test]
async fn test_incoming_call_connects_media_stream() {
    let mut config = test_config();
    config.twilio.greeting = Some("Thanks for calling.".to_string());
    let (state, _) = recording_state(config);

    let response = app(state)
        .oneshot(form_request(
            "/incoming-call",
            "CallSid=CA100&From=%2B15550102000",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/xml"
    );
    let xml = body_string(response).await;
    assert!(xml.contains(r#"<Stream url="wss://relay.example.com/media-stream">"#));
    assert!(xml.contains(r#"<Parameter name="caller" value="+15550102000"/>"#));
    assert!(xml.contains("<Say>Thanks for calling.</Say>"));
}

#[tokio::test]
async fn test_incoming_call_get_uses_host_header() {
    let mut config = test_config();
    config.public_host = None;
    let (state, _) = recording_state(config);

    let request = Request::builder()
        .uri("/incoming-call?CallSid=CA100&From=%2B15550102000")
        .header(header::HOST, "abc123.ngrok.app")
        .body(Body::empty())
        .unwrap();
    let response = app(state).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let xml = body_string(response).await;
    assert!(xml.contains(r#"<Stream url="wss://abc123.ngrok.app/media-stream">"#));
}

#[tokio::test]
async fn test_incoming_call_without_any_host_is_rejected() {
    let mut config = test_config();
    config.public_host = None;
    let (state, _) = recording_state(config);

    let response = app(state)
        .oneshot(form_request("/incoming-call", "CallSid=CA100"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_forward_call_requires_number() {
    let (state, _) = recording_state(test_config());

    let response = app(state)
        .oneshot(form_request("/forward-call", "CallSid=CA100&From=%2B15550102000"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_forward_call_dials_and_remembers_caller() {
    let mut config = test_config();
    config.twilio.forward_to_number = Some("+15550109999".to_string());
    config.twilio.phone_number = Some("+15550100000".to_string());
    let (state, _) = recording_state(config);

    let response = app(state.clone())
        .oneshot(form_request("/forward-call", "CallSid=CA100&From=%2B15550102000"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let xml = body_string(response).await;
    assert!(xml.contains("<Number>+15550109999</Number>"));
    assert!(xml.contains(r#"callerId="+15550100000""#));
    assert!(xml.contains(r#"timeout="20""#));
    assert!(xml.contains(r#"action="/missed-call""#));
    assert!(xml.contains(r#"recordingStatusCallback="/check-recording""#));
    assert_eq!(state.callers.len(), 1);
}

#[tokio::test]
async fn test_missed_call_statuses() {
    let (state, recorder) = recording_state(test_config());

    for body in [
        "CallSid=CA1&From=%2B15550102000&DialCallStatus=busy",
        "CallSid=CA2&From=%2B15550102000&DialCallStatus=completed",
        "CallSid=CA3&From=%2B15550102001&DialCallStatus=&CallStatus=no-answer",
    ] {
        let response = app(state.clone())
            .oneshot(form_request("/missed-call", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    assert_eq!(
        recorder.events(),
        vec![
            "missed:CA1:+15550102000:busy".to_string(),
            "missed:CA3:+15550102001:no-answer".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_check_recording_short_call_follow_up() {
    let (state, recorder) = recording_state(test_config());
    state.callers.remember("CA1", "+15550102000");
    state.callers.remember("CA2", "+15550102001");

    let short = app(state.clone())
        .oneshot(form_request(
            "/check-recording",
            "CallSid=CA1&RecordingDuration=12",
        ))
        .await
        .unwrap();
    let long = app(state.clone())
        .oneshot(form_request(
            "/check-recording",
            "CallSid=CA2&RecordingDuration=95",
        ))
        .await
        .unwrap();
    let unknown = app(state.clone())
        .oneshot(form_request(
            "/check-recording",
            "CallSid=CA9&RecordingDuration=3",
        ))
        .await
        .unwrap();

    assert_eq!(short.status(), StatusCode::NO_CONTENT);
    assert_eq!(long.status(), StatusCode::NO_CONTENT);
    assert_eq!(unknown.status(), StatusCode::NO_CONTENT);
    assert_eq!(recorder.events(), vec!["short:CA1:+15550102000:12".to_string()]);
    assert!(state.callers.is_empty());
}

#[tokio::test]
async fn test_missed_call_sends_sms_through_twilio() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/2010-04-01/Accounts/AC123/Messages.json"))
        .and(body_string_contains("To=%2B15550102000"))
        .respond_with(ResponseTemplate::new(201).set_body_string(r#"{"sid":"SM1"}"#))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = test_config();
    config.twilio.account_sid = Some("AC123".to_string());
    config.twilio.auth_token = Some("secret".to_string());
    config.twilio.phone_number = Some("+15550100000".to_string());
    config.twilio.api_base = server.uri();
    let state = AppState::new(config).await;

    let response = app(state)
        .oneshot(form_request(
            "/missed-call",
            "CallSid=CA1&From=%2B15550102000&DialCallStatus=no-answer",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    // the SMS is sent in the background
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while server.received_requests().await.unwrap_or_default().is_empty()
        && tokio::time::Instant::now() < deadline
    {
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    server.verify().await;
}
