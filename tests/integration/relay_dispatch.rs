//! Dispatch through the chat-completions relay against a mock host server.

use crate::integration::test_utils::{
    completion_body, dispatcher, registry_with, relay_client, relay_client_with_headers,
};
use genrelay::error::ApiError;
use genrelay::provider::{PromptMessage, RELAY_GENERATE_PATH};
use serde_json::{json, Value};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn conversation() -> Vec<PromptMessage> {
    vec![
        PromptMessage::new("system", "You summarize chats."),
        PromptMessage::new("user", "Summarize the last scene."),
    ]
}

#[tokio::test]
async fn test_direct_endpoint_success() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(RELAY_GENERATE_PATH))
        .and(body_partial_json(json!({
            "model": "gpt-4o-mini",
            "chat_completion_source": "openai",
            "stream": false,
            "custom_url": "https://api.example.test/v1",
            "reverse_proxy": "https://api.example.test/v1",
            "custom_include_headers": "Authorization: Bearer sk-test",
            "messages": [
                { "role": "system", "content": "You summarize chats." },
                { "role": "user", "content": "Summarize the last scene." }
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("  The hero rests.\n")))
        .expect(1)
        .mount(&server)
        .await;

    let registry = registry_with(&[("summary", "openai", "gpt-4o-mini")]);
    let text = dispatcher(&registry, relay_client(&server.uri()))
        .dispatch(&conversation(), "summary", None)
        .await
        .unwrap();
    assert_eq!(text, "The hero rests.");
}

#[tokio::test]
async fn test_backend_error_carries_status_and_body() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(RELAY_GENERATE_PATH))
        .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
        .mount(&server)
        .await;

    let registry = registry_with(&[("summary", "openai", "gpt-4o-mini")]);
    let err = dispatcher(&registry, relay_client(&server.uri()))
        .dispatch(&conversation(), "summary", None)
        .await
        .unwrap_err();

    match err {
        ApiError::BackendRequest { status, ref body } => {
            assert_eq!(status, 429);
            assert_eq!(body, "rate limited");
        }
        ref other => panic!("Expected BackendRequest, got: {other:?}"),
    }
    assert_eq!(err.status(), Some(429));
    assert_eq!(err.body(), Some("rate limited"));
}

#[tokio::test]
async fn test_claude_source_sends_family_model_field() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(RELAY_GENERATE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("ok")))
        .mount(&server)
        .await;

    let registry = registry_with(&[("claude", "claude", "claude-3-5-sonnet")]);
    dispatcher(&registry, relay_client(&server.uri()))
        .dispatch(&conversation(), "claude", None)
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let body: Value = requests[0].body_json().unwrap();
    assert_eq!(body["claude_model"], json!("claude-3-5-sonnet"));
    assert_eq!(body["model"], body["claude_model"]);
    assert!(body.get("google_model").is_none());
    assert!(body.get("mistralai_model").is_none());
    assert_eq!(body["max_tokens"], json!(4096));
    assert_eq!(body["temperature"], json!(0.9));
}

#[tokio::test]
async fn test_ambient_headers_are_sent() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(RELAY_GENERATE_PATH))
        .and(header("x-csrf-token", "csrf-123"))
        .and(header("content-type", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("ok")))
        .expect(1)
        .mount(&server)
        .await;

    let registry = registry_with(&[("summary", "openai", "gpt-4o-mini")]);
    let relay = relay_client_with_headers(&server.uri(), &[("X-CSRF-Token", "csrf-123")]);
    let text = dispatcher(&registry, relay)
        .dispatch(&conversation(), "summary", None)
        .await
        .unwrap();
    assert_eq!(text, "ok");
}

#[tokio::test]
async fn test_roles_normalized_on_the_wire() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(RELAY_GENERATE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("ok")))
        .mount(&server)
        .await;

    let registry = registry_with(&[("summary", "openai", "gpt-4o-mini")]);
    let messages = vec![
        PromptMessage::new("AI", "earlier"),
        PromptMessage {
            role: None,
            content: "untagged".to_string(),
        },
        PromptMessage::new("narrator", "odd role"),
    ];
    dispatcher(&registry, relay_client(&server.uri()))
        .dispatch(&messages, "summary", None)
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    let body: Value = requests[0].body_json().unwrap();
    assert_eq!(
        body["messages"],
        json!([
            { "role": "assistant", "content": "earlier" },
            { "role": "user", "content": "untagged" },
            { "role": "user", "content": "odd role" }
        ])
    );
}

#[tokio::test]
async fn test_cancellation_during_request() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(RELAY_GENERATE_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(completion_body("too late"))
                .set_delay(Duration::from_secs(10)),
        )
        .mount(&server)
        .await;

    let registry = registry_with(&[("summary", "openai", "gpt-4o-mini")]);
    let dispatcher = dispatcher(&registry, relay_client(&server.uri()));
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let started = std::time::Instant::now();
    let err = dispatcher
        .dispatch(&conversation(), "summary", Some(&cancel))
        .await
        .unwrap_err();
    assert!(err.is_cancelled(), "Expected Cancelled, got: {err:?}");
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn test_already_cancelled_sends_nothing() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("ok")))
        .expect(0)
        .mount(&server)
        .await;

    let registry = registry_with(&[("summary", "openai", "gpt-4o-mini")]);
    let cancel = CancellationToken::new();
    cancel.cancel();
    let err = dispatcher(&registry, relay_client(&server.uri()))
        .dispatch(&conversation(), "summary", Some(&cancel))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Cancelled(_)));
}

#[tokio::test]
async fn test_malformed_payload() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(RELAY_GENERATE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
        .mount(&server)
        .await;

    let registry = registry_with(&[("summary", "openai", "gpt-4o-mini")]);
    let err = dispatcher(&registry, relay_client(&server.uri()))
        .dispatch(&conversation(), "summary", None)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::InvalidResponse { .. }));
    assert_eq!(err.body(), Some("{\"choices\":[]}"));
}

#[tokio::test]
async fn test_non_json_success_body() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(RELAY_GENERATE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>proxy error</html>"))
        .mount(&server)
        .await;

    let registry = registry_with(&[("summary", "openai", "gpt-4o-mini")]);
    let err = dispatcher(&registry, relay_client(&server.uri()))
        .dispatch(&conversation(), "summary", None)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "invalid_response");
}

#[tokio::test]
async fn test_missing_model_never_reaches_network() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("ok")))
        .expect(0)
        .mount(&server)
        .await;

    let registry = registry_with(&[("blank", "openai", "   ")]);
    let err = dispatcher(&registry, relay_client(&server.uri()))
        .dispatch(&conversation(), "blank", None)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Validation(_)));
}

#[tokio::test]
async fn test_unreachable_relay_is_transport_error() {
    // Nothing listens on the discard port.
    let registry = registry_with(&[("summary", "openai", "gpt-4o-mini")]);
    let err = dispatcher(&registry, relay_client("http://127.0.0.1:9"))
        .dispatch(&conversation(), "summary", None)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "transport");
    assert_eq!(err.status(), None);
}
