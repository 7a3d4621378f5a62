//! HTTP chat transport integration tests
//!
//! Exercises `HttpTransport` against a `wiremock` mock server.
//!
//! Streamed bodies use `set_body_raw(bytes, "text/event-stream")` so the
//! response carries the same content type a real endpoint sends.

mod common;

use futures::StreamExt;
use wiremock::matchers::{body_partial_json, header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use persona_chat::chat::Message;
use persona_chat::transport::{ChatRequest, ChatTransport, HttpTransport};
use persona_chat::{Persona, PersonaChatError};

use common::{endpoint, sse_body};

fn request() -> ChatRequest {
    let mut persona = Persona::new("Nova", "nova");
    persona.badge = Some("verified".to_string());
    ChatRequest::new(&[Message::user("hi")], &persona)
}

async fn collect_body(transport: &HttpTransport) -> String {
    let mut stream = transport.open(&request()).await.expect("open succeeds");
    let mut bytes = Vec::new();
    while let Some(chunk) = stream.next().await {
        bytes.extend_from_slice(&chunk.expect("chunk"));
    }
    String::from_utf8(bytes).expect("utf-8 body")
}

#[tokio::test]
async fn test_open_sends_credentials_and_payload() {
    let server = MockServer::start().await;
    let body = sse_body(&["Hel", "lo"]);

    Mock::given(method("POST"))
        .and(path("/chat"))
        .and(header("authorization", "Bearer test-key"))
        .and(header("accept", "text/event-stream"))
        .and(body_partial_json(serde_json::json!({
            "messages": [{ "role": "user", "content": "hi" }],
            "name": "Nova",
            "handle": "nova",
            "badge": "verified"
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(body.as_bytes().to_vec(), "text/event-stream"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let transport = HttpTransport::new(&endpoint(&format!("{}/chat", server.uri()))).unwrap();
    assert_eq!(collect_body(&transport).await, body);
}

#[tokio::test]
async fn test_open_without_api_key_omits_authorization() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(header_exists("authorization"))
        .respond_with(ResponseTemplate::new(401))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(b"data: [DONE]\n".to_vec(), "text/event-stream"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let mut config = endpoint(&server.uri());
    config.api_key = None;
    let transport = HttpTransport::new(&config).unwrap();
    assert_eq!(collect_body(&transport).await, "data: [DONE]\n");
}

#[tokio::test]
async fn test_error_status_uses_json_error_message() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(429).set_body_json(serde_json::json!({ "error": "rate limited" })),
        )
        .mount(&server)
        .await;

    let transport = HttpTransport::new(&endpoint(&server.uri())).unwrap();
    let err = transport.open(&request()).await.err().expect("open fails");

    match err.downcast_ref::<PersonaChatError>() {
        Some(PersonaChatError::Api { status, message }) => {
            assert_eq!(*status, 429);
            assert_eq!(message, "rate limited");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_error_status_without_json_falls_back_to_status_line() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream unavailable"))
        .mount(&server)
        .await;

    let transport = HttpTransport::new(&endpoint(&server.uri())).unwrap();
    let err = transport.open(&request()).await.err().expect("open fails");

    assert_eq!(
        err.to_string(),
        "API error (503): HTTP 503 Service Unavailable"
    );
}

#[tokio::test]
async fn test_no_content_is_missing_body() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let transport = HttpTransport::new(&endpoint(&server.uri())).unwrap();
    let err = transport.open(&request()).await.err().expect("open fails");

    assert!(matches!(
        err.downcast_ref::<PersonaChatError>(),
        Some(PersonaChatError::MissingBody)
    ));
}

#[tokio::test]
async fn test_unreachable_endpoint_is_transport_error() {
    let transport = HttpTransport::new(&endpoint("http://127.0.0.1:9/chat")).unwrap();
    let err = transport.open(&request()).await.err().expect("open fails");

    assert!(matches!(
        err.downcast_ref::<PersonaChatError>(),
        Some(PersonaChatError::Transport(_))
    ));
}

#[test]
fn test_invalid_url_is_config_error() {
    let err = HttpTransport::new(&endpoint("not a url")).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<PersonaChatError>(),
        Some(PersonaChatError::Config(_))
    ));
}
