//! OpenAI-compatible client contract tests
//!
//! These tests verify the HTTP request format and error mapping of
//! `OpenAiCompatibleClient` against a mock server.

use lodestar::llm::{CompletionOptions, LanguageModel, OpenAiCompatibleClient, OpenAiConfig};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn completion(content: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "created": 1_760_000_000,
        "model": "gpt-test",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }]
    })
}

fn client(server: &MockServer, key: &str) -> OpenAiCompatibleClient {
    OpenAiCompatibleClient::new(OpenAiConfig::new(key, "gpt-test").with_base_url(server.uri()))
        .expect("client")
}

#[tokio::test]
async fn sends_single_user_message_without_streaming() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({
            "model": "gpt-test",
            "messages": [{"role": "user", "content": "Plan this"}],
            "stream": false,
            "max_tokens": 256
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("[\"q\"]")))
        .expect(1)
        .mount(&server)
        .await;

    let options = CompletionOptions::default().with_max_tokens(256);
    let reply = client(&server, "sk-test").complete("Plan this", &options).await;
    assert_eq!(reply.expect("completion"), "[\"q\"]");
}

#[tokio::test]
async fn empty_key_sends_no_authorization() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("ok")))
        .expect(1)
        .mount(&server)
        .await;

    let reply = client(&server, "")
        .complete("hello", &CompletionOptions::default())
        .await
        .expect("completion");
    assert_eq!(reply, "ok");

    let requests = server.received_requests().await.expect("recorded requests");
    assert!(requests[0].headers.get("authorization").is_none());
}

#[tokio::test]
async fn unauthorized_maps_to_authentication_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"error": {"message": "invalid api key"}})),
        )
        .mount(&server)
        .await;

    let err = client(&server, "bad")
        .complete("hello", &CompletionOptions::default())
        .await
        .expect_err("should fail");
    assert_eq!(err.to_string(), "LLM error: authentication failed: invalid api key");
}

#[tokio::test]
async fn rate_limit_is_reported() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
        .mount(&server)
        .await;

    let err = client(&server, "k")
        .complete("hello", &CompletionOptions::default())
        .await
        .expect_err("should fail");
    assert_eq!(err.to_string(), "LLM error: rate limited: slow down");
}

#[tokio::test]
async fn missing_content_is_an_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
        .mount(&server)
        .await;

    let err = client(&server, "k")
        .complete("hello", &CompletionOptions::default())
        .await
        .expect_err("should fail");
    assert!(err.to_string().contains("no content"));
}
