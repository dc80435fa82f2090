//! Chat-completion backends against a mock OpenAI-style server.

use secrecy::SecretString;
use syntopical_llm::{build_backend, BackendConfig, BackendKind, LlmError, LlmRequest, Message};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn completion(content: &str) -> serde_json::Value {
    serde_json::json!({
        "id": "chatcmpl-1",
        "model": "gpt-3.5-turbo-0125",
        "choices": [{"index": 0, "message": {"role": "assistant", "content": content}}],
        "usage": {"prompt_tokens": 20, "completion_tokens": 5}
    })
}

#[tokio::test]
async fn test_openai_backend_sends_key_and_parameters() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(serde_json::json!({
            "model": "gpt-3.5-turbo",
            "max_tokens": 1000,
            "messages": [
                {"role": "system", "content": "ctx"},
                {"role": "user", "content": "question"}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("an answer")))
        .expect(1)
        .mount(&server)
        .await;

    let backend = build_backend(&BackendConfig {
        kind: BackendKind::OpenAi,
        base_url: Some(server.uri()),
        api_key: Some(SecretString::from("sk-test")),
        ..Default::default()
    })
    .unwrap();

    let resp = backend
        .complete(LlmRequest::new(vec![Message::system("ctx"), Message::user("question")]))
        .await
        .unwrap();
    assert_eq!(resp.content, "an answer");
    assert_eq!(resp.prompt_tokens, 20);
}

#[tokio::test]
async fn test_api_error_is_surfaced() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "error": {"message": "Incorrect API key provided", "type": "invalid_request_error"}
        })))
        .mount(&server)
        .await;

    let backend = build_backend(&BackendConfig {
        base_url: Some(server.uri()),
        api_key: Some(SecretString::from("sk-wrong")),
        ..Default::default()
    })
    .unwrap();

    let err = backend
        .complete(LlmRequest::new(vec![Message::user("hi")]))
        .await
        .unwrap_err();
    match err {
        LlmError::ApiError { status, message } => {
            assert_eq!(status, 401);
            assert_eq!(message, "Incorrect API key provided");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_compatible_backend_without_key() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("local answer")))
        .mount(&server)
        .await;

    let backend = build_backend(&BackendConfig {
        kind: BackendKind::OpenAiCompatible,
        model: "mistral".to_string(),
        base_url: Some(server.uri()),
        api_key: None,
    })
    .unwrap();

    let resp = backend
        .complete(LlmRequest::new(vec![Message::user("hi")]))
        .await
        .unwrap();
    assert_eq!(resp.content, "local answer");
    assert!(backend.is_local());
}
