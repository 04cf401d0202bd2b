//! Integration Test: Ollamaクライアント
//!
//! `/api/generate`・`/api/tags` への送受信とエラー変換の検証

use std::time::Duration;

use ollama_dispatch::client::{GenerateClient, OllamaClient};
use ollama_dispatch::{DispatchError, Endpoint, GenerateRequest, ResponseAnnotations};

use crate::support::ollama::MockOllamaServer;

fn client_for(mock: &MockOllamaServer, timeout: Option<Duration>) -> OllamaClient {
    OllamaClient::new(Endpoint::new(mock.name.clone(), mock.uri()), timeout).unwrap()
}

#[tokio::test]
async fn test_generate_sends_non_streaming_request_and_carries_annotations() {
    let mock = MockOllamaServer::start("gpu-a").await;
    mock.reply_to("What is Rust?", "A systems language", Duration::ZERO)
        .await;
    let client = client_for(&mock, None);

    let request = GenerateRequest::new("llama3", "What is Rust?")
        .with_annotations(ResponseAnnotations::tagged("q1", "rust"));
    let response = client.generate(&request).await.unwrap();

    assert_eq!(response.response, "A systems language");
    assert!(response.done);
    assert_eq!(response.annotations.question_id_or_empty(), "q1");
    assert_eq!(response.annotations.subject_or_empty(), "rust");
    assert_eq!(mock.generate_calls().await, 1);
}

#[tokio::test]
async fn test_generate_error_status_is_http_error() {
    let mock = MockOllamaServer::start("gpu-a").await;
    mock.fail_with(404).await;
    let client = client_for(&mock, None);

    let err = client
        .generate(&GenerateRequest::new("missing", "hi"))
        .await
        .unwrap_err();

    assert!(matches!(err, DispatchError::Http(msg) if msg.contains("404")));
}

#[tokio::test]
async fn test_generate_malformed_body_is_http_error() {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, ResponseTemplate};

    let mock = MockOllamaServer::start("gpu-a").await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&mock.server)
        .await;
    let client = client_for(&mock, None);

    let err = client
        .generate(&GenerateRequest::new("llama3", "hi"))
        .await
        .unwrap_err();

    assert!(matches!(err, DispatchError::Http(msg) if msg.starts_with("Failed to parse")));
}

#[tokio::test]
async fn test_generate_timeout() {
    let mock = MockOllamaServer::start("gpu-a").await;
    mock.reply_to("slow", "late", Duration::from_secs(2)).await;
    let client = client_for(&mock, Some(Duration::from_millis(200)));

    let err = client
        .generate(&GenerateRequest::new("llama3", "slow"))
        .await
        .unwrap_err();

    assert!(matches!(err, DispatchError::Timeout(_)));
}

#[tokio::test]
async fn test_connection_refused_is_http_error() {
    let client = OllamaClient::new(Endpoint::new("down", "http://127.0.0.1:1"), None).unwrap();

    let err = client
        .generate(&GenerateRequest::new("llama3", "hi"))
        .await
        .unwrap_err();

    assert!(matches!(err, DispatchError::Http(_)));
}

#[tokio::test]
async fn test_list_models() {
    let mock = MockOllamaServer::start("gpu-b").await;
    let client = client_for(&mock, None);

    let list = client.list().await.unwrap();

    assert_eq!(list.names(), vec!["gpu-b-model:latest"]);
    assert_eq!(list.models[0].size, 4_000_000_000);
}
