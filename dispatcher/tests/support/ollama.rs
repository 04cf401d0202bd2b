//! モックOllamaサーバーヘルパー
//!
//! `/api/generate` と `/api/tags` に応答するwiremockサーバーを提供します。

use serde_json::json;
use std::time::Duration;
use wiremock::{
    matchers::{body_partial_json, method, path},
    Mock, MockServer, ResponseTemplate,
};

/// モックOllamaサーバー
pub struct MockOllamaServer {
    pub server: MockServer,
    pub name: String,
}

#[allow(dead_code)] // 各テストモジュールで使うメソッドが異なる
impl MockOllamaServer {
    /// 起動して `/api/tags` をモック
    pub async fn start(name: &str) -> Self {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/tags"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "models": [
                    {"name": format!("{}-model:latest", name), "size": 4_000_000_000u64}
                ]
            })))
            .mount(&server)
            .await;

        Self {
            server,
            name: name.to_string(),
        }
    }

    /// 任意のプロンプトに `{name}:{reply}` で応答する
    pub async fn reply_all(&self, reply: &str) {
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(generate_body(&format!("{}:{}", self.name, reply), Duration::ZERO))
            .mount(&self.server)
            .await;
    }

    /// 指定プロンプトに `reply` で応答する（`delay` 後）
    pub async fn reply_to(&self, prompt: &str, reply: &str, delay: Duration) {
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .and(body_partial_json(json!({"prompt": prompt, "stream": false})))
            .respond_with(generate_body(reply, delay))
            .mount(&self.server)
            .await;
    }

    /// `/api/generate` に指定ステータスで応答する
    pub async fn fail_with(&self, status: u16) {
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(status).set_body_string("model not found"))
            .mount(&self.server)
            .await;
    }

    /// ベースURL
    pub fn uri(&self) -> String {
        self.server.uri()
    }

    /// `/api/generate` の受信件数
    pub async fn generate_calls(&self) -> usize {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|req| req.url.path() == "/api/generate")
            .count()
    }
}

fn generate_body(reply: &str, delay: Duration) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_json(json!({
            "model": "llama3",
            "created_at": "2024-05-01T12:30:45.123456Z",
            "response": reply,
            "done": true,
            "done_reason": "stop",
            "eval_count": 8
        }))
        .set_delay(delay)
}
