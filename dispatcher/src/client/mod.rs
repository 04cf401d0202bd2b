//! Ollamaクライアント
//!
//! ワーカー・ファンアウトが依存するリモート呼び出しの境界。
//! 非同期版は [`Machine`](crate::machine::Machine) が、ブロッキング版は
//! [`DistributedOllamaClients`](crate::fanout::DistributedOllamaClients) が使用する。

mod blocking;
mod ollama;

pub use blocking::BlockingOllamaClient;
pub use ollama::OllamaClient;

use async_trait::async_trait;
use ollama_dispatch_common::{
    error::{DispatchError, DispatchResult},
    protocol::{GenerateRequest, GenerateResponse, ListResponse},
    types::Endpoint,
};
use serde::Serialize;

/// 非同期Generateクライアント
#[async_trait]
pub trait GenerateClient: Send + Sync {
    /// 接続先エンドポイント
    fn endpoint(&self) -> &Endpoint;

    /// プロンプトを送信し、生成完了まで待つ
    async fn generate(&self, request: &GenerateRequest) -> DispatchResult<GenerateResponse>;

    /// ロード可能なモデル一覧を取得
    async fn list(&self) -> DispatchResult<ListResponse>;
}

/// ブロッキングクライアント（スレッドごとに1呼び出し）
pub trait BlockingClient: Send + Sync {
    /// 接続先エンドポイント
    fn endpoint(&self) -> &Endpoint;

    /// プロンプトを送信し、生成完了まで待つ
    fn generate(&self, request: &GenerateRequest) -> DispatchResult<GenerateResponse>;

    /// ロード可能なモデル一覧を取得
    fn list(&self) -> DispatchResult<ListResponse>;
}

/// `/api/generate` に送る本文
///
/// ストリーミング応答は扱わないため `stream` は常に `false`。
#[derive(Serialize)]
struct WireGenerateRequest<'a> {
    #[serde(flatten)]
    request: &'a GenerateRequest,
    stream: bool,
}

impl<'a> WireGenerateRequest<'a> {
    fn new(request: &'a GenerateRequest) -> Self {
        Self {
            request,
            stream: false,
        }
    }
}

/// リクエスト側のアノテーションをレスポンスへ引き継ぐ
fn carry_annotations(request: &GenerateRequest, mut response: GenerateResponse) -> GenerateResponse {
    let annotations = &mut response.annotations;
    if annotations.question_id.is_none() {
        annotations.question_id = request.annotations.question_id.clone();
    }
    if annotations.subject.is_none() {
        annotations.subject = request.annotations.subject.clone();
    }
    if annotations.run_on.is_none() {
        annotations.run_on = request.annotations.run_on.clone();
    }
    response
}

fn map_send_error(context: &str, e: reqwest::Error) -> DispatchError {
    if e.is_timeout() {
        DispatchError::Timeout(format!("{}: {}", context, e))
    } else {
        DispatchError::Http(format!("{}: {}", context, e))
    }
}
