//! ブロッキングOllamaクライアント（reqwest::blocking）
//!
//! ファンアウトの各スレッドから呼び出される。非同期ランタイムのワーカースレッド上では
//! 作成・破棄できないため、`spawn_blocking` や通常のスレッドから使うこと。

use super::{carry_annotations, map_send_error, BlockingClient, WireGenerateRequest};
use ollama_dispatch_common::{
    error::{DispatchError, DispatchResult},
    protocol::{GenerateRequest, GenerateResponse, ListResponse},
    types::Endpoint,
};
use reqwest::blocking::Client;
use std::time::Duration;
use tracing::debug;

/// ブロッキングOllamaクライアント
#[derive(Debug, Clone)]
pub struct BlockingOllamaClient {
    endpoint: Endpoint,
    http_client: Client,
}

impl BlockingOllamaClient {
    /// 新しいBlockingOllamaClientを作成
    ///
    /// `timeout` が `None` の場合はタイムアウトしない。
    pub fn new(endpoint: Endpoint, timeout: Option<Duration>) -> DispatchResult<Self> {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DispatchError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            endpoint,
            http_client,
        })
    }
}

impl BlockingClient for BlockingOllamaClient {
    fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    fn generate(&self, request: &GenerateRequest) -> DispatchResult<GenerateResponse> {
        let url = format!("{}/api/generate", self.endpoint.base_url());
        debug!(endpoint = %self.endpoint.name, model = %request.model, "Sending generate request");

        let response = self
            .http_client
            .post(&url)
            .json(&WireGenerateRequest::new(request))
            .send()
            .map_err(|e| map_send_error("Failed to send generate request", e))?;

        if !response.status().is_success() {
            return Err(DispatchError::Http(format!(
                "Ollama returned error: {}",
                response.status()
            )));
        }

        let generate_response = response
            .json::<GenerateResponse>()
            .map_err(|e| DispatchError::Http(format!("Failed to parse generate response: {}", e)))?;

        Ok(carry_annotations(request, generate_response))
    }

    fn list(&self) -> DispatchResult<ListResponse> {
        let url = format!("{}/api/tags", self.endpoint.base_url());
        debug!(endpoint = %self.endpoint.name, "Fetching model list");

        let response = self
            .http_client
            .get(&url)
            .send()
            .map_err(|e| map_send_error("Failed to fetch model list", e))?;

        if !response.status().is_success() {
            return Err(DispatchError::Http(format!(
                "Failed to fetch models: HTTP {}",
                response.status()
            )));
        }

        response
            .json::<ListResponse>()
            .map_err(|e| DispatchError::Http(format!("Failed to parse models response: {}", e)))
    }
}
