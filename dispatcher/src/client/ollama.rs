//! 非同期Ollamaクライアント（reqwest）

use super::{carry_annotations, map_send_error, GenerateClient, WireGenerateRequest};
use async_trait::async_trait;
use ollama_dispatch_common::{
    error::{DispatchError, DispatchResult},
    protocol::{GenerateRequest, GenerateResponse, ListResponse},
    types::Endpoint,
};
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// 非同期Ollamaクライアント
#[derive(Debug, Clone)]
pub struct OllamaClient {
    endpoint: Endpoint,
    http_client: Client,
}

impl OllamaClient {
    /// 新しいOllamaClientを作成
    ///
    /// `timeout` が `None` の場合はタイムアウトしない。
    pub fn new(endpoint: Endpoint, timeout: Option<Duration>) -> DispatchResult<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http_client = builder
            .build()
            .map_err(|e| DispatchError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            endpoint,
            http_client,
        })
    }
}

#[async_trait]
impl GenerateClient for OllamaClient {
    fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    async fn generate(&self, request: &GenerateRequest) -> DispatchResult<GenerateResponse> {
        let url = format!("{}/api/generate", self.endpoint.base_url());
        debug!(endpoint = %self.endpoint.name, model = %request.model, "Sending generate request");

        let response = self
            .http_client
            .post(&url)
            .json(&WireGenerateRequest::new(request))
            .send()
            .await
            .map_err(|e| map_send_error("Failed to send generate request", e))?;

        if !response.status().is_success() {
            return Err(DispatchError::Http(format!(
                "Ollama returned error: {}",
                response.status()
            )));
        }

        let generate_response = response
            .json::<GenerateResponse>()
            .await
            .map_err(|e| DispatchError::Http(format!("Failed to parse generate response: {}", e)))?;

        Ok(carry_annotations(request, generate_response))
    }

    async fn list(&self) -> DispatchResult<ListResponse> {
        let url = format!("{}/api/tags", self.endpoint.base_url());
        debug!(endpoint = %self.endpoint.name, "Fetching model list");

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| map_send_error("Failed to fetch model list", e))?;

        if !response.status().is_success() {
            return Err(DispatchError::Http(format!(
                "Failed to fetch models: HTTP {}",
                response.status()
            )));
        }

        response
            .json::<ListResponse>()
            .await
            .map_err(|e| DispatchError::Http(format!("Failed to parse models response: {}", e)))
    }
}
