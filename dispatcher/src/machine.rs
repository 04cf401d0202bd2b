//! マシン（ワーカー）
//!
//! 1つのリモートエンドポイントを担当し、同時に1タスクだけを実行する。

use crate::client::{GenerateClient, OllamaClient};
use async_trait::async_trait;
use ollama_dispatch_common::{
    config::DispatchConfig,
    error::{DispatchError, DispatchResult},
    protocol::{GenerateRequest, GenerateResponse},
    types::Endpoint,
};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

/// タスクを1件ずつ実行するワーカー
///
/// `execute` は元のインデックスとレスポンスの組を返す。
/// 実行中に別のタスクを渡してはならない（[`Orchestrator`](crate::orchestrator::Orchestrator)
/// はワーカーごとに1つの消費ループを持つことでこれを保証する）。
#[async_trait]
pub trait Worker: Send + Sync {
    /// タスク型
    type Task: Send;
    /// レスポンス型
    type Response: Send;

    /// ワーカー名
    fn name(&self) -> &str;

    /// タスク実行中か
    fn is_busy(&self) -> bool;

    /// タスクを実行する。リモート呼び出しの失敗はそのまま返す（リトライしない）
    ///
    /// 実行中に呼ばれた場合は `Internal` エラー。
    async fn execute(
        &self,
        index: usize,
        task: Self::Task,
    ) -> DispatchResult<(usize, Self::Response)>;
}

/// 実行中フラグを立て、スコープを抜けるときに下ろす
struct BusyGuard<'a>(&'a AtomicBool);

impl<'a> BusyGuard<'a> {
    /// フラグが既に立っている場合は取得できない
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Ollamaエンドポイントを担当するマシン
pub struct Machine<C: GenerateClient = OllamaClient> {
    name: String,
    client: C,
    busy: AtomicBool,
}

impl<C: GenerateClient> Machine<C> {
    /// クライアントを指定して作成
    pub fn with_client(name: impl Into<String>, client: C) -> Self {
        Self {
            name: name.into(),
            client,
            busy: AtomicBool::new(false),
        }
    }

    /// 接続先エンドポイント
    pub fn endpoint(&self) -> &Endpoint {
        self.client.endpoint()
    }

    /// クライアント
    pub fn client(&self) -> &C {
        &self.client
    }
}

impl Machine<OllamaClient> {
    /// 設定のエンドポイントから作成（タイムアウトは設定に従う）
    pub fn from_endpoint(endpoint: &Endpoint, config: &DispatchConfig) -> DispatchResult<Self> {
        let client = OllamaClient::new(endpoint.clone(), config.request_timeout())?;
        Ok(Self::with_client(endpoint.name.clone(), client))
    }
}

#[async_trait]
impl<C: GenerateClient> Worker for Machine<C> {
    type Task = GenerateRequest;
    type Response = GenerateResponse;

    fn name(&self) -> &str {
        &self.name
    }

    fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    async fn execute(
        &self,
        index: usize,
        task: GenerateRequest,
    ) -> DispatchResult<(usize, GenerateResponse)> {
        let _busy = BusyGuard::acquire(&self.busy).ok_or_else(|| {
            DispatchError::Internal(format!("Machine {} is already executing a task", self.name))
        })?;
        debug!(machine = %self.name, index, model = %task.model, "Executing task");

        let response = self.client.generate(&task).await?;
        Ok((index, response))
    }
}

impl<C: GenerateClient> fmt::Display for Machine<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Machine({}, {}, is_busy={})",
            self.name,
            self.endpoint().host_port(),
            self.is_busy()
        )
    }
}

impl<C: GenerateClient> fmt::Debug for Machine<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
