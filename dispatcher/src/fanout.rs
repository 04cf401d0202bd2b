//! 全エンドポイントへの一斉送信
//!
//! 同じ操作を登録済みの全エンドポイントへ、エンドポイントごとに1スレッドで同時に送る。
//! 結果は完了順に受け取り、登録順に並べて返す。

use crate::client::{BlockingClient, BlockingOllamaClient};
use crate::progress::{self, NoProgress, ProgressReporter};
use ollama_dispatch_common::{
    config::DispatchConfig,
    error::{DispatchError, DispatchResult},
    protocol::{GenerateRequest, GenerateResponse, ListResponse},
    types::Endpoint,
};
use std::sync::mpsc;
use std::thread;
use tracing::{info, warn};

/// 関数群を同じ引数で並列実行する
///
/// 関数ごとに1スレッドを起動し、全スレッドの終了を待つ。
/// 戻り値は `funcs` と同じ順序。パニックしたスレッドがあれば `Internal` エラー。
pub fn thread_apply<A, T, F>(
    funcs: Vec<F>,
    arg: &A,
    progress: &dyn ProgressReporter,
) -> DispatchResult<Vec<T>>
where
    A: Sync + ?Sized,
    T: Send,
    F: FnOnce(&A) -> T + Send,
{
    let total = funcs.len();
    let mut slots: Vec<Option<T>> = (0..total).map(|_| None).collect();
    progress.start(total as u64);

    let panicked = thread::scope(|scope| {
        let (tx, rx) = mpsc::channel();

        let handles: Vec<_> = funcs
            .into_iter()
            .enumerate()
            .map(|(idx, func)| {
                let tx = tx.clone();
                scope.spawn(move || {
                    let result = func(arg);
                    // 受信側は全送信側が閉じるまで待つため、送信は失敗しない
                    let _ = tx.send((idx, result));
                })
            })
            .collect();
        drop(tx);

        for (idx, result) in rx {
            slots[idx] = Some(result);
            progress.advance();
        }

        handles
            .into_iter()
            .enumerate()
            .filter_map(|(idx, handle)| handle.join().err().map(|_| idx))
            .collect::<Vec<_>>()
    });
    progress.finish();

    if let Some(idx) = panicked.first() {
        return Err(DispatchError::Internal(format!(
            "Fan-out thread {} panicked",
            idx
        )));
    }

    slots
        .into_iter()
        .enumerate()
        .map(|(idx, slot)| {
            slot.ok_or_else(|| {
                DispatchError::Internal(format!("Fan-out thread {} returned no result", idx))
            })
        })
        .collect()
}

/// 複数Ollamaインスタンスへの一斉送信クライアント
pub struct DistributedOllamaClients<C: BlockingClient = BlockingOllamaClient> {
    clients: Vec<C>,
    progress: Box<dyn ProgressReporter>,
}

impl DistributedOllamaClients<BlockingOllamaClient> {
    /// URI一覧から作成（タイムアウトなし）
    pub fn new<S: AsRef<str>>(uris: &[S]) -> DispatchResult<Self> {
        let clients = uris
            .iter()
            .map(|uri| {
                let uri = uri.as_ref();
                BlockingOllamaClient::new(Endpoint::new(uri, uri), None)
            })
            .collect::<DispatchResult<Vec<_>>>()?;
        Ok(Self::with_clients(clients))
    }

    /// 設定のエンドポイントから作成
    pub fn from_config(config: &DispatchConfig) -> DispatchResult<Self> {
        config.validate()?;
        let clients = config
            .endpoints
            .iter()
            .map(|endpoint| BlockingOllamaClient::new(endpoint.clone(), config.request_timeout()))
            .collect::<DispatchResult<Vec<_>>>()?;
        Ok(Self::with_clients(clients).with_progress(progress::reporter(config.show_progress)))
    }
}

impl<C: BlockingClient> DistributedOllamaClients<C> {
    /// クライアントを指定して作成（進捗表示なし）
    pub fn with_clients(clients: Vec<C>) -> Self {
        Self {
            clients,
            progress: Box::new(NoProgress),
        }
    }

    /// 進捗通知先を設定
    pub fn with_progress(mut self, progress: Box<dyn ProgressReporter>) -> Self {
        self.progress = progress;
        self
    }

    /// 登録済みクライアント（登録順）
    pub fn clients(&self) -> &[C] {
        &self.clients
    }

    /// 登録済みエンドポイント（登録順）
    pub fn endpoints(&self) -> Vec<&Endpoint> {
        self.clients.iter().map(|c| c.endpoint()).collect()
    }

    /// 同じ操作を全クライアントに対して実行する
    ///
    /// いずれかが失敗した場合、全スレッドの終了後に登録順で最初のエラーを返す。
    pub fn broadcast<T, F>(&self, op: F) -> DispatchResult<Vec<T>>
    where
        T: Send,
        F: Fn(&C) -> DispatchResult<T> + Sync,
    {
        info!(endpoints = self.clients.len(), "Broadcasting to all endpoints");

        let funcs: Vec<_> = self
            .clients
            .iter()
            .map(|client| move |op: &F| op(client))
            .collect();

        let results = thread_apply(funcs, &op, self.progress.as_ref())?;
        self.collect(results)
    }

    /// 同じGenerateリクエストを全エンドポイントへ送る
    pub fn generate(&self, request: &GenerateRequest) -> DispatchResult<Vec<GenerateResponse>> {
        self.broadcast(|client| client.generate(request))
    }

    /// 全エンドポイントのモデル一覧を取得
    pub fn list(&self) -> DispatchResult<Vec<ListResponse>> {
        self.broadcast(|client| client.list())
    }

    /// エンドポイントごとに異なるリクエストを送る
    ///
    /// `requests[i]` は `i` 番目のエンドポイントへ送られる。
    /// 件数がエンドポイント数と一致しない場合は、何も送信せずにエラーを返す。
    pub fn generates(
        &self,
        requests: Vec<GenerateRequest>,
    ) -> DispatchResult<Vec<GenerateResponse>> {
        if requests.len() != self.clients.len() {
            return Err(DispatchError::ArgumentCountMismatch {
                expected: self.clients.len(),
                actual: requests.len(),
            });
        }

        info!(endpoints = self.clients.len(), "Sending per-endpoint requests");

        let funcs: Vec<_> = self
            .clients
            .iter()
            .zip(requests)
            .map(|(client, request)| move |_: &()| client.generate(&request))
            .collect();

        let results = thread_apply(funcs, &(), self.progress.as_ref())?;
        self.collect(results)
    }

    fn collect<T>(&self, results: Vec<DispatchResult<T>>) -> DispatchResult<Vec<T>> {
        for (client, result) in self.clients.iter().zip(&results) {
            if let Err(e) = result {
                warn!(endpoint = %client.endpoint().name, error = %e, "Endpoint call failed");
            }
        }
        results.into_iter().collect()
    }
}
