//! オーケストレーター
//!
//! 共有FIFOキューからタスクを取り出し、固定数のワーカーへ動的に割り当てる。
//! ワーカーへの事前割り当ては行わず、空いたワーカーが次のタスクを取る。
//! 結果は入力と同じ順序で返す。
//! 同じオーケストレーターでの `run` は直列化され、ワーカーが2つのループに共有されることはない。

use crate::client::OllamaClient;
use crate::hooks::{CompletionHook, JsonDump, RecordRunOn};
use crate::machine::{Machine, Worker};
use crate::progress::{self, NoProgress, ProgressReporter};
use async_trait::async_trait;
use futures::future::try_join_all;
use ollama_dispatch_common::{
    config::DispatchConfig,
    error::{DispatchError, DispatchResult},
};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info};

/// タスク列をワーカー群に分散し、入力順に結果を返す
#[async_trait]
pub trait Dispatcher: Send + Sync {
    /// タスク型
    type Task: Send;
    /// レスポンス型
    type Response: Send;

    /// 全タスクを実行する。`output[i]` は `tasks[i]` のレスポンス
    async fn run(&self, tasks: Vec<Self::Task>) -> DispatchResult<Vec<Self::Response>>;
}

type TaskQueue<T> = Mutex<mpsc::UnboundedReceiver<(usize, T)>>;

/// 共有キュー方式のディスパッチャー
pub struct Orchestrator<W: Worker> {
    machines: Vec<W>,
    hooks: Vec<Box<dyn CompletionHook<W::Response>>>,
    progress: Box<dyn ProgressReporter>,
    completed: AtomicUsize,
    run_lock: Mutex<()>,
}

impl<W: Worker> Orchestrator<W> {
    /// ワーカー群を指定して作成（フック・進捗表示なし）
    pub fn new(machines: Vec<W>) -> Self {
        Self {
            machines,
            hooks: Vec::new(),
            progress: Box::new(NoProgress),
            completed: AtomicUsize::new(0),
            run_lock: Mutex::new(()),
        }
    }

    /// 完了フックを追加（登録順に呼ばれる）
    pub fn with_hook(mut self, hook: impl CompletionHook<W::Response> + 'static) -> Self {
        self.hooks.push(Box::new(hook));
        self
    }

    /// 進捗通知先を設定
    pub fn with_progress(mut self, progress: Box<dyn ProgressReporter>) -> Self {
        self.progress = progress;
        self
    }

    /// ワーカー一覧
    pub fn machines(&self) -> &[W] {
        &self.machines
    }

    /// これまでに完了したタスク数（単調増加）
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    /// 1ワーカー分の消費ループ
    ///
    /// キューが閉じられ、かつ空になったら終了する。
    async fn worker_loop(
        &self,
        machine: &W,
        queue: &TaskQueue<W::Task>,
    ) -> DispatchResult<Vec<(usize, W::Response)>> {
        let mut finished = Vec::new();

        loop {
            let next = queue.lock().await.recv().await;
            let Some((index, task)) = next else {
                break;
            };

            let (index, mut response) = machine.execute(index, task).await?;
            for hook in &self.hooks {
                hook.on_complete(machine.name(), index, &mut response).await;
            }

            self.completed.fetch_add(1, Ordering::SeqCst);
            self.progress.advance();
            finished.push((index, response));
        }

        debug!(machine = machine.name(), processed = finished.len(), "Worker loop finished");
        Ok(finished)
    }

    /// 結果スロットへ配置する。未書き込み・二重書き込みは内部エラー
    fn place(
        total: usize,
        batches: Vec<Vec<(usize, W::Response)>>,
    ) -> DispatchResult<Vec<W::Response>> {
        let mut slots: Vec<Option<W::Response>> = (0..total).map(|_| None).collect();

        for (index, response) in batches.into_iter().flatten() {
            let slot = slots.get_mut(index).ok_or_else(|| {
                DispatchError::Internal(format!("Result index {} out of range ({})", index, total))
            })?;
            if slot.is_some() {
                return Err(DispatchError::Internal(format!(
                    "Result slot {} written twice",
                    index
                )));
            }
            *slot = Some(response);
        }

        slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| {
                slot.ok_or_else(|| {
                    DispatchError::Internal(format!("Result slot {} was never written", index))
                })
            })
            .collect()
    }
}

impl Orchestrator<Machine<OllamaClient>> {
    /// 設定のエンドポイントごとにマシンを作成
    ///
    /// `run_on` の記録は常に、JSONダンプは `dump_dir` 指定時のみ有効。
    pub fn from_config(config: &DispatchConfig) -> DispatchResult<Self> {
        config.validate()?;

        let machines = config
            .endpoints
            .iter()
            .map(|endpoint| Machine::from_endpoint(endpoint, config))
            .collect::<DispatchResult<Vec<_>>>()?;

        let mut orchestrator = Self::new(machines)
            .with_hook(RecordRunOn)
            .with_progress(progress::reporter(config.show_progress));

        if let Some(dir) = &config.dump_dir {
            orchestrator = orchestrator.with_hook(JsonDump::new(dir)?);
        }

        Ok(orchestrator)
    }
}

#[async_trait]
impl<W: Worker> Dispatcher for Orchestrator<W> {
    type Task = W::Task;
    type Response = W::Response;

    async fn run(&self, tasks: Vec<W::Task>) -> DispatchResult<Vec<W::Response>> {
        let total = tasks.len();
        if total == 0 {
            return Ok(Vec::new());
        }
        if self.machines.is_empty() {
            return Err(DispatchError::NoWorkers);
        }

        // 実行中の別runが終わるまで待つ
        let _running = self.run_lock.lock().await;
        info!(tasks = total, workers = self.machines.len(), "Dispatching tasks");

        let (tx, rx) = mpsc::unbounded_channel();
        for item in tasks.into_iter().enumerate() {
            tx.send(item)
                .map_err(|_| DispatchError::Internal("Task queue closed early".to_string()))?;
        }
        // 送信側を閉じることで、キューが空になった時点で各ループが終了する
        drop(tx);
        let queue: TaskQueue<W::Task> = Mutex::new(rx);

        self.progress.start(total as u64);
        let loops: Vec<_> = self
            .machines
            .iter()
            .map(|machine| self.worker_loop(machine, &queue))
            .collect();
        let outcome = try_join_all(loops).await;
        self.progress.finish();

        let results = Self::place(total, outcome?)?;
        info!(tasks = total, "All tasks completed");
        Ok(results)
    }
}
