//! タスク完了時のフック
//!
//! ディスパッチャーの本処理とは独立した付随処理。
//! フック内の失敗はログに残すだけで、実行全体を止めない。

use async_trait::async_trait;
use ollama_dispatch_common::{error::DispatchResult, protocol::GenerateResponse};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// タスク完了時に呼ばれるフック
///
/// ワーカーの消費ループ上で呼ばれるため、I/Oは非同期で行うこと。
#[async_trait]
pub trait CompletionHook<R: Send>: Send + Sync {
    /// `worker` が `index` 番目のタスクを完了した
    async fn on_complete(&self, worker: &str, index: usize, response: &mut R);
}

/// 処理したワーカー名を `annotations.run_on` に記録する
#[derive(Debug, Default, Clone, Copy)]
pub struct RecordRunOn;

#[async_trait]
impl CompletionHook<GenerateResponse> for RecordRunOn {
    async fn on_complete(&self, worker: &str, _index: usize, response: &mut GenerateResponse) {
        response.annotations.run_on = Some(worker.to_string());
    }
}

/// レスポンスを1件ずつJSONファイルへ書き出す
///
/// ファイル名は `{question_id}-{subject}_{timestamp}.json`。
/// `timestamp` は `created_at` の `:` を `_`、`.` を `__` に置き換えたもの。
/// 各部分のパス区切り文字は `_` に置き換え、出力先ディレクトリの外には書かない。
#[derive(Debug, Clone)]
pub struct JsonDump {
    dir: PathBuf,
}

impl JsonDump {
    /// 出力先ディレクトリを指定して作成（存在しなければ作成する）
    pub fn new(dir: impl Into<PathBuf>) -> DispatchResult<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// 出力先ディレクトリ
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// レスポンスの出力パス
    pub fn dump_path(&self, response: &GenerateResponse) -> PathBuf {
        let annotations = &response.annotations;
        let timestamp = response.created_at.replace(':', "_").replace('.', "__");
        self.dir.join(format!(
            "{}-{}_{}.json",
            file_name_part(annotations.question_id_or_empty()),
            file_name_part(annotations.subject_or_empty()),
            file_name_part(&timestamp)
        ))
    }

    async fn write(&self, path: &Path, response: &GenerateResponse) -> DispatchResult<()> {
        let body = serde_json::to_vec_pretty(response)?;
        tokio::fs::write(path, body).await?;
        Ok(())
    }
}

fn file_name_part(value: &str) -> String {
    value.replace(['/', '\\'], "_")
}

#[async_trait]
impl CompletionHook<GenerateResponse> for JsonDump {
    async fn on_complete(&self, worker: &str, index: usize, response: &mut GenerateResponse) {
        let path = self.dump_path(response);
        match self.write(&path, response).await {
            Ok(()) => debug!(worker, index, path = %path.display(), "Response dumped"),
            Err(e) => warn!(worker, index, path = %path.display(), error = %e, "Failed to dump response"),
        }
    }
}
