//! Ollama Dispatch
//!
//! 複数Ollamaインスタンスへプロンプトを分散・一斉送信するクライアント層

#![warn(missing_docs)]

/// Ollamaクライアント（非同期・ブロッキング）
pub mod client;

/// マシン（1エンドポイントを担当するワーカー）
pub mod machine;

/// オーケストレーター（共有キューによるタスク分散）
pub mod orchestrator;

/// 全エンドポイントへの一斉送信
pub mod fanout;

/// タスク完了時のフック（アノテーション付与・JSONダンプ）
pub mod hooks;

/// 進捗表示
pub mod progress;

/// ロギング初期化ユーティリティ
pub mod logging;

pub use ollama_dispatch_common::{
    config::DispatchConfig,
    error::{DispatchError, DispatchResult},
    protocol::{GenerateRequest, GenerateResponse, ListResponse},
    types::{Endpoint, ResponseAnnotations},
};
