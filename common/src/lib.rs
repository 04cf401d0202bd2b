//! Ollama Dispatch Common
//!
//! ワーカー・ディスパッチャー・ファンアウト間で共有する型定義

#![warn(missing_docs)]

/// 設定管理
pub mod config;

/// エラー型定義
pub mod error;

/// Ollama APIのリクエスト/レスポンス
pub mod protocol;

/// エンドポイント・アノテーション等の共通型
pub mod types;
