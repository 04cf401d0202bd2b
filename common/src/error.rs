//! エラー型定義
//!
//! 統一エラー型（thiserror使用）

use thiserror::Error;

/// Dispatch layer error type
#[derive(Debug, Error)]
pub enum DispatchError {
    /// HTTP client error (connection failure, non-2xx status, malformed body)
    #[error("HTTP client error: {0}")]
    Http(String),

    /// Timeout error
    #[error("Timeout error: {0}")]
    Timeout(String),

    /// Per-endpoint argument list does not match the endpoint count
    #[error("Argument count mismatch: expected {expected} argument sets, got {actual}")]
    ArgumentCountMismatch {
        /// 登録済みエンドポイント数
        expected: usize,
        /// 渡された引数セット数
        actual: usize,
    },

    /// Tasks were submitted to an empty worker pool
    #[error("No workers available")]
    NoWorkers,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl DispatchError {
    /// 事前条件違反（リモート呼び出し前に検出されるエラー）かどうか
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::ArgumentCountMismatch { .. } | Self::NoWorkers | Self::Config(_)
        )
    }
}

/// Dispatch Result型
pub type DispatchResult<T> = Result<T, DispatchError>;
