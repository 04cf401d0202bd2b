//! ロギング初期化ユーティリティ

use ollama_dispatch_common::error::{DispatchError, DispatchResult};
use tracing_subscriber::EnvFilter;

/// デフォルトのログレベル（`RUST_LOG` 未設定時）
const DEFAULT_FILTER: &str = "info";

/// tracingサブスクライバーを初期化する
///
/// `RUST_LOG` でフィルタを指定できる。既に初期化済みの場合はエラーを返す。
pub fn init() -> DispatchResult<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| DispatchError::Internal(format!("Failed to initialize logging: {}", e)))
}
