//! 設定管理
//!
//! DispatchConfig（ファイル・環境変数からの読み込み）

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{DispatchError, DispatchResult};
use crate::types::Endpoint;

/// 環境変数: エンドポイント一覧（`name=url` または `url` のカンマ区切り）
pub const ENV_ENDPOINTS: &str = "OLLAMA_DISPATCH_ENDPOINTS";
/// 環境変数: リクエストタイムアウト（秒）
pub const ENV_TIMEOUT_SECS: &str = "OLLAMA_DISPATCH_TIMEOUT_SECS";
/// 環境変数: JSONダンプ出力先
pub const ENV_DUMP_DIR: &str = "OLLAMA_DISPATCH_DUMP_DIR";
/// 環境変数: 進捗バー表示
pub const ENV_PROGRESS: &str = "OLLAMA_DISPATCH_PROGRESS";

/// ディスパッチ設定
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DispatchConfig {
    /// ワーカーとして使用するエンドポイント（登録順）
    #[serde(default)]
    pub endpoints: Vec<Endpoint>,

    /// リクエストタイムアウト（秒）(デフォルト: なし)
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,

    /// レスポンスのJSONダンプ出力先 (デフォルト: 出力しない)
    #[serde(default)]
    pub dump_dir: Option<PathBuf>,

    /// 進捗バーを表示するか (デフォルト: true)
    #[serde(default = "default_show_progress")]
    pub show_progress: bool,
}

fn default_show_progress() -> bool {
    true
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            endpoints: Vec::new(),
            request_timeout_secs: None,
            dump_dir: None,
            show_progress: default_show_progress(),
        }
    }
}

impl DispatchConfig {
    /// JSON文字列から読み込む
    pub fn from_json_str(json: &str) -> DispatchResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// JSONファイルから読み込む
    pub fn from_file(path: impl AsRef<Path>) -> DispatchResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            DispatchError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&content)
    }

    /// 環境変数から読み込む
    pub fn from_env() -> DispatchResult<Self> {
        let endpoints = std::env::var(ENV_ENDPOINTS)
            .ok()
            .map(|value| parse_endpoint_list(&value))
            .transpose()?
            .unwrap_or_default();

        let request_timeout_secs = std::env::var(ENV_TIMEOUT_SECS)
            .ok()
            .map(|value| parse_timeout_secs(&value))
            .transpose()?;

        let dump_dir = std::env::var(ENV_DUMP_DIR).ok().map(PathBuf::from);

        let show_progress = std::env::var(ENV_PROGRESS)
            .map(|value| parse_bool(&value))
            .unwrap_or_else(|_| default_show_progress());

        let config = Self {
            endpoints,
            request_timeout_secs,
            dump_dir,
            show_progress,
        };
        config.validate()?;
        tracing::debug!(
            endpoints = config.endpoints.len(),
            timeout_secs = ?config.request_timeout_secs,
            "Loaded dispatch configuration from environment"
        );
        Ok(config)
    }

    /// リクエストタイムアウト
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    /// 設定値を検証する（エンドポイント名の重複を禁止）
    pub fn validate(&self) -> DispatchResult<()> {
        let mut names = HashSet::new();
        for endpoint in &self.endpoints {
            if endpoint.url.trim().is_empty() {
                return Err(DispatchError::Config(format!(
                    "Endpoint '{}' has an empty url",
                    endpoint.name
                )));
            }
            if !names.insert(endpoint.name.as_str()) {
                return Err(DispatchError::Config(format!(
                    "Duplicate endpoint name: {}",
                    endpoint.name
                )));
            }
        }
        Ok(())
    }
}

/// エンドポイント一覧文字列をパース
///
/// `"gpu-a=http://10.0.0.1:11434,http://10.0.0.2:11434"` のように、
/// 名前付き（`name=url`）と名前なし（`url`）を混在できる。
/// 名前なしの場合は `machine-{位置}` を割り当てる。
pub fn parse_endpoint_list(value: &str) -> DispatchResult<Vec<Endpoint>> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .enumerate()
        .map(|(idx, item)| match item.split_once('=') {
            Some((name, url)) if !name.trim().is_empty() && !url.trim().is_empty() => {
                Ok(Endpoint::new(name.trim(), url.trim()))
            }
            Some(_) => Err(DispatchError::Config(format!(
                "Invalid endpoint entry: '{}'",
                item
            ))),
            None => Ok(Endpoint::new(format!("machine-{}", idx), item)),
        })
        .collect()
}

fn parse_timeout_secs(value: &str) -> DispatchResult<u64> {
    value.trim().parse().map_err(|_| {
        DispatchError::Config(format!(
            "{} must be a whole number of seconds, got '{}'",
            ENV_TIMEOUT_SECS, value
        ))
    })
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
