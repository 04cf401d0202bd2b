//! 通信プロトコル定義
//!
//! Ollama `/api/generate`・`/api/tags` のリクエスト/レスポンス

use serde::{Deserialize, Serialize};

use crate::types::ResponseAnnotations;

/// Generateリクエスト
///
/// ディスパッチャーにおける1タスクのペイロード。
/// `annotations` はリモートには送信されず、対応するレスポンスへコピーされる。
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GenerateRequest {
    /// モデル名
    pub model: String,
    /// プロンプト
    pub prompt: String,
    /// テンプレートを適用しない生プロンプト
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<bool>,
    /// Base64エンコード済み画像（マルチモーダルモデル用）
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
    /// 応答の後に続くテキスト
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,
    /// 出力フォーマット（例: "json"）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    /// システムプロンプト
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    /// 前回応答のコンテキスト（トークンID列）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Vec<i64>>,
    /// サンプリングオプション
    #[serde(default, skip_serializing_if = "GenerateOptions::is_empty")]
    pub options: GenerateOptions,
    /// レスポンスに引き継ぐアノテーション
    #[serde(skip)]
    pub annotations: ResponseAnnotations,
}

/// サンプリングオプション（Ollamaの `options` オブジェクト）
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GenerateOptions {
    /// コンテキスト長
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_ctx: Option<u32>,
    /// 最大生成トークン数
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_predict: Option<i32>,
    /// 温度
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// top-k
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
    /// top-p
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
}

impl GenerateOptions {
    /// 全オプションが未設定か
    pub fn is_empty(&self) -> bool {
        self.num_ctx.is_none()
            && self.num_predict.is_none()
            && self.temperature.is_none()
            && self.top_k.is_none()
            && self.top_p.is_none()
    }
}

impl GenerateRequest {
    /// モデルとプロンプトを指定して作成
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    /// システムプロンプトを設定
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// 画像を追加
    pub fn with_image(mut self, base64: impl Into<String>) -> Self {
        self.images.push(base64.into());
        self
    }

    /// 出力フォーマットを設定
    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    /// 温度を設定
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.options.temperature = Some(temperature);
        self
    }

    /// 最大生成トークン数を設定
    pub fn with_num_predict(mut self, num_predict: i32) -> Self {
        self.options.num_predict = Some(num_predict);
        self
    }

    /// アノテーションを設定
    pub fn with_annotations(mut self, annotations: ResponseAnnotations) -> Self {
        self.annotations = annotations;
        self
    }
}

/// Generateレスポンス
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GenerateResponse {
    /// モデル名
    pub model: String,
    /// 生成時刻（Ollamaが返す文字列そのまま）
    #[serde(default)]
    pub created_at: String,
    /// 生成テキスト
    #[serde(default)]
    pub response: String,
    /// 生成完了フラグ
    #[serde(default)]
    pub done: bool,
    /// 完了理由（例: "stop"）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub done_reason: Option<String>,
    /// 次回リクエスト用コンテキスト
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Vec<i64>>,
    /// 総処理時間（ns）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_duration: Option<u64>,
    /// モデルロード時間（ns）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load_duration: Option<u64>,
    /// プロンプト評価トークン数
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_eval_count: Option<u64>,
    /// プロンプト評価時間（ns）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_eval_duration: Option<u64>,
    /// 生成トークン数
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eval_count: Option<u64>,
    /// 生成時間（ns）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eval_duration: Option<u64>,
    /// 追加アノテーション
    #[serde(default, skip_serializing_if = "ResponseAnnotations::is_empty")]
    pub annotations: ResponseAnnotations,
}

/// モデル一覧レスポンス（`GET /api/tags`）
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ListResponse {
    /// モデル一覧
    #[serde(default)]
    pub models: Vec<ModelEntry>,
}

impl ListResponse {
    /// モデル名一覧
    pub fn names(&self) -> Vec<&str> {
        self.models.iter().map(|m| m.name.as_str()).collect()
    }
}

/// モデル情報
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ModelEntry {
    /// モデル名（例: "llama3:8b"）
    pub name: String,
    /// 最終更新時刻
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<String>,
    /// サイズ（バイト）
    #[serde(default)]
    pub size: u64,
    /// ダイジェスト
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
    /// 詳細
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<ModelDetails>,
}

/// モデル詳細
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ModelDetails {
    /// フォーマット（例: "gguf"）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    /// ファミリー（例: "llama"）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family: Option<String>,
    /// パラメータサイズ（例: "8B"）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameter_size: Option<String>,
    /// 量子化レベル（例: "Q4_K_M"）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantization_level: Option<String>,
}
