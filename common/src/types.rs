//! 共通型定義
//!
//! Endpoint, ResponseAnnotations等のコアデータ型

use serde::{Deserialize, Serialize};

/// リモートOllamaエンドポイント
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Endpoint {
    /// ワーカー名（ログ・アノテーションに使用）
    pub name: String,
    /// ベースURL（例: "http://192.168.1.10:11434"）
    pub url: String,
}

impl Endpoint {
    /// 新しいエンドポイントを作成
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }

    /// 末尾スラッシュを除いたベースURL
    pub fn base_url(&self) -> &str {
        self.url.trim_end_matches('/')
    }

    /// 表示用の `host:port`
    ///
    /// スキームとパスを取り除いた部分を返す。取り除いた結果が空ならURLをそのまま返す。
    pub fn host_port(&self) -> &str {
        let without_scheme = match self.url.split_once("://") {
            Some((_, rest)) => rest,
            None => self.url.as_str(),
        };
        let authority = without_scheme.split('/').next().unwrap_or_default();
        if authority.is_empty() {
            self.url.as_str()
        } else {
            authority
        }
    }
}

/// レスポンスに付与する追加アノテーション
///
/// リクエスト側で設定した値はリモート呼び出し後にレスポンスへコピーされる。
/// `run_on` はディスパッチャーが処理したワーカー名を記録する。
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResponseAnnotations {
    /// タスクを処理したワーカー名
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_on: Option<String>,
    /// 質問ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question_id: Option<String>,
    /// 対象（プロンプトが扱う人物・テーマ等）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
}

impl ResponseAnnotations {
    /// 質問IDとテーマを指定して作成
    pub fn tagged(question_id: impl Into<String>, subject: impl Into<String>) -> Self {
        Self {
            run_on: None,
            question_id: Some(question_id.into()),
            subject: Some(subject.into()),
        }
    }

    /// 質問ID（未設定なら空文字）
    pub fn question_id_or_empty(&self) -> &str {
        self.question_id.as_deref().unwrap_or("")
    }

    /// テーマ（未設定なら空文字）
    pub fn subject_or_empty(&self) -> &str {
        self.subject.as_deref().unwrap_or("")
    }

    /// 全フィールドが未設定か
    pub fn is_empty(&self) -> bool {
        self.run_on.is_none() && self.question_id.is_none() && self.subject.is_none()
    }
}
