//! 進捗表示
//!
//! 完了件数の通知先。表示は観測用であり、処理結果には影響しない。

use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Mutex;

/// 進捗通知先
pub trait ProgressReporter: Send + Sync {
    /// 総件数を指定して開始
    fn start(&self, total: u64);
    /// 1件完了
    fn advance(&self);
    /// 終了
    fn finish(&self);
}

/// 何も表示しない
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn start(&self, _total: u64) {}
    fn advance(&self) {}
    fn finish(&self) {}
}

/// indicatifの進捗バー
#[derive(Default)]
pub struct BarProgress {
    bar: Mutex<Option<ProgressBar>>,
}

impl BarProgress {
    /// 新しい進捗バーを作成（`start` まで表示しない）
    pub fn new() -> Self {
        Self::default()
    }

    fn style() -> ProgressStyle {
        ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} [{elapsed_precise}<{eta_precise}]")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
    }

    fn with_bar(&self, f: impl FnOnce(&ProgressBar)) {
        if let Ok(guard) = self.bar.lock() {
            if let Some(bar) = guard.as_ref() {
                f(bar);
            }
        }
    }
}

impl ProgressReporter for BarProgress {
    fn start(&self, total: u64) {
        let bar = ProgressBar::new(total).with_style(Self::style());
        if let Ok(mut guard) = self.bar.lock() {
            *guard = Some(bar);
        }
    }

    fn advance(&self) {
        self.with_bar(|bar| bar.inc(1));
    }

    fn finish(&self) {
        self.with_bar(|bar| bar.finish());
    }
}

/// 設定に応じた通知先を返す
pub fn reporter(show_progress: bool) -> Box<dyn ProgressReporter> {
    if show_progress {
        Box::new(BarProgress::new())
    } else {
        Box::new(NoProgress)
    }
}
