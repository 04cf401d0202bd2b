//! テスト用サポートモジュール

pub mod ollama;
