//! Gain Boost Port - 外部增益工具抽象
//!
//! 合并产物的音量增益是尽力而为的能力：失败时调用方保留未增益的文件

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// 增益错误
#[derive(Debug, Error)]
pub enum GainError {
    #[error("Gain tool unavailable: {0}")]
    ToolUnavailable(String),

    #[error("Gain tool failed: {0}")]
    ToolFailed(String),

    #[error("Gain tool produced no output: {0}")]
    NoOutput(String),

    #[error("IO error: {0}")]
    IoError(String),
}

/// Gain Boost Port
#[async_trait]
pub trait GainBoostPort: Send + Sync {
    /// 对音频文件应用线性增益
    ///
    /// 成功时增益后的文件原子地替换原文件（对调用方而言路径不变），
    /// 失败时原文件保持原样
    async fn apply_gain(&self, path: &Path, factor: f32) -> Result<PathBuf, GainError>;
}
