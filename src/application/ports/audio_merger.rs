//! Audio Merger Port - 波形合并抽象
//!
//! 把有序的片段 WAV 文件沿时间轴拼接为单个 WAV 文件

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// 合并错误
#[derive(Debug, Error)]
pub enum MergeError {
    #[error("No segment files to merge")]
    NoInput,

    #[error("Sample rate mismatch in {path}: expected {expected}, got {actual}")]
    SampleRateMismatch {
        path: String,
        expected: u32,
        actual: u32,
    },

    #[error("Channel count mismatch in {path}: expected {expected}, got {actual}")]
    ChannelMismatch {
        path: String,
        expected: u8,
        actual: u8,
    },

    #[error("Decoding error: {0}")]
    DecodingError(String),

    #[error("IO error: {0}")]
    IoError(String),
}

/// 合并结果元信息
#[derive(Debug, Clone)]
pub struct MergeInfo {
    /// 采样率
    pub sample_rate: u32,
    /// 合并后的总样本数（单声道帧数 × 声道数）
    pub total_samples: usize,
    /// 合并后时长（毫秒）
    pub duration_ms: u64,
    /// 参与合并的片段数量
    pub segment_count: usize,
}

/// Audio Merger Port
///
/// 不做重采样：所有片段由合成引擎以同一采样率产出，这是上游不变式，
/// 违反时合并报错而不是静默混音
#[async_trait]
pub trait AudioMergerPort: Send + Sync {
    /// 按给定顺序合并片段文件，写出单个 WAV 到 output
    async fn merge(&self, segments: &[PathBuf], output: &Path) -> Result<MergeInfo, MergeError>;
}
