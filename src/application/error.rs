//! 应用层错误定义
//!
//! 片段级失败不破坏任务级状态：完成标记只在全部步骤成功后写入

use thiserror::Error;

use crate::application::ports::{JobStoreError, MergeError, TtsError};

/// 流水线错误
///
/// 任一变体都表示当前任务这一轮处理中止；已生成的片段工件保留在磁盘上，
/// 源文件不被重命名，任务保持待处理状态等待下次重试
#[derive(Debug, Error)]
pub enum PipelineError {
    /// 某个片段合成失败
    #[error("Synthesis failed for segment {index}: {source}")]
    SynthesisFailed {
        index: usize,
        #[source]
        source: TtsError,
    },

    /// 磁盘上没有任何可合并的片段工件
    #[error("No segment artifacts to merge for job '{stem}'")]
    MergeInputMissing { stem: String },

    /// 合并失败
    #[error("Merge failed: {0}")]
    MergeFailed(#[from] MergeError),

    /// 任务存储错误
    #[error("Job store error: {0}")]
    Store(#[from] JobStoreError),
}
