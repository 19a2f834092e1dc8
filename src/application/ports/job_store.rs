//! Job Store Port - 任务与片段工件的持久化抽象
//!
//! 把"文件系统即数据库"的命名约定（finished_ 前缀、片段文件存在性）
//! 隔离在这个端口之后，调度器的控制逻辑不感知具体持久化机制

use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;

use crate::domain::job::Job;

/// 任务存储错误
#[derive(Debug, Error)]
pub enum JobStoreError {
    #[error("Source not found: {0}")]
    SourceNotFound(String),

    #[error("IO error: {0}")]
    IoError(String),
}

/// Job Store Port
///
/// 片段工件的存在性是唯一的断点续跑信号：没有日志文件，也没有锁文件
#[async_trait]
pub trait JobStorePort: Send + Sync {
    /// 列出未完成的任务，按文件名排序（确定的处理顺序）
    async fn list_pending(&self) -> Result<Vec<Job>, JobStoreError>;

    /// 读取任务的源文本
    async fn read_source(&self, job: &Job) -> Result<String, JobStoreError>;

    /// 片段工件路径（索引零填充以保证排序）
    fn segment_path(&self, stem: &str, index: usize) -> PathBuf;

    /// 片段工件是否已存在
    async fn segment_exists(&self, stem: &str, index: usize) -> bool;

    /// 写入片段工件
    async fn write_segment(
        &self,
        stem: &str,
        index: usize,
        data: &[u8],
    ) -> Result<PathBuf, JobStoreError>;

    /// 列出任务已有的全部片段工件，按文件名排序
    async fn list_segments(&self, stem: &str) -> Result<Vec<PathBuf>, JobStoreError>;

    /// 删除任务的全部片段工件，返回删除数量
    async fn delete_segments(&self, stem: &str) -> Result<u64, JobStoreError>;

    /// 最终合并产物路径
    fn merged_path(&self, stem: &str) -> PathBuf;

    /// 原子地将源文件标记为已完成，之后不再被 list_pending 发现
    async fn mark_finished(&self, job: &Job) -> Result<PathBuf, JobStoreError>;
}
