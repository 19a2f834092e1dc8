//! FS Job Store - 基于文件系统命名约定的任务存储
//!
//! input 目录：`*.txt` 为待处理任务，`finished_*.txt` 为已完成任务；
//! output 目录：`{stem}_seg_{索引:03}.wav` 为临时片段工件（合并成功后删除），
//! `{stem}.wav` 为最终产物。完成标记就是一次原子 rename

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::application::ports::{JobStoreError, JobStorePort};
use crate::domain::job::Job;

/// 已完成源文件的文件名前缀
pub const FINISHED_PREFIX: &str = "finished_";

/// 文件系统任务存储
pub struct FsJobStore {
    input_dir: PathBuf,
    output_dir: PathBuf,
}

impl FsJobStore {
    /// 创建任务存储，确保输入/输出目录存在
    pub async fn new(
        input_dir: impl AsRef<Path>,
        output_dir: impl AsRef<Path>,
    ) -> Result<Self, JobStoreError> {
        let input_dir = input_dir.as_ref().to_path_buf();
        let output_dir = output_dir.as_ref().to_path_buf();

        fs::create_dir_all(&input_dir)
            .await
            .map_err(|e| JobStoreError::IoError(e.to_string()))?;
        fs::create_dir_all(&output_dir)
            .await
            .map_err(|e| JobStoreError::IoError(e.to_string()))?;

        Ok(Self {
            input_dir,
            output_dir,
        })
    }

    pub fn input_dir(&self) -> &Path {
        &self.input_dir
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// 片段文件名：索引零填三位，保证字典序与索引序一致
    fn segment_file_name(stem: &str, index: usize) -> String {
        format!("{}_seg_{:03}.wav", stem, index)
    }

    fn segment_prefix(stem: &str) -> String {
        format!("{}_seg_", stem)
    }
}

#[async_trait]
impl JobStorePort for FsJobStore {
    async fn list_pending(&self) -> Result<Vec<Job>, JobStoreError> {
        let mut jobs: Vec<Job> = Vec::new();
        let mut entries = fs::read_dir(&self.input_dir)
            .await
            .map_err(|e| JobStoreError::IoError(e.to_string()))?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| JobStoreError::IoError(e.to_string()))?
        {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            if path.extension().map_or(true, |ext| ext != "txt") {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if name.starts_with(FINISHED_PREFIX) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            jobs.push(Job::new(stem, &path));
        }

        // 按文件名排序，批次处理顺序确定
        jobs.sort_by(|a, b| a.source_path.file_name().cmp(&b.source_path.file_name()));
        Ok(jobs)
    }

    async fn read_source(&self, job: &Job) -> Result<String, JobStoreError> {
        fs::read_to_string(&job.source_path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                JobStoreError::SourceNotFound(job.source_path.display().to_string())
            } else {
                JobStoreError::IoError(e.to_string())
            }
        })
    }

    fn segment_path(&self, stem: &str, index: usize) -> PathBuf {
        self.output_dir.join(Self::segment_file_name(stem, index))
    }

    async fn segment_exists(&self, stem: &str, index: usize) -> bool {
        fs::metadata(self.segment_path(stem, index)).await.is_ok()
    }

    async fn write_segment(
        &self,
        stem: &str,
        index: usize,
        data: &[u8],
    ) -> Result<PathBuf, JobStoreError> {
        let path = self.segment_path(stem, index);
        fs::write(&path, data)
            .await
            .map_err(|e| JobStoreError::IoError(e.to_string()))?;

        tracing::debug!(
            stem,
            segment = index,
            size = data.len(),
            "Saved segment artifact"
        );
        Ok(path)
    }

    async fn list_segments(&self, stem: &str) -> Result<Vec<PathBuf>, JobStoreError> {
        let prefix = Self::segment_prefix(stem);
        let mut segments: Vec<PathBuf> = Vec::new();

        let mut entries = fs::read_dir(&self.output_dir)
            .await
            .map_err(|e| JobStoreError::IoError(e.to_string()))?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| JobStoreError::IoError(e.to_string()))?
        {
            let path = entry.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if name.starts_with(&prefix) && name.ends_with(".wav") {
                segments.push(path);
            }
        }

        segments.sort();
        Ok(segments)
    }

    async fn delete_segments(&self, stem: &str) -> Result<u64, JobStoreError> {
        let mut deleted = 0u64;
        for path in self.list_segments(stem).await? {
            fs::remove_file(&path)
                .await
                .map_err(|e| JobStoreError::IoError(e.to_string()))?;
            deleted += 1;
        }
        tracing::debug!(stem, deleted, "Deleted segment artifacts");
        Ok(deleted)
    }

    fn merged_path(&self, stem: &str) -> PathBuf {
        self.output_dir.join(format!("{}.wav", stem))
    }

    async fn mark_finished(&self, job: &Job) -> Result<PathBuf, JobStoreError> {
        let Some(name) = job.source_path.file_name().and_then(|n| n.to_str()) else {
            return Err(JobStoreError::SourceNotFound(
                job.source_path.display().to_string(),
            ));
        };
        let finished_path = self
            .input_dir
            .join(format!("{}{}", FINISHED_PREFIX, name));

        fs::rename(&job.source_path, &finished_path)
            .await
            .map_err(|e| JobStoreError::IoError(e.to_string()))?;

        Ok(finished_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn store() -> (TempDir, FsJobStore) {
        let dir = TempDir::new().unwrap();
        let store = FsJobStore::new(dir.path().join("input"), dir.path().join("output"))
            .await
            .unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn list_pending_filters_and_sorts() {
        let (_dir, store) = store().await;
        std::fs::write(store.input_dir().join("b.txt"), "乙").unwrap();
        std::fs::write(store.input_dir().join("a.txt"), "甲").unwrap();
        std::fs::write(store.input_dir().join("finished_c.txt"), "完").unwrap();
        std::fs::write(store.input_dir().join("notes.md"), "非txt").unwrap();

        let jobs = store.list_pending().await.unwrap();
        let stems: Vec<&str> = jobs.iter().map(|j| j.stem.as_str()).collect();
        assert_eq!(stems, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn segment_paths_are_zero_padded() {
        let (_dir, store) = store().await;
        let path = store.segment_path("story", 7);
        assert!(path.to_string_lossy().ends_with("story_seg_007.wav"));
        let path = store.segment_path("story", 123);
        assert!(path.to_string_lossy().ends_with("story_seg_123.wav"));
    }

    #[tokio::test]
    async fn write_then_exists_then_list_in_order() {
        let (_dir, store) = store().await;
        assert!(!store.segment_exists("story", 0).await);

        // 乱序写入，读取仍按索引序
        store.write_segment("story", 2, b"c").await.unwrap();
        store.write_segment("story", 0, b"a").await.unwrap();
        store.write_segment("story", 1, b"b").await.unwrap();

        assert!(store.segment_exists("story", 0).await);
        let segments = store.list_segments("story").await.unwrap();
        let names: Vec<String> = segments
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            names,
            vec![
                "story_seg_000.wav",
                "story_seg_001.wav",
                "story_seg_002.wav"
            ]
        );
    }

    #[tokio::test]
    async fn delete_segments_only_touches_own_stem() {
        let (_dir, store) = store().await;
        store.write_segment("story", 0, b"a").await.unwrap();
        store.write_segment("other", 0, b"b").await.unwrap();
        // 最终产物不受片段清理影响
        std::fs::write(store.merged_path("story"), b"merged").unwrap();

        let deleted = store.delete_segments("story").await.unwrap();
        assert_eq!(deleted, 1);
        assert!(store.list_segments("story").await.unwrap().is_empty());
        assert_eq!(store.list_segments("other").await.unwrap().len(), 1);
        assert!(store.merged_path("story").exists());
    }

    #[tokio::test]
    async fn mark_finished_renames_with_prefix() {
        let (_dir, store) = store().await;
        std::fs::write(store.input_dir().join("story.txt"), "正文").unwrap();
        let jobs = store.list_pending().await.unwrap();
        let job = &jobs[0];

        let finished = store.mark_finished(job).await.unwrap();

        assert!(finished.to_string_lossy().ends_with("finished_story.txt"));
        assert!(finished.exists());
        assert!(!job.source_path.exists());
        // 已完成任务不再被发现
        assert!(store.list_pending().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn read_source_reports_missing_file() {
        let (_dir, store) = store().await;
        let job = Job::new("ghost", store.input_dir().join("ghost.txt"));
        let err = store.read_source(&job).await.unwrap_err();
        assert!(matches!(err, JobStoreError::SourceNotFound(_)));
    }
}
