//! Job Coordinator - 批处理调度器
//!
//! 驱动每个任务走完 分段 → 合成 → 合并 → 后处理 → 完成标记 的流程。
//! 严格串行：一次处理一个任务，任务内按索引顺序一次合成一个片段
//! （合成引擎是独占资源）。
//!
//! 断点续跑：分段是纯函数，重跑会得到相同的片段边界；磁盘上已存在的
//! 片段工件直接复用，只合成缺失的索引

use std::sync::Arc;

use crate::application::error::PipelineError;
use crate::application::ports::{
    AudioMergerPort, GainBoostPort, JobStorePort, SynthesisRequest, TtsEnginePort,
};
use crate::domain::job::{Job, VoiceSpec};
use crate::domain::text_segmenter::{segment_text, SegmentConfig};

/// 日志中片段文本预览的最大字符数
const PREVIEW_CHARS: usize = 80;

/// 调度器配置
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// 分段配置
    pub segment: SegmentConfig,
    /// 合成模型标识
    pub model: String,
    /// 语言标签
    pub lang: String,
    /// 生成 token 上限
    pub max_tokens: u32,
    /// 合并产物的线性增益倍数
    pub gain_factor: f32,
}

/// 单个任务的处理结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    /// 成功合成并标记完成
    Finished {
        /// 片段总数
        segments: usize,
        /// 本轮实际合成的片段数
        synthesized: usize,
        /// 复用磁盘已有工件的片段数
        reused: usize,
    },
    /// 源文本为空，跳过（不视为失败，也不标记完成）
    SkippedEmpty,
}

/// 一轮批处理的汇总
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// 成功完成的任务数
    pub processed: usize,
    /// 因源文本为空而跳过的任务数
    pub skipped: usize,
    /// 失败（保持待处理状态）的任务数
    pub failed: usize,
}

/// 批处理调度器
///
/// 唯一持有可变持久状态（经由 JobStorePort 的文件系统）的组件
pub struct JobCoordinator {
    store: Arc<dyn JobStorePort>,
    tts: Arc<dyn TtsEnginePort>,
    merger: Arc<dyn AudioMergerPort>,
    gain: Arc<dyn GainBoostPort>,
    config: CoordinatorConfig,
}

impl JobCoordinator {
    pub fn new(
        store: Arc<dyn JobStorePort>,
        tts: Arc<dyn TtsEnginePort>,
        merger: Arc<dyn AudioMergerPort>,
        gain: Arc<dyn GainBoostPort>,
        config: CoordinatorConfig,
    ) -> Self {
        Self {
            store,
            tts,
            merger,
            gain,
            config,
        }
    }

    /// 运行一轮批处理：发现并处理所有待完成任务
    ///
    /// 单个任务失败不影响其他任务（记录日志后继续），
    /// 失败任务保持待处理状态供下次重试
    pub async fn run_batch(&self, voice: &VoiceSpec) -> Result<BatchSummary, PipelineError> {
        let pending = self.store.list_pending().await?;
        if pending.is_empty() {
            tracing::info!("No pending jobs found");
            return Ok(BatchSummary::default());
        }

        tracing::info!(count = pending.len(), "Found pending jobs");
        for job in &pending {
            tracing::info!(stem = %job.stem, "  - {}", job.source_path.display());
        }

        // 合成服务探活：失败只告警，具体错误留给逐片段合成时报告
        if !self.tts.health_check().await {
            tracing::warn!("TTS service health check failed, proceeding anyway");
        }

        let mut summary = BatchSummary::default();
        for job in &pending {
            match self.process_job(job, voice).await {
                Ok(JobOutcome::Finished {
                    segments,
                    synthesized,
                    reused,
                }) => {
                    tracing::info!(
                        stem = %job.stem,
                        segments,
                        synthesized,
                        reused,
                        "Job finished"
                    );
                    summary.processed += 1;
                }
                Ok(JobOutcome::SkippedEmpty) => {
                    summary.skipped += 1;
                }
                Err(e) => {
                    tracing::error!(stem = %job.stem, error = %e, "Job failed, left resumable");
                    summary.failed += 1;
                }
            }
        }

        tracing::info!(
            processed = summary.processed,
            skipped = summary.skipped,
            failed = summary.failed,
            "Batch run complete"
        );
        Ok(summary)
    }

    /// 处理单个任务
    ///
    /// 任何一步失败都不会删除已生成的片段工件、不会重命名源文件；
    /// 完成标记只在合并产物落盘且片段清理完成之后写入
    pub async fn process_job(
        &self,
        job: &Job,
        voice: &VoiceSpec,
    ) -> Result<JobOutcome, PipelineError> {
        tracing::info!(stem = %job.stem, "Processing job");

        let text = self.store.read_source(job).await?;
        let text = text.trim();
        if text.is_empty() {
            tracing::info!(stem = %job.stem, "Skipped: empty source text");
            return Ok(JobOutcome::SkippedEmpty);
        }

        let segments = segment_text(text, &self.config.segment);
        tracing::info!(stem = %job.stem, count = segments.len(), "Split into segments");

        let mut synthesized = 0usize;
        let mut reused = 0usize;
        for (index, segment) in segments.iter().enumerate() {
            if self.store.segment_exists(&job.stem, index).await {
                tracing::info!(
                    stem = %job.stem,
                    segment = index + 1,
                    total = segments.len(),
                    "Segment artifact exists, skipping synthesis"
                );
                reused += 1;
                continue;
            }

            tracing::info!(
                stem = %job.stem,
                segment = index + 1,
                total = segments.len(),
                preview = %preview(segment, PREVIEW_CHARS),
                "Synthesizing segment"
            );

            let response = self
                .tts
                .synthesize(SynthesisRequest {
                    text: segment.clone(),
                    voice: voice.clone(),
                    model: self.config.model.clone(),
                    lang: self.config.lang.clone(),
                    max_tokens: self.config.max_tokens,
                })
                .await
                .map_err(|e| PipelineError::SynthesisFailed {
                    index,
                    source: e,
                })?;

            self.store
                .write_segment(&job.stem, index, &response.audio_data)
                .await?;
            synthesized += 1;
        }

        // 合并以磁盘上的片段文件为准：崩溃后重跑可以只凭工件状态重复这一步
        let segment_files = self.store.list_segments(&job.stem).await?;
        if segment_files.is_empty() {
            return Err(PipelineError::MergeInputMissing {
                stem: job.stem.clone(),
            });
        }

        let merged_path = self.store.merged_path(&job.stem);
        let info = self
            .merger
            .merge(&segment_files, &merged_path)
            .await?;
        tracing::info!(
            stem = %job.stem,
            segments = info.segment_count,
            duration_ms = info.duration_ms,
            sample_rate = info.sample_rate,
            "Merged segments"
        );

        // 音量增益是尽力而为：失败时保留未增益的合并产物，任务照常完成
        match self
            .gain
            .apply_gain(&merged_path, self.config.gain_factor)
            .await
        {
            Ok(path) => {
                tracing::info!(stem = %job.stem, factor = self.config.gain_factor, output = %path.display(), "Volume boosted");
            }
            Err(e) => {
                tracing::warn!(stem = %job.stem, error = %e, "Volume boost failed, keeping unboosted merge");
            }
        }

        let deleted = self.store.delete_segments(&job.stem).await?;
        tracing::debug!(stem = %job.stem, deleted, "Cleaned up segment artifacts");

        let finished_path = self.store.mark_finished(job).await?;
        tracing::info!(stem = %job.stem, "Done -> {}", finished_path.display());

        Ok(JobOutcome::Finished {
            segments: segments.len(),
            synthesized,
            reused,
        })
    }
}

/// 截断文本用于日志预览（按 char 截断，避免切坏多字节字符）
fn preview(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let head: String = text.chars().take(max_chars).collect();
        format!("{}...", head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;
    use tempfile::TempDir;

    use crate::application::ports::{GainBoostPort, GainError, TtsError};
    use crate::infrastructure::adapters::audio::{encode_wav, WavMerger};
    use crate::infrastructure::adapters::store::FsJobStore;
    use crate::infrastructure::adapters::tts::FakeTtsClient;

    /// 增益直接成功，不改动文件
    struct NoopGain;

    #[async_trait]
    impl GainBoostPort for NoopGain {
        async fn apply_gain(&self, path: &Path, _factor: f32) -> Result<PathBuf, GainError> {
            Ok(path.to_path_buf())
        }
    }

    /// 模拟增益工具失败：记录被调用时文件的字节内容，然后报错
    #[derive(Default)]
    struct RecordingFailGain {
        seen: Mutex<Option<Vec<u8>>>,
    }

    #[async_trait]
    impl GainBoostPort for RecordingFailGain {
        async fn apply_gain(&self, path: &Path, _factor: f32) -> Result<PathBuf, GainError> {
            let data = std::fs::read(path).map_err(|e| GainError::IoError(e.to_string()))?;
            *self.seen.lock().unwrap() = Some(data);
            Err(GainError::NoOutput(path.display().to_string()))
        }
    }

    /// 前 fail_from 次合成成功，之后全部失败
    struct FlakyTts {
        inner: FakeTtsClient,
        fail_from: usize,
    }

    #[async_trait]
    impl crate::application::ports::TtsEnginePort for FlakyTts {
        async fn synthesize(
            &self,
            request: SynthesisRequest,
        ) -> Result<crate::application::ports::SynthesisResponse, TtsError> {
            if self.inner.call_count() >= self.fail_from {
                return Err(TtsError::ServiceError("injected failure".to_string()));
            }
            self.inner.synthesize(request).await
        }
    }

    struct Fixture {
        _dir: TempDir,
        input_dir: PathBuf,
        output_dir: PathBuf,
        store: Arc<FsJobStore>,
    }

    async fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let input_dir = dir.path().join("input");
        let output_dir = dir.path().join("output");
        let store = Arc::new(FsJobStore::new(&input_dir, &output_dir).await.unwrap());
        Fixture {
            _dir: dir,
            input_dir,
            output_dir,
            store,
        }
    }

    fn test_config(max_chars: usize) -> CoordinatorConfig {
        CoordinatorConfig {
            segment: SegmentConfig { max_chars },
            model: "test-model".to_string(),
            lang: "chinese".to_string(),
            max_tokens: 4096,
            gain_factor: 1.8,
        }
    }

    fn coordinator(
        fx: &Fixture,
        tts: Arc<dyn crate::application::ports::TtsEnginePort>,
        gain: Arc<dyn GainBoostPort>,
        max_chars: usize,
    ) -> JobCoordinator {
        JobCoordinator::new(
            fx.store.clone(),
            tts,
            Arc::new(WavMerger::new()),
            gain,
            test_config(max_chars),
        )
    }

    fn voice() -> VoiceSpec {
        VoiceSpec::Instruct("测试音色".to_string())
    }

    fn write_source(fx: &Fixture, name: &str, text: &str) -> Job {
        let path = fx.input_dir.join(name);
        std::fs::write(&path, text).unwrap();
        let stem = Path::new(name).file_stem().unwrap().to_string_lossy().into_owned();
        Job::new(stem, path)
    }

    /// 生成一段可被合并器解码的片段工件数据
    fn fake_segment_wav() -> Vec<u8> {
        encode_wav(&vec![0.1f32; 2000], 22050, 1)
    }

    #[tokio::test]
    async fn full_pipeline_finishes_job() {
        let fx = fixture().await;
        let tts = Arc::new(FakeTtsClient::with_defaults());
        // 上限 5 字：三个四字句各自成段
        let coord = coordinator(&fx, tts.clone(), Arc::new(NoopGain), 5);
        let job = write_source(&fx, "story.txt", "第一句。第二句。第三句。");

        let outcome = coord.process_job(&job, &voice()).await.unwrap();

        assert_eq!(
            outcome,
            JobOutcome::Finished {
                segments: 3,
                synthesized: 3,
                reused: 0
            }
        );
        assert_eq!(tts.call_count(), 3);
        // 合并产物存在，片段工件被清理，源文件被改名
        assert!(fx.output_dir.join("story.wav").exists());
        assert!(!fx.output_dir.join("story_seg_000.wav").exists());
        assert!(!fx.input_dir.join("story.txt").exists());
        assert!(fx.input_dir.join("finished_story.txt").exists());
    }

    #[tokio::test]
    async fn resume_skips_existing_segment() {
        let fx = fixture().await;
        let tts = Arc::new(FakeTtsClient::with_defaults());
        let coord = coordinator(&fx, tts.clone(), Arc::new(NoopGain), 5);
        let job = write_source(&fx, "story.txt", "第一句。第二句。第三句。");

        // 索引 1 的工件已经在磁盘上（上次运行被中断）
        fx.store
            .write_segment(&job.stem, 1, &fake_segment_wav())
            .await
            .unwrap();

        let outcome = coord.process_job(&job, &voice()).await.unwrap();

        assert_eq!(
            outcome,
            JobOutcome::Finished {
                segments: 3,
                synthesized: 2,
                reused: 1
            }
        );
        assert_eq!(tts.call_count(), 2);
        assert!(fx.input_dir.join("finished_story.txt").exists());
    }

    #[tokio::test]
    async fn rerun_with_all_artifacts_synthesizes_nothing() {
        let fx = fixture().await;
        let tts = Arc::new(FakeTtsClient::with_defaults());
        let coord = coordinator(&fx, tts.clone(), Arc::new(NoopGain), 10);
        let text = "第一句。第二句。第三句。";
        let job = write_source(&fx, "story.txt", text);

        // 全部片段工件已存在：重跑必须重推出相同边界并全部复用
        let expected = segment_text(text, &SegmentConfig { max_chars: 10 });
        for (i, _) in expected.iter().enumerate() {
            fx.store
                .write_segment(&job.stem, i, &fake_segment_wav())
                .await
                .unwrap();
        }

        let outcome = coord.process_job(&job, &voice()).await.unwrap();

        assert_eq!(
            outcome,
            JobOutcome::Finished {
                segments: expected.len(),
                synthesized: 0,
                reused: expected.len()
            }
        );
        assert_eq!(tts.call_count(), 0);
    }

    #[tokio::test]
    async fn empty_source_skipped_and_not_renamed() {
        let fx = fixture().await;
        let tts = Arc::new(FakeTtsClient::with_defaults());
        let coord = coordinator(&fx, tts.clone(), Arc::new(NoopGain), 10);
        let job = write_source(&fx, "empty.txt", "  \n\n  ");

        let outcome = coord.process_job(&job, &voice()).await.unwrap();

        assert_eq!(outcome, JobOutcome::SkippedEmpty);
        assert_eq!(tts.call_count(), 0);
        // 未改名，未产出任何工件
        assert!(fx.input_dir.join("empty.txt").exists());
        assert!(!fx.output_dir.join("empty.wav").exists());
    }

    #[tokio::test]
    async fn synthesis_failure_leaves_job_resumable() {
        let fx = fixture().await;
        let tts = Arc::new(FlakyTts {
            inner: FakeTtsClient::with_defaults(),
            fail_from: 1,
        });
        let coord = coordinator(&fx, tts, Arc::new(NoopGain), 10);
        let job = write_source(&fx, "story.txt", "第一句。第二句。第三句。");

        let err = coord.process_job(&job, &voice()).await.unwrap_err();

        match err {
            PipelineError::SynthesisFailed { index, .. } => assert_eq!(index, 1),
            other => panic!("unexpected error: {}", other),
        }
        // 已合成的片段保留，源文件未改名，没有合并产物
        assert!(fx.output_dir.join("story_seg_000.wav").exists());
        assert!(fx.input_dir.join("story.txt").exists());
        assert!(!fx.input_dir.join("finished_story.txt").exists());
        assert!(!fx.output_dir.join("story.wav").exists());
    }

    #[tokio::test]
    async fn gain_failure_keeps_unboosted_merge() {
        let fx = fixture().await;
        let tts = Arc::new(FakeTtsClient::with_defaults());
        let gain = Arc::new(RecordingFailGain::default());
        let coord = coordinator(&fx, tts, gain.clone(), 10);
        let job = write_source(&fx, "story.txt", "第一句。第二句。");

        let outcome = coord.process_job(&job, &voice()).await.unwrap();

        assert!(matches!(outcome, JobOutcome::Finished { .. }));
        // 最终产物与增益前的合并结果逐字节一致
        let final_bytes = std::fs::read(fx.output_dir.join("story.wav")).unwrap();
        let pre_boost = gain.seen.lock().unwrap().clone().unwrap();
        assert_eq!(final_bytes, pre_boost);
        // 增益失败不阻止任务完成
        assert!(fx.input_dir.join("finished_story.txt").exists());
    }

    #[tokio::test]
    async fn filler_only_source_reports_merge_input_missing() {
        let fx = fixture().await;
        let tts = Arc::new(FakeTtsClient::with_defaults());
        let coord = coordinator(&fx, tts, Arc::new(NoopGain), 10);
        let job = write_source(&fx, "dashes.txt", "----\n\n——");

        let err = coord.process_job(&job, &voice()).await.unwrap_err();

        assert!(matches!(err, PipelineError::MergeInputMissing { .. }));
        assert!(fx.input_dir.join("dashes.txt").exists());
    }

    #[tokio::test]
    async fn batch_continues_past_skips_and_counts() {
        let fx = fixture().await;
        let tts = Arc::new(FakeTtsClient::with_defaults());
        let coord = coordinator(&fx, tts, Arc::new(NoopGain), 100);
        write_source(&fx, "a_empty.txt", "   ");
        write_source(&fx, "b_story.txt", "只有一句。");

        let summary = coord.run_batch(&voice()).await.unwrap();

        assert_eq!(
            summary,
            BatchSummary {
                processed: 1,
                skipped: 1,
                failed: 0
            }
        );
        assert!(fx.input_dir.join("a_empty.txt").exists());
        assert!(fx.input_dir.join("finished_b_story.txt").exists());
    }

    #[tokio::test]
    async fn batch_with_no_pending_jobs_is_a_noop() {
        let fx = fixture().await;
        let tts = Arc::new(FakeTtsClient::with_defaults());
        let coord = coordinator(&fx, tts, Arc::new(NoopGain), 100);

        let summary = coord.run_batch(&voice()).await.unwrap();
        assert_eq!(summary, BatchSummary::default());
    }

    #[test]
    fn preview_truncates_on_char_boundary() {
        assert_eq!(preview("短文本", 80), "短文本");
        let long: String = "很".repeat(100);
        let p = preview(&long, 80);
        assert_eq!(p.chars().count(), 83); // 80 字 + "..."
        assert!(p.ends_with("..."));
    }
}
