//! Fake TTS Client - 用于测试的合成客户端
//!
//! 不调用真实服务，按文本长度生成确定性的 WAV 数据，并记录调用次数，
//! 便于验证断点续跑时"已存在的片段不再合成"

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::application::ports::{SynthesisRequest, SynthesisResponse, TtsEnginePort, TtsError};
use crate::infrastructure::adapters::audio::encode_wav;

/// Fake TTS Client 配置
#[derive(Debug, Clone)]
pub struct FakeTtsClientConfig {
    /// 生成音频的采样率
    pub sample_rate: u32,
    /// 每个字符对应的样本数（决定音频时长）
    pub samples_per_char: usize,
}

impl Default for FakeTtsClientConfig {
    fn default() -> Self {
        Self {
            sample_rate: 22050,
            samples_per_char: 120,
        }
    }
}

/// Fake TTS Client
pub struct FakeTtsClient {
    config: FakeTtsClientConfig,
    calls: AtomicUsize,
}

impl FakeTtsClient {
    pub fn new(config: FakeTtsClientConfig) -> Self {
        Self {
            config,
            calls: AtomicUsize::new(0),
        }
    }

    /// 使用默认配置创建
    pub fn with_defaults() -> Self {
        Self::new(FakeTtsClientConfig::default())
    }

    /// 已执行的合成调用次数
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// 为一段文本生成确定性 PCM：时长与字符数成正比
    fn render(&self, text: &str) -> Vec<f32> {
        let total = text.chars().count().max(1) * self.config.samples_per_char;
        (0..total)
            .map(|i| ((i % 97) as f32 / 97.0 - 0.5) * 0.2)
            .collect()
    }
}

#[async_trait]
impl TtsEnginePort for FakeTtsClient {
    async fn synthesize(&self, request: SynthesisRequest) -> Result<SynthesisResponse, TtsError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        tracing::debug!(
            text_len = request.text.len(),
            model = %request.model,
            "FakeTtsClient: rendering deterministic audio"
        );

        let samples = self.render(&request.text);
        let duration_ms = samples.len() as u64 * 1000 / self.config.sample_rate as u64;
        let audio_data = encode_wav(&samples, self.config.sample_rate, 1);

        Ok(SynthesisResponse {
            audio_data,
            sample_rate: Some(self.config.sample_rate),
            duration_ms: Some(duration_ms),
        })
    }

    async fn health_check(&self) -> bool {
        true
    }
}
