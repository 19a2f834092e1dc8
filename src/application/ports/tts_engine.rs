//! TTS Engine Port - 语音合成引擎抽象
//!
//! 定义对外部 TTS 合成服务的抽象接口，具体实现在 infrastructure/adapters 层

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::job::VoiceSpec;

/// TTS 错误
#[derive(Debug, Error)]
pub enum TtsError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Service error: {0}")]
    ServiceError(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// 单个片段的合成请求
#[derive(Debug, Clone)]
pub struct SynthesisRequest {
    /// 要合成的文本片段
    pub text: String,
    /// 音色配置（风格指令或参考克隆，二选一）
    pub voice: VoiceSpec,
    /// 合成模型标识
    pub model: String,
    /// 语言标签
    pub lang: String,
    /// 生成 token 上限
    pub max_tokens: u32,
}

/// 合成响应
#[derive(Debug, Clone)]
pub struct SynthesisResponse {
    /// WAV 音频数据
    pub audio_data: Vec<u8>,
    /// 采样率（服务端报告）
    pub sample_rate: Option<u32>,
    /// 音频时长（毫秒）
    pub duration_ms: Option<u64>,
}

/// TTS Engine Port
///
/// 外部合成服务是独占资源：调用方保证串行访问，一次只合成一个片段
#[async_trait]
pub trait TtsEnginePort: Send + Sync {
    /// 合成一个文本片段，返回固定采样率的 WAV 数据
    async fn synthesize(&self, request: SynthesisRequest) -> Result<SynthesisResponse, TtsError>;

    /// 检查合成服务是否可用
    async fn health_check(&self) -> bool {
        true // 默认实现
    }
}
