//! HTTP TTS Client - 调用外部语音合成 HTTP 服务
//!
//! 实现 TtsEnginePort trait，把片段文本与音色配置提交给外部合成服务
//!
//! 外部 TTS API:
//! POST {base_url}/api/tts/synthesize
//! Request: {"text", "model", "lang", "max_tokens", "instruct" 或 "ref_audio"+"ref_text"} (JSON)
//! Response: audio/wav binary，元数据在响应头

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

use crate::application::ports::{SynthesisRequest, SynthesisResponse, TtsEnginePort, TtsError};
use crate::domain::job::VoiceSpec;

/// 合成请求体 (JSON)
///
/// instruct 与 ref_audio/ref_text 互斥，由音色配置的形式决定
#[derive(Debug, Serialize)]
struct TtsHttpRequest {
    text: String,
    model: String,
    lang: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    instruct: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ref_audio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ref_text: Option<String>,
}

impl From<SynthesisRequest> for TtsHttpRequest {
    fn from(request: SynthesisRequest) -> Self {
        let (instruct, ref_audio, ref_text) = match request.voice {
            VoiceSpec::Instruct(instruct) => (Some(instruct), None, None),
            VoiceSpec::Reference {
                ref_audio,
                ref_text,
            } => (
                None,
                Some(ref_audio.to_string_lossy().into_owned()),
                Some(ref_text),
            ),
        };
        Self {
            text: request.text,
            model: request.model,
            lang: request.lang,
            max_tokens: request.max_tokens,
            instruct,
            ref_audio,
            ref_text,
        }
    }
}

/// HTTP TTS 客户端配置
#[derive(Debug, Clone)]
pub struct HttpTtsClientConfig {
    /// TTS 服务基础 URL
    pub base_url: String,
    /// 请求超时时间（秒）
    pub timeout_secs: u64,
}

impl Default for HttpTtsClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            timeout_secs: 300,
        }
    }
}

impl HttpTtsClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

/// HTTP TTS 客户端
pub struct HttpTtsClient {
    client: Client,
    config: HttpTtsClientConfig,
}

impl HttpTtsClient {
    /// 创建新的 HTTP TTS 客户端
    pub fn new(config: HttpTtsClientConfig) -> Result<Self, TtsError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| TtsError::NetworkError(e.to_string()))?;

        Ok(Self { client, config })
    }

    fn synthesize_url(&self) -> String {
        format!("{}/api/tts/synthesize", self.config.base_url)
    }

    fn health_url(&self) -> String {
        format!("{}/health", self.config.base_url)
    }
}

#[async_trait]
impl TtsEnginePort for HttpTtsClient {
    async fn synthesize(&self, request: SynthesisRequest) -> Result<SynthesisResponse, TtsError> {
        let http_request = TtsHttpRequest::from(request);

        tracing::debug!(
            url = %self.synthesize_url(),
            text_len = http_request.text.len(),
            model = %http_request.model,
            "Sending synthesis request"
        );

        let response = self
            .client
            .post(self.synthesize_url())
            .json(&http_request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TtsError::Timeout
                } else if e.is_connect() {
                    TtsError::NetworkError(format!("Cannot connect to TTS service: {}", e))
                } else {
                    TtsError::NetworkError(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(TtsError::ServiceError(format!(
                "HTTP {}: {}",
                status, error_text
            )));
        }

        // 从响应头提取元数据
        let headers = response.headers();
        let sample_rate = headers
            .get("X-TTS-Sample-Rate")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok());
        let duration_ms = headers
            .get("X-TTS-Duration-Ms")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok());

        // 直接获取音频字节
        let audio_data = response
            .bytes()
            .await
            .map_err(|e| TtsError::InvalidResponse(format!("Failed to read audio: {}", e)))?
            .to_vec();

        if audio_data.is_empty() {
            return Err(TtsError::InvalidResponse(
                "Service returned empty audio".to_string(),
            ));
        }

        tracing::debug!(
            sample_rate = ?sample_rate,
            duration_ms = ?duration_ms,
            audio_size = audio_data.len(),
            "Synthesis completed"
        );

        Ok(SynthesisResponse {
            audio_data,
            sample_rate,
            duration_ms,
        })
    }

    async fn health_check(&self) -> bool {
        match self
            .client
            .get(self.health_url())
            .timeout(Duration::from_secs(5))
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }
}
