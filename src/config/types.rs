//! Configuration Types
//!
//! 定义所有配置结构体，包括运行模式与音色档案的显式枚举表

use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;

use super::loader::ConfigError;
use crate::domain::job::{SynthesisStrategy, VoiceSpec};
use crate::domain::text_segmenter::DEFAULT_MAX_CHARS;

/// 应用主配置
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// 目录配置
    #[serde(default)]
    pub storage: StorageConfig,

    /// TTS 引擎配置
    #[serde(default)]
    pub tts: TtsConfig,

    /// 分段配置
    #[serde(default)]
    pub segment: SegmentSettings,

    /// 音频后处理配置
    #[serde(default)]
    pub audio: AudioConfig,

    /// 日志配置
    #[serde(default)]
    pub log: LogConfig,

    /// 识别的运行模式表：模式名 → {模型, 合成策略}
    #[serde(default = "default_modes")]
    pub modes: HashMap<String, ModeConfig>,

    /// 命名音色档案表（reference 策略使用）
    #[serde(default)]
    pub voices: HashMap<String, VoiceProfile>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            storage: StorageConfig::default(),
            tts: TtsConfig::default(),
            segment: SegmentSettings::default(),
            audio: AudioConfig::default(),
            log: LogConfig::default(),
            modes: default_modes(),
            voices: HashMap::new(),
        }
    }
}

/// 目录配置
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// 待处理源文本目录
    #[serde(default = "default_input_dir")]
    pub input_dir: PathBuf,

    /// 片段工件与最终产物目录
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

fn default_input_dir() -> PathBuf {
    PathBuf::from("input")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            input_dir: default_input_dir(),
            output_dir: default_output_dir(),
        }
    }
}

/// TTS 引擎配置
#[derive(Debug, Clone, Deserialize)]
pub struct TtsConfig {
    /// TTS 服务基础 URL
    #[serde(default = "default_tts_url")]
    pub url: String,

    /// 请求超时时间（秒），长片段的合成可能很慢
    #[serde(default = "default_tts_timeout")]
    pub timeout_secs: u64,

    /// 未指定命令行参数时使用的模式
    #[serde(default = "default_mode_name")]
    pub default_mode: String,

    /// reference 策略下未指定命令行参数时使用的音色名
    #[serde(default)]
    pub default_voice: Option<String>,

    /// instruct 策略下使用的风格描述
    #[serde(default = "default_instruct")]
    pub default_instruct: String,

    /// 语言标签
    #[serde(default = "default_lang")]
    pub lang: String,

    /// 单次合成的生成 token 上限
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_tts_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_tts_timeout() -> u64 {
    300
}

fn default_mode_name() -> String {
    "voice_design".to_string()
}

fn default_instruct() -> String {
    "A cheerful young female voice with clear pronunciation and moderate speed".to_string()
}

fn default_lang() -> String {
    "chinese".to_string()
}

fn default_max_tokens() -> u32 {
    4096
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            url: default_tts_url(),
            timeout_secs: default_tts_timeout(),
            default_mode: default_mode_name(),
            default_voice: None,
            default_instruct: default_instruct(),
            lang: default_lang(),
            max_tokens: default_max_tokens(),
        }
    }
}

/// 分段配置
#[derive(Debug, Clone, Deserialize)]
pub struct SegmentSettings {
    /// 单个片段的最大字符数
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
}

fn default_max_chars() -> usize {
    DEFAULT_MAX_CHARS
}

impl Default for SegmentSettings {
    fn default() -> Self {
        Self {
            max_chars: default_max_chars(),
        }
    }
}

/// 音频后处理配置
#[derive(Debug, Clone, Deserialize)]
pub struct AudioConfig {
    /// 合并产物的线性增益倍数（合成输出偏安静）
    #[serde(default = "default_gain_factor")]
    pub gain_factor: f32,

    /// 外部增益工具命令名
    #[serde(default = "default_gain_command")]
    pub gain_command: String,
}

fn default_gain_factor() -> f32 {
    1.8
}

fn default_gain_command() -> String {
    "ffmpeg".to_string()
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            gain_factor: default_gain_factor(),
            gain_command: default_gain_command(),
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// 日志级别（trace/debug/info/warn/error）
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// 运行模式：选定合成模型与音色配置策略
#[derive(Debug, Clone, Deserialize)]
pub struct ModeConfig {
    /// 合成模型标识
    pub model: String,
    /// 音色配置策略
    pub strategy: SynthesisStrategy,
}

/// 音色档案：要克隆的参考音频及其转写文本
#[derive(Debug, Clone, Deserialize)]
pub struct VoiceProfile {
    pub ref_audio: PathBuf,
    pub ref_text: String,
}

/// 内置的默认模式表
fn default_modes() -> HashMap<String, ModeConfig> {
    let mut modes = HashMap::new();
    modes.insert(
        "voice_design".to_string(),
        ModeConfig {
            model: "mlx-community/Qwen3-TTS-12Hz-1.7B-VoiceDesign-bf16".to_string(),
            strategy: SynthesisStrategy::Instruct,
        },
    );
    modes.insert(
        "base".to_string(),
        ModeConfig {
            model: "mlx-community/Qwen3-TTS-12Hz-1.7B-Base-bf16".to_string(),
            strategy: SynthesisStrategy::Reference,
        },
    );
    modes
}

/// 把名字表整理成稳定的提示串
fn available(names: impl Iterator<Item = impl AsRef<str>>) -> String {
    let mut names: Vec<String> = names.map(|n| n.as_ref().to_string()).collect();
    names.sort();
    if names.is_empty() {
        "(none configured)".to_string()
    } else {
        names.join(", ")
    }
}

impl AppConfig {
    /// 按名字解析运行模式；未知模式是用户可见的致命配置错误
    pub fn resolve_mode(&self, name: &str) -> Result<&ModeConfig, ConfigError> {
        self.modes.get(name).ok_or_else(|| ConfigError::UnknownMode {
            name: name.to_string(),
            available: available(self.modes.keys()),
        })
    }

    /// 根据模式的策略解析出音色配置
    ///
    /// instruct 策略忽略音色名；reference 策略要求命令行或配置提供
    /// 一个已知的音色档案名
    pub fn resolve_voice(
        &self,
        mode: &ModeConfig,
        voice_name: Option<&str>,
    ) -> Result<VoiceSpec, ConfigError> {
        match mode.strategy {
            SynthesisStrategy::Instruct => {
                Ok(VoiceSpec::Instruct(self.tts.default_instruct.clone()))
            }
            SynthesisStrategy::Reference => {
                let name = voice_name
                    .map(str::to_string)
                    .or_else(|| self.tts.default_voice.clone())
                    .ok_or_else(|| ConfigError::VoiceRequired {
                        available: available(self.voices.keys()),
                    })?;
                let profile = self.voices.get(&name).ok_or_else(|| {
                    ConfigError::UnknownVoice {
                        name: name.clone(),
                        available: available(self.voices.keys()),
                    }
                })?;
                Ok(VoiceSpec::Reference {
                    ref_audio: profile.ref_audio.clone(),
                    ref_text: profile.ref_text.clone(),
                })
            }
        }
    }
}
