//! Configuration Loader
//!
//! 实现多源配置加载与合并逻辑
//!
//! 优先级（从高到低）：
//! 1. 环境变量
//! 2. 配置文件（config.toml）
//! 3. 默认值

use config::{Config, ConfigError as ConfigCrateError, Environment, File};
use std::path::Path;
use thiserror::Error;

use super::types::AppConfig;

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),

    #[error("Unknown mode '{name}'. Available modes: {available}")]
    UnknownMode { name: String, available: String },

    #[error("Unknown voice '{name}'. Available voices: {available}")]
    UnknownVoice { name: String, available: String },

    #[error("This mode requires a voice name. Available voices: {available}")]
    VoiceRequired { available: String },
}

impl From<ConfigCrateError> for ConfigError {
    fn from(err: ConfigCrateError) -> Self {
        ConfigError::LoadError(err.to_string())
    }
}

/// 配置文件搜索路径
const CONFIG_FILE_NAMES: &[&str] = &["config", "config.local"];

/// 加载应用配置
///
/// 按优先级从高到低合并配置：
/// 1. 环境变量（前缀 `LANGDU_`，层级分隔符 `__`）
/// 2. 配置文件（config.toml 或 config.local.toml）
/// 3. 默认值
///
/// # 环境变量示例
/// - `LANGDU_TTS__URL=http://tts-server:8000`
/// - `LANGDU_STORAGE__INPUT_DIR=/data/input`
/// - `LANGDU_SEGMENT__MAX_CHARS=150`
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from_path(None)
}

/// 从指定路径加载配置
///
/// # 参数
/// - `config_path` - 可选的配置文件路径，如果为 None 则使用默认搜索路径
pub fn load_config_from_path(config_path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut builder = Config::builder();

    // 1. 首先设置默认值（最低优先级）
    builder = builder
        .set_default("storage.input_dir", "input")?
        .set_default("storage.output_dir", "output")?
        .set_default("tts.url", "http://localhost:8000")?
        .set_default("tts.timeout_secs", 300)?
        .set_default("tts.default_mode", "voice_design")?
        .set_default(
            "tts.default_instruct",
            "A cheerful young female voice with clear pronunciation and moderate speed",
        )?
        .set_default("tts.lang", "chinese")?
        .set_default("tts.max_tokens", 4096)?
        .set_default("segment.max_chars", 200)?
        .set_default("audio.gain_factor", 1.8)?
        .set_default("audio.gain_command", "ffmpeg")?
        .set_default("log.level", "info")?
        .set_default(
            "modes.voice_design.model",
            "mlx-community/Qwen3-TTS-12Hz-1.7B-VoiceDesign-bf16",
        )?
        .set_default("modes.voice_design.strategy", "instruct")?
        .set_default(
            "modes.base.model",
            "mlx-community/Qwen3-TTS-12Hz-1.7B-Base-bf16",
        )?
        .set_default("modes.base.strategy", "reference")?;

    // 2. 添加配置文件（如果存在）
    if let Some(path) = config_path {
        builder = builder.add_source(File::from(path).required(true));
    } else {
        // 搜索默认配置文件
        for name in CONFIG_FILE_NAMES {
            builder = builder.add_source(File::with_name(name).required(false));
        }
    }

    // 3. 添加环境变量（最高优先级）
    // 前缀: LANGDU_
    // 层级分隔符: __ (双下划线)
    // 例如: LANGDU_TTS__URL=http://tts-server:8000
    builder = builder.add_source(
        Environment::with_prefix("LANGDU")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    );

    // 4. 构建配置
    let config = builder.build()?;

    // 5. 反序列化为 AppConfig
    let app_config: AppConfig = config
        .try_deserialize()
        .map_err(|e| ConfigError::ParseError(format!("Failed to deserialize config: {}", e)))?;

    // 6. 验证配置
    validate_config(&app_config)?;

    Ok(app_config)
}

/// 验证配置有效性
fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    if config.tts.url.is_empty() {
        return Err(ConfigError::ValidationError(
            "TTS URL cannot be empty".to_string(),
        ));
    }

    if config.segment.max_chars == 0 {
        return Err(ConfigError::ValidationError(
            "segment.max_chars cannot be 0".to_string(),
        ));
    }

    if config.audio.gain_factor <= 0.0 {
        return Err(ConfigError::ValidationError(
            "audio.gain_factor must be positive".to_string(),
        ));
    }

    if config.modes.is_empty() {
        return Err(ConfigError::ValidationError(
            "at least one mode must be configured".to_string(),
        ));
    }

    for (name, profile) in &config.voices {
        if profile.ref_text.is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "voice '{}' has an empty ref_text",
                name
            )));
        }
    }

    Ok(())
}

/// 打印配置信息（用于启动时日志）
pub fn print_config(config: &AppConfig) {
    tracing::info!("=== Application Configuration ===");
    tracing::info!("Input Dir: {}", config.storage.input_dir.display());
    tracing::info!("Output Dir: {}", config.storage.output_dir.display());
    tracing::info!("TTS URL: {}", config.tts.url);
    tracing::info!("TTS Timeout: {}s", config.tts.timeout_secs);
    tracing::info!("Default Mode: {}", config.tts.default_mode);
    tracing::info!("Language: {}", config.tts.lang);
    tracing::info!("Max Segment Chars: {}", config.segment.max_chars);
    tracing::info!("Gain Factor: {}", config.audio.gain_factor);
    tracing::info!("Modes: {}", config.modes.len());
    tracing::info!("Voice Profiles: {}", config.voices.len());
    tracing::info!("Log Level: {}", config.log.level);
    tracing::info!("=================================");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn validation_error_for_empty_tts_url() {
        let mut config = AppConfig::default();
        config.tts.url = String::new();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn validation_error_for_zero_max_chars() {
        let mut config = AppConfig::default();
        config.segment.max_chars = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn validation_error_for_non_positive_gain() {
        let mut config = AppConfig::default();
        config.audio.gain_factor = 0.0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn validation_error_for_empty_modes() {
        let mut config = AppConfig::default();
        config.modes.clear();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn config_file_overrides_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[segment]
max_chars = 150

[voices.jason]
ref_audio = "voices/jason.wav"
ref_text = "大家好，我是Jason"
"#,
        )
        .unwrap();

        let config = load_config_from_path(Some(&path)).unwrap();
        assert_eq!(config.segment.max_chars, 150);
        assert!(config.voices.contains_key("jason"));
        // 未覆盖的键保持默认
        assert_eq!(config.tts.lang, "chinese");
        assert!(config.modes.contains_key("base"));
    }
}
