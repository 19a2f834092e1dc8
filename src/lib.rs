//! Langdu - 批量文本朗读流水线
//!
//! 架构: Hexagonal (Ports & Adapters)
//!
//! 领域层 (domain/):
//! - text_segmenter: 纯函数文本分段（段落/句子边界 + 累积合并）
//! - job: 任务与音色领域对象
//!
//! 应用层 (application/):
//! - Ports: 出站端口（TtsEngine, JobStore, AudioMerger, GainBoost）
//! - Coordinator: 批处理调度器，串行驱动任务状态机
//!
//! 基础设施层 (infrastructure/):
//! - Adapters: HTTP/Fake TTS 客户端、文件系统任务存储、
//!   WAV 合并器、ffmpeg 增益

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::{load_config, AppConfig};
