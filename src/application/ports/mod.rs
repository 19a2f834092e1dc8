//! Application Ports - 出站端口定义
//!
//! 定义应用层与基础设施层的抽象接口

mod audio_merger;
mod gain_boost;
mod job_store;
mod tts_engine;

pub use audio_merger::{AudioMergerPort, MergeError, MergeInfo};
pub use gain_boost::{GainBoostPort, GainError};
pub use job_store::{JobStoreError, JobStorePort};
pub use tts_engine::{SynthesisRequest, SynthesisResponse, TtsEnginePort, TtsError};
