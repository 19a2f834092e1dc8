//! 朗读任务领域对象
//!
//! 任务以源文本文件名（stem）标识，生命周期为
//! 待处理 → 分段 → 逐片段合成 → 合并 → 后处理 → 完成标记

use serde::Deserialize;
use std::path::PathBuf;

/// 一个待处理的朗读任务：一份源文本及其端到端处理生命周期
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    /// 任务标识（源文件去扩展名后的 stem）
    pub stem: String,
    /// 源文本文件路径
    pub source_path: PathBuf,
}

impl Job {
    pub fn new(stem: impl Into<String>, source_path: impl Into<PathBuf>) -> Self {
        Self {
            stem: stem.into(),
            source_path: source_path.into(),
        }
    }
}

/// 合成策略：决定音色配置采用哪种形式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SynthesisStrategy {
    /// 自然语言风格描述（voice design）
    Instruct,
    /// 参考音频克隆
    Reference,
}

/// 音色配置：二选一
///
/// 每个任务只应用其中一种形式，由运行模式决定
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoiceSpec {
    /// 风格/韵律的自然语言描述
    Instruct(String),
    /// 参考音频 + 参考文本，标识要克隆的音色
    Reference {
        ref_audio: PathBuf,
        ref_text: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strategy_deserializes_from_snake_case() {
        let s: SynthesisStrategy = serde_json::from_str("\"instruct\"").unwrap();
        assert_eq!(s, SynthesisStrategy::Instruct);
        let s: SynthesisStrategy = serde_json::from_str("\"reference\"").unwrap();
        assert_eq!(s, SynthesisStrategy::Reference);
    }

    #[test]
    fn job_stem_is_identity() {
        let job = Job::new("chapter_01", "input/chapter_01.txt");
        assert_eq!(job.stem, "chapter_01");
        assert_eq!(job.source_path, PathBuf::from("input/chapter_01.txt"));
    }
}
