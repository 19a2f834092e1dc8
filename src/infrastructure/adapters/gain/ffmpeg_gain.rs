//! FFmpeg Gain Booster - 调用外部 ffmpeg 做音量增益
//!
//! `ffmpeg -y -i <in> -filter:a volume=<factor> <boosted>`，
//! 成功后用增益文件原子替换原文件；工具缺失或失败都只是可恢复错误，
//! 由调用方决定降级策略

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::process::Command;

use crate::application::ports::{GainBoostPort, GainError};

/// 错误信息里保留的 stderr 尾部长度
const STDERR_TAIL: usize = 300;

/// 基于 ffmpeg 的增益适配器
pub struct FfmpegGainBooster {
    /// 外部命令名（默认 ffmpeg，测试时可替换）
    program: String,
}

impl FfmpegGainBooster {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// 增益中间文件路径：与原文件同目录的 `{stem}_boosted.wav`
    fn boosted_path(path: &Path) -> Result<PathBuf, GainError> {
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| GainError::IoError(format!("Bad path: {}", path.display())))?;
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        Ok(parent.join(format!("{}_boosted.wav", stem)))
    }
}

impl Default for FfmpegGainBooster {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

#[async_trait]
impl GainBoostPort for FfmpegGainBooster {
    async fn apply_gain(&self, path: &Path, factor: f32) -> Result<PathBuf, GainError> {
        let boosted = Self::boosted_path(path)?;

        let output = Command::new(&self.program)
            .arg("-y")
            .arg("-i")
            .arg(path)
            .arg("-filter:a")
            .arg(format!("volume={}", factor))
            .arg(&boosted)
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    GainError::ToolUnavailable(self.program.clone())
                } else {
                    GainError::IoError(e.to_string())
                }
            })?;

        if !output.status.success() {
            // 失败时清理可能的半成品，保持原文件不动
            let _ = fs::remove_file(&boosted).await;
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(GainError::ToolFailed(tail(&stderr, STDERR_TAIL)));
        }

        if fs::metadata(&boosted).await.is_err() {
            return Err(GainError::NoOutput(boosted.display().to_string()));
        }

        // 增益文件就位后替换原文件（同目录 rename，对调用方是原子换名）
        fs::remove_file(path)
            .await
            .map_err(|e| GainError::IoError(e.to_string()))?;
        fs::rename(&boosted, path)
            .await
            .map_err(|e| GainError::IoError(e.to_string()))?;

        Ok(path.to_path_buf())
    }
}

/// 取字符串尾部 max_chars 个字符（ffmpeg 的有效报错在末尾）
fn tail(s: &str, max_chars: usize) -> String {
    let count = s.chars().count();
    if count <= max_chars {
        s.trim().to_string()
    } else {
        s.chars().skip(count - max_chars).collect::<String>().trim().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn input_file(dir: &TempDir) -> PathBuf {
        let path = dir.path().join("merged.wav");
        std::fs::write(&path, b"fake wav bytes").unwrap();
        path
    }

    #[tokio::test]
    async fn missing_tool_is_reported_as_unavailable() {
        let dir = TempDir::new().unwrap();
        let path = input_file(&dir);
        let booster = FfmpegGainBooster::new("definitely-not-a-real-command");

        let err = booster.apply_gain(&path, 1.8).await.unwrap_err();
        assert!(matches!(err, GainError::ToolUnavailable(_)));
        // 原文件保持原样
        assert_eq!(std::fs::read(&path).unwrap(), b"fake wav bytes");
    }

    #[tokio::test]
    async fn failing_tool_keeps_original() {
        let dir = TempDir::new().unwrap();
        let path = input_file(&dir);
        let booster = FfmpegGainBooster::new("false");

        let err = booster.apply_gain(&path, 1.8).await.unwrap_err();
        assert!(matches!(err, GainError::ToolFailed(_)));
        assert_eq!(std::fs::read(&path).unwrap(), b"fake wav bytes");
    }

    #[tokio::test]
    async fn tool_without_output_is_reported() {
        let dir = TempDir::new().unwrap();
        let path = input_file(&dir);
        // `true` 退出码为 0 但不产出文件
        let booster = FfmpegGainBooster::new("true");

        let err = booster.apply_gain(&path, 1.8).await.unwrap_err();
        assert!(matches!(err, GainError::NoOutput(_)));
        assert_eq!(std::fs::read(&path).unwrap(), b"fake wav bytes");
    }

    #[test]
    fn boosted_path_is_sibling_with_suffix() {
        let boosted = FfmpegGainBooster::boosted_path(Path::new("output/story.wav")).unwrap();
        assert_eq!(boosted, PathBuf::from("output/story_boosted.wav"));
    }

    #[test]
    fn tail_keeps_end_of_long_output() {
        let long = format!("{}ERROR at end", "x".repeat(500));
        let t = tail(&long, 20);
        assert!(t.ends_with("ERROR at end"));
        assert!(t.chars().count() <= 20);
    }
}
