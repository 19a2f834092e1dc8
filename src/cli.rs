//! 命令行参数
//!
//! 使用 clap derive 宏解析参数

use clap::Parser;
use std::path::PathBuf;

/// 批量文本朗读流水线
///
/// 扫描 input 目录的待处理 txt 文件，分段合成语音并合并为单个 wav
#[derive(Parser, Debug)]
#[command(name = "langdu", version, about = "批量文本朗读流水线")]
pub struct Cli {
    /// 运行模式（如 voice_design / base），默认取配置中的 default_mode
    #[arg(value_name = "MODE")]
    pub mode: Option<String>,

    /// 音色档案名（仅 reference 策略的模式下有意义）
    #[arg(value_name = "VOICE")]
    pub voice: Option<String>,

    /// 配置文件路径
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// 覆盖待处理源文本目录
    #[arg(long, value_name = "DIR")]
    pub input_dir: Option<PathBuf>,

    /// 覆盖产物输出目录
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,
}
