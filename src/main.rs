//! Langdu - 批量文本朗读流水线
//!
//! 扫描 input 目录中的待处理 txt 文件，为每个文件：
//! 分段 → 逐片段合成（可断点续跑）→ 合并为单个 wav → 音量增益 →
//! 清理片段工件并把源文件改名为 finished_* 标记完成

use std::sync::Arc;

use clap::Parser;

use langdu::application::{CoordinatorConfig, JobCoordinator};
use langdu::cli::Cli;
use langdu::config::{load_config_from_path, print_config};
use langdu::domain::text_segmenter::SegmentConfig;
use langdu::infrastructure::adapters::{
    FfmpegGainBooster, FsJobStore, HttpTtsClient, HttpTtsClientConfig, WavMerger,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 加载配置（优先级：环境变量 > 配置文件 > 默认值），命令行目录覆盖最高
    let mut config = load_config_from_path(cli.config.as_deref())?;
    if let Some(dir) = cli.input_dir {
        config.storage.input_dir = dir;
    }
    if let Some(dir) = cli.output_dir {
        config.storage.output_dir = dir;
    }

    // 初始化日志
    let log_filter = format!("{},langdu={}", config.log.level, config.log.level);
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_filter)),
        )
        .init();

    tracing::info!("Langdu - 批量文本朗读流水线");
    print_config(&config);

    // 解析模式与音色；未知模式/音色名直接以配置错误退出
    let mode_name = cli
        .mode
        .clone()
        .unwrap_or_else(|| config.tts.default_mode.clone());
    let mode = config.resolve_mode(&mode_name)?.clone();
    let voice = config.resolve_voice(&mode, cli.voice.as_deref())?;
    tracing::info!(mode = %mode_name, model = %mode.model, "Resolved synthesis mode");

    // 组装适配器
    let store = Arc::new(
        FsJobStore::new(&config.storage.input_dir, &config.storage.output_dir).await?,
    );
    let tts = Arc::new(HttpTtsClient::new(
        HttpTtsClientConfig::new(config.tts.url.clone()).with_timeout(config.tts.timeout_secs),
    )?);
    let merger = Arc::new(WavMerger::new());
    let gain = Arc::new(FfmpegGainBooster::new(config.audio.gain_command.clone()));

    let coordinator = JobCoordinator::new(
        store,
        tts,
        merger,
        gain,
        CoordinatorConfig {
            segment: SegmentConfig {
                max_chars: config.segment.max_chars,
            },
            model: mode.model.clone(),
            lang: config.tts.lang.clone(),
            max_tokens: config.tts.max_tokens,
            gain_factor: config.audio.gain_factor,
        },
    );

    coordinator.run_batch(&voice).await?;
    Ok(())
}
