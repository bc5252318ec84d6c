use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::capture::{Camera, CaptureSource};
use crate::config::{Config, init};
use crate::delivery::DeliveryClient;
use crate::scheduler::{Scheduler, SystemClock};
use crate::timelapse::TimelapseEncoder;

#[derive(Parser)]
#[command(name = "plant-cam")]
#[command(about = "白天定时拍照, 每天生成一张延时动图并发送到 Telegram", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 启动拍摄调度
    Run {
        /// 配置文件路径 (默认 ~/.config/plant-cam/config.toml)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// 日志等级 (trace, debug, info, warn, error)
        #[arg(short, long)]
        log_level: Option<String>,

        /// 使用合成图像代替摄像头
        #[arg(long)]
        test_source: bool,
    },

    /// 拍一张照片并保存, 用于检查摄像头命令 (只校验 [camera] 配置)
    Snapshot {
        /// 配置文件路径
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// 输出文件
        #[arg(short, long)]
        output: PathBuf,

        /// 使用合成图像代替摄像头
        #[arg(long)]
        test_source: bool,
    },

    /// 校验配置文件并打印生效的设置
    CheckConfig {
        /// 配置文件路径
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

/// CLI 入口函数
pub async fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            log_level,
            test_source,
        } => {
            start(config.as_deref(), log_level, test_source).await?;
        }
        Commands::Snapshot {
            config,
            output,
            test_source,
        } => {
            snapshot(config.as_deref(), &output, test_source).await?;
        }
        Commands::CheckConfig { config } => {
            check_config(config.as_deref())?;
        }
    }

    Ok(())
}

/// 启动调度循环, 收到 SIGINT/SIGTERM 后投递剩余图像再退出
async fn start(
    config_path: Option<&Path>,
    log_level: Option<String>,
    test_source: bool,
) -> Result<()> {
    let (config, loaded_from) = Config::resolve(config_path)?;
    init::init(&config.logging, log_level.as_deref());

    match loaded_from {
        Some(path) => info!("Loaded config from {}", path.display()),
        None => warn!("No config file found, using built-in defaults"),
    }
    info!("Schedule: {}", config.schedule);

    let camera = Camera::from_config(&config.camera, test_source);
    let delivery =
        DeliveryClient::from_config(&config.delivery).context("Failed to set up delivery")?;
    let encoder = TimelapseEncoder::new(&config.timelapse);

    let mut scheduler = Scheduler::new(camera, delivery, SystemClock, &config.schedule, encoder);

    let cancel = CancellationToken::new();
    spawn_signal_handler(cancel.clone());

    scheduler.run(cancel).await;
    info!("Program stopped");

    Ok(())
}

/// 拍一张照片并写入文件
async fn snapshot(config_path: Option<&Path>, output: &Path, test_source: bool) -> Result<()> {
    let (config, _) = Config::resolve_camera(config_path)?;
    let mut camera = Camera::from_config(&config.camera, test_source);

    println!("正在通过 {} 拍照...", camera.name());
    let data = camera.capture().await.context("拍照失败")?;

    tokio::fs::write(output, &data)
        .await
        .with_context(|| format!("无法写入 {}", output.display()))?;
    println!("已保存 {} 字节到: {}", data.len(), output.display());

    Ok(())
}

fn check_config(config_path: Option<&Path>) -> Result<()> {
    let (config, loaded_from) = Config::resolve(config_path)?;

    match loaded_from {
        Some(path) => println!("配置文件: {}", path.display()),
        None => println!("未找到配置文件, 使用内置默认值"),
    }
    println!("调度: {}", config.schedule);
    println!("摄像头命令: {}", config.camera.command.join(" "));
    println!("每帧时长: {}ms", config.timelapse.frame_duration_ms);
    println!(
        "投递: telegram={}, archive={}",
        config.delivery.telegram.enable, config.delivery.archive.enable
    );

    Ok(())
}

/// 第一次信号触发取消; 之后的信号只记录日志, 不会重复投递
fn spawn_signal_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        wait_for_signal().await;
        info!("Shutdown signal received, flushing captured images");
        cancel.cancel();

        loop {
            wait_for_signal().await;
            warn!("Already shutting down, ignoring signal");
        }
    });
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    let mut terminate = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            warn!("Failed to install SIGTERM handler: {}", e);
            ctrl_c().await;
            return;
        }
    };

    tokio::select! {
        _ = ctrl_c() => {}
        _ = terminate.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    ctrl_c().await;
}

async fn ctrl_c() {
    signal_installed(tokio::signal::ctrl_c().await).await;
}

/// 监听失败时永远挂起, 不能当作收到了信号
async fn signal_installed(result: std::io::Result<()>) {
    if let Err(e) = result {
        warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}
