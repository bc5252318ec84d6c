use crate::config::LoggingConfig;
use tracing_subscriber::{EnvFilter, fmt};

/// 初始化日志系统
///
/// 优先级: RUST_LOG > 命令行 --log-level > 配置文件
pub fn init(config: &LoggingConfig, cli_level: Option<&str>) {
    let level = cli_level.unwrap_or(&config.level);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_line_number(true)
        .init();
}
