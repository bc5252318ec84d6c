use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

pub const ENV_BOT_TOKEN: &str = "TELEGRAM_BOT_TOKEN";
pub const ENV_CHAT_ID: &str = "TELEGRAM_CHAT_ID";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub schedule: ScheduleConfig,
    pub camera: CameraConfig,
    pub timelapse: TimelapseConfig,
    pub delivery: DeliveryConfig,
    pub logging: LoggingConfig,
}

/// 拍摄节奏与白天窗口
///
/// 白天判断使用开区间: `daylight_start_hour < hour < daylight_end_hour`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub interval_secs: u64,
    pub daylight_start_hour: u32,
    pub daylight_end_hour: u32,
    pub tick_millis: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            interval_secs: 60 * 30,
            daylight_start_hour: 5,
            daylight_end_hour: 22,
            tick_millis: 1000,
        }
    }
}

impl fmt::Display for ScheduleConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "interval={}s, daylight=({}, {}), tick={}ms",
            self.interval_secs, self.daylight_start_hour, self.daylight_end_hour, self.tick_millis
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// 拍照命令, 需要把一帧编码后的图像写到 stdout
    pub command: Vec<String>,
    pub timeout_secs: u64,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            command: ["fswebcam", "--no-banner", "-r", "1280x720", "--jpeg", "90", "-"]
                .into_iter()
                .map(String::from)
                .collect(),
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelapseConfig {
    pub frame_duration_ms: u32,
    /// 超过此宽度的帧会被等比缩小
    pub max_width: Option<u32>,
}

impl Default for TimelapseConfig {
    fn default() -> Self {
        Self {
            frame_duration_ms: 250,
            max_width: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DeliveryConfig {
    pub telegram: TelegramConfig,
    pub archive: ArchiveConfig,
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    pub enable: bool,
    pub bot_token: String,
    pub chat_id: String,
    pub api_base: String,
    pub timeout_secs: u64,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            enable: true,
            bot_token: String::new(),
            chat_id: String::new(),
            api_base: "https://api.telegram.org".to_string(),
            timeout_secs: 60,
        }
    }
}

// token 不能出现在日志里
impl fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("enable", &self.enable)
            .field("bot_token", &"<redacted>")
            .field("chat_id", &self.chat_id)
            .field("api_base", &self.api_base)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    pub enable: bool,
    pub path: String,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            enable: false,
            path: "/var/lib/plant-cam".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// 从指定路径加载配置, 并应用环境变量覆盖
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Self::parse_from(path)?;
        config.validate()?;
        Ok(config)
    }

    fn load_camera_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Self::parse_from(path)?;
        config.validate_camera()?;
        Ok(config)
    }

    fn parse_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).context("Failed to read config file")?;
        let mut config: Config = toml::from_str(&content).context("Failed to parse config file")?;
        config.apply_env();
        Ok(config)
    }

    /// 按命令行参数、默认路径、内置默认值的顺序确定配置
    ///
    /// 返回实际读取的文件路径; 使用内置默认值时为 `None`
    pub fn resolve(path: Option<&Path>) -> Result<(Self, Option<PathBuf>)> {
        Self::resolve_with(path, |p| Self::load_from(p), Self::validate)
    }

    /// 同 `resolve`, 但只校验摄像头部分; 单次拍照不需要投递凭据
    pub fn resolve_camera(path: Option<&Path>) -> Result<(Self, Option<PathBuf>)> {
        Self::resolve_with(path, |p| Self::load_camera_from(p), Self::validate_camera)
    }

    fn resolve_with(
        path: Option<&Path>,
        load: fn(&Path) -> Result<Self>,
        check: fn(&Self) -> Result<()>,
    ) -> Result<(Self, Option<PathBuf>)> {
        let path = match path {
            Some(path) => Some(path.to_path_buf()),
            None => Some(Self::default_config_path()?).filter(|p| p.exists()),
        };

        let config = match &path {
            Some(path) => {
                load(path).with_context(|| format!("Failed to load {}", path.display()))?
            }
            None => {
                let mut config = Config::default();
                config.apply_env();
                check(&config)?;
                config
            }
        };

        Ok((config, path))
    }

    /// 获取默认配置文件路径
    pub fn default_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("无法获取配置目录")?
            .join("plant-cam");
        Ok(config_dir.join("config.toml"))
    }

    fn apply_env(&mut self) {
        self.apply_overrides(
            std::env::var(ENV_BOT_TOKEN).ok(),
            std::env::var(ENV_CHAT_ID).ok(),
        );
    }

    fn apply_overrides(&mut self, token: Option<String>, chat_id: Option<String>) {
        if let Some(token) = token.filter(|t| !t.is_empty()) {
            self.delivery.telegram.bot_token = token;
        }
        if let Some(chat_id) = chat_id.filter(|c| !c.is_empty()) {
            self.delivery.telegram.chat_id = chat_id;
        }
    }

    pub fn validate(&self) -> Result<()> {
        let schedule = &self.schedule;
        if schedule.interval_secs == 0 {
            anyhow::bail!("schedule.interval_secs 必须大于 0");
        }
        if schedule.tick_millis == 0 {
            anyhow::bail!("schedule.tick_millis 必须大于 0");
        }
        if schedule.daylight_end_hour > 24 {
            anyhow::bail!("schedule.daylight_end_hour 必须在 0-24 之间");
        }
        if schedule.daylight_start_hour.saturating_add(1) >= schedule.daylight_end_hour {
            anyhow::bail!(
                "白天窗口 ({}, {}) 不包含任何小时",
                schedule.daylight_start_hour,
                schedule.daylight_end_hour
            );
        }

        self.validate_camera()?;

        if self.timelapse.frame_duration_ms == 0 {
            anyhow::bail!("timelapse.frame_duration_ms 必须大于 0");
        }
        if self.timelapse.max_width == Some(0) {
            anyhow::bail!("timelapse.max_width 必须大于 0");
        }

        let telegram = &self.delivery.telegram;
        if telegram.enable {
            if telegram.bot_token.is_empty() {
                anyhow::bail!("已启用 Telegram, 但缺少 bot_token (或环境变量 {})", ENV_BOT_TOKEN);
            }
            if telegram.chat_id.is_empty() {
                anyhow::bail!("已启用 Telegram, 但缺少 chat_id (或环境变量 {})", ENV_CHAT_ID);
            }
        }

        if !telegram.enable && !self.delivery.archive.enable {
            anyhow::bail!("至少需要启用一个投递目标");
        }

        Ok(())
    }

    pub fn validate_camera(&self) -> Result<()> {
        if self.camera.command.is_empty() || self.camera.command[0].trim().is_empty() {
            anyhow::bail!("camera.command 不能为空");
        }
        if self.camera.timeout_secs == 0 {
            anyhow::bail!("camera.timeout_secs 必须大于 0");
        }
        Ok(())
    }
}
