mod archive;
mod telegram;

use std::path::PathBuf;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::config::DeliveryConfig;
use crate::timelapse::TimelapseArtifact;

pub use archive::Archive;
pub use telegram::TelegramClient;

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("telegram request failed: {0}")]
    Http(#[source] reqwest::Error),

    #[error("telegram rejected the upload ({status}): {description}")]
    Rejected { status: u16, description: String },

    #[error("failed to archive {path}: {source}")]
    Archive {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no delivery destination configured")]
    NoDestination,
}

impl DeliveryError {
    // reqwest 的错误信息包含请求 URL, 而 URL 里有 bot token
    fn http(err: reqwest::Error) -> Self {
        DeliveryError::Http(err.without_url())
    }
}

/// 延时动图的投递目标
///
/// 失败以 `Err` 返回给调用方记录, 不重试也不重新排队
pub trait Delivery {
    async fn deliver(&self, artifact: &TimelapseArtifact) -> Result<(), DeliveryError>;
}

/// 按配置组合 Telegram 与本地归档
///
/// 启用 Telegram 时, 归档目录只保存投递失败的动图; 否则归档目录就是投递目标
pub struct DeliveryClient {
    telegram: Option<TelegramClient>,
    archive: Option<Archive>,
}

impl DeliveryClient {
    pub fn new(telegram: Option<TelegramClient>, archive: Option<Archive>) -> Self {
        Self { telegram, archive }
    }

    pub fn from_config(config: &DeliveryConfig) -> Result<Self, DeliveryError> {
        let telegram = if config.telegram.enable {
            Some(TelegramClient::new(&config.telegram)?)
        } else {
            None
        };
        let archive = config
            .archive
            .enable
            .then(|| Archive::new(&config.archive.path));

        Ok(Self::new(telegram, archive))
    }
}

impl Delivery for DeliveryClient {
    async fn deliver(&self, artifact: &TimelapseArtifact) -> Result<(), DeliveryError> {
        match (&self.telegram, &self.archive) {
            (Some(telegram), archive) => {
                let result = telegram.send_document(artifact).await;
                if result.is_err() {
                    if let Some(archive) = archive {
                        match archive.store(artifact).await {
                            Ok(path) => {
                                warn!("Saved undelivered timelapse to {}", path.display())
                            }
                            Err(e) => error!("Failed to save undelivered timelapse: {}", e),
                        }
                    }
                }
                result
            }
            (None, Some(archive)) => {
                let path = archive.store(artifact).await?;
                info!("Timelapse archived to {}", path.display());
                Ok(())
            }
            (None, None) => Err(DeliveryError::NoDestination),
        }
    }
}
