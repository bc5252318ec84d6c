use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::config::TelegramConfig;
use crate::delivery::DeliveryError;
use crate::timelapse::TimelapseArtifact;

/// Bot API 的通用返回结构
#[derive(Debug, Deserialize)]
struct ApiReply {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

/// 通过 Telegram Bot API 发送延时动图
pub struct TelegramClient {
    client: reqwest::Client,
    api_base: String,
    bot_token: String,
    chat_id: String,
}

impl TelegramClient {
    pub fn new(config: &TelegramConfig) -> Result<Self, DeliveryError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(DeliveryError::http)?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            bot_token: config.bot_token.clone(),
            chat_id: config.chat_id.clone(),
        })
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.bot_token, method)
    }

    /// 调用 `sendDocument`, 以文件形式上传, 避免 Telegram 把 GIF 转成视频
    pub async fn send_document(&self, artifact: &TimelapseArtifact) -> Result<(), DeliveryError> {
        let document = Part::bytes(artifact.data.clone())
            .file_name(artifact.filename.clone())
            .mime_str("image/gif")
            .map_err(DeliveryError::http)?;

        let form = Form::new()
            .text("chat_id", self.chat_id.clone())
            .text("caption", caption(artifact))
            .part("document", document);

        debug!(
            "Uploading {} ({} bytes) to chat {}",
            artifact.filename,
            artifact.data.len(),
            self.chat_id
        );

        let response = self
            .client
            .post(self.endpoint("sendDocument"))
            .multipart(form)
            .send()
            .await
            .map_err(DeliveryError::http)?;

        let status = response.status();
        let reply = match response.json::<ApiReply>().await {
            Ok(reply) => reply,
            Err(_) if !status.is_success() => {
                return Err(DeliveryError::Rejected {
                    status: status.as_u16(),
                    description: status.canonical_reason().unwrap_or("unknown").to_string(),
                });
            }
            Err(e) => return Err(DeliveryError::http(e)),
        };

        if !status.is_success() || !reply.ok {
            return Err(DeliveryError::Rejected {
                status: status.as_u16(),
                description: reply
                    .description
                    .unwrap_or_else(|| "no description".to_string()),
            });
        }

        Ok(())
    }
}

fn caption(artifact: &TimelapseArtifact) -> String {
    format!(
        "Timelapse {} to {}, {} frames",
        artifact.first_capture.format("%Y-%m-%d %H:%M"),
        artifact.last_capture.format("%H:%M"),
        artifact.frame_count
    )
}
