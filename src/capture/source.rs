use std::time::Duration;
use thiserror::Error;

/// 单帧拍摄失败的原因
///
/// 所有变体都是可恢复的: 调度循环记录日志后跳过本次拍摄
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("failed to start `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("camera I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("camera did not produce a frame within {0:?}")]
    Timeout(Duration),

    #[error("camera command exited with {status}: {stderr}")]
    Exit { status: String, stderr: String },

    #[error("camera produced no data")]
    EmptyFrame,

    #[error("camera output is not an image: {0}")]
    NotAnImage(#[source] image::ImageError),

    #[error("failed to encode frame: {0}")]
    Encode(#[source] image::ImageError),
}

/// 静态图像来源
///
/// 每次调用返回一帧已编码的图像; 设备只在调用期间被占用
pub trait CaptureSource {
    async fn capture(&mut self) -> Result<Vec<u8>, CaptureError>;

    fn name(&self) -> &str;
}
