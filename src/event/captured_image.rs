use chrono::NaiveDateTime;

/// 一次成功拍摄的静态图像
///
/// `data` 保存设备输出的原始编码 (JPEG/PNG), 直到合成动图时才解码
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedImage {
    pub timestamp: NaiveDateTime,
    pub data: Vec<u8>,
}

impl CapturedImage {
    pub fn new(timestamp: NaiveDateTime, data: Vec<u8>) -> Self {
        Self { timestamp, data }
    }
}
