use image::{ImageFormat, Rgb, RgbImage};
use std::io::Cursor;

use crate::capture::source::{CaptureError, CaptureSource};

const WIDTH: u32 = 320;
const HEIGHT: u32 = 240;

/// 无硬件时使用的合成图像源
///
/// 每一帧是一张渐变图, 颜色随帧序号变化, 方便肉眼检查动图顺序
#[derive(Default)]
pub struct TestPattern {
    frame: u32,
}

impl TestPattern {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn render(&self, frame: u32) -> Result<Vec<u8>, CaptureError> {
        let shift = (frame.wrapping_mul(37) % 256) as u8;
        let image = RgbImage::from_fn(WIDTH, HEIGHT, |x, y| {
            let r = (x * 255 / WIDTH) as u8;
            let g = (y * 255 / HEIGHT) as u8;
            Rgb([r.wrapping_add(shift), g, shift])
        });

        let mut buf = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .map_err(CaptureError::Encode)?;
        Ok(buf)
    }
}

impl CaptureSource for TestPattern {
    async fn capture(&mut self) -> Result<Vec<u8>, CaptureError> {
        let data = self.render(self.frame)?;
        self.frame = self.frame.wrapping_add(1);
        Ok(data)
    }

    fn name(&self) -> &str {
        "test-pattern"
    }
}
