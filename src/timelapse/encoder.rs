use chrono::NaiveDateTime;
use image::codecs::gif::{GifEncoder, Repeat};
use image::imageops::FilterType;
use image::{Delay, DynamicImage, Frame, ImageError};
use thiserror::Error;

use crate::config::TimelapseConfig;
use crate::event::CapturedImage;

#[derive(Debug, Error)]
pub enum EncodingError {
    #[error("no images to encode")]
    Empty,

    #[error("frame duration must be positive")]
    ZeroDuration,

    #[error("image #{index} captured at {timestamp} is unreadable: {source}")]
    Decode {
        index: usize,
        timestamp: NaiveDateTime,
        #[source]
        source: ImageError,
    },

    #[error("failed to write GIF: {0}")]
    Gif(#[source] ImageError),
}

/// 一次合成的延时动图, 只在内存中存在到投递结束
#[derive(Debug, Clone)]
pub struct TimelapseArtifact {
    pub filename: String,
    pub data: Vec<u8>,
    pub frame_count: usize,
    pub first_capture: NaiveDateTime,
    pub last_capture: NaiveDateTime,
}

/// 延时动图文件名, 精确到秒
pub fn artifact_filename(at: NaiveDateTime) -> String {
    format!("webcam_timelapse_{}.gif", at.format("%Y%m%d-%H%M%S"))
}

/// 把有序图像序列编码为循环播放的 GIF
#[derive(Debug, Clone)]
pub struct TimelapseEncoder {
    frame_duration_ms: u32,
    max_width: Option<u32>,
}

impl TimelapseEncoder {
    pub fn new(config: &TimelapseConfig) -> Self {
        Self {
            frame_duration_ms: config.frame_duration_ms,
            max_width: config.max_width,
        }
    }

    pub fn frame_duration_ms(&self) -> u32 {
        self.frame_duration_ms
    }

    /// 帧顺序与输入顺序一致; `at` 决定文件名中的时间戳
    pub fn encode(
        &self,
        images: &[CapturedImage],
        at: NaiveDateTime,
    ) -> Result<TimelapseArtifact, EncodingError> {
        let (first, last) = match (images.first(), images.last()) {
            (Some(first), Some(last)) => (first.timestamp, last.timestamp),
            _ => return Err(EncodingError::Empty),
        };
        if self.frame_duration_ms == 0 {
            return Err(EncodingError::ZeroDuration);
        }

        let delay = Delay::from_numer_denom_ms(self.frame_duration_ms, 1);
        let mut data = Vec::new();
        {
            let mut encoder = GifEncoder::new(&mut data);
            encoder
                .set_repeat(Repeat::Infinite)
                .map_err(EncodingError::Gif)?;

            let mut canvas: Option<(u32, u32)> = None;
            for (index, image) in images.iter().enumerate() {
                let decoded = image::load_from_memory(&image.data).map_err(|source| {
                    EncodingError::Decode {
                        index,
                        timestamp: image.timestamp,
                        source,
                    }
                })?;

                // 所有帧统一为第一帧 (缩放后) 的尺寸
                let (width, height) = *canvas.get_or_insert_with(|| self.target_size(&decoded));
                let decoded = if decoded.width() != width || decoded.height() != height {
                    decoded.resize_exact(width, height, FilterType::Triangle)
                } else {
                    decoded
                };

                encoder
                    .encode_frame(Frame::from_parts(decoded.to_rgba8(), 0, 0, delay))
                    .map_err(EncodingError::Gif)?;
            }
        }

        Ok(TimelapseArtifact {
            filename: artifact_filename(at),
            data,
            frame_count: images.len(),
            first_capture: first,
            last_capture: last,
        })
    }

    fn target_size(&self, image: &DynamicImage) -> (u32, u32) {
        let (width, height) = (image.width(), image.height());
        match self.max_width {
            Some(max) if max > 0 && width > max => {
                let scaled = (u64::from(height) * u64::from(max) / u64::from(width)).max(1);
                (max, scaled as u32)
            }
            _ => (width, height),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use image::codecs::gif::GifDecoder;
    use image::{AnimationDecoder, ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;

    fn at(hour: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(hour, min, 0)
            .unwrap()
    }

    fn solid(color: [u8; 3], width: u32, height: u32, ts: NaiveDateTime) -> CapturedImage {
        let image = RgbImage::from_pixel(width, height, Rgb(color));
        let mut buf = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        CapturedImage::new(ts, buf)
    }

    fn encoder(frame_duration_ms: u32, max_width: Option<u32>) -> TimelapseEncoder {
        TimelapseEncoder::new(&TimelapseConfig {
            frame_duration_ms,
            max_width,
        })
    }

    fn decode(data: &[u8]) -> Vec<Frame> {
        GifDecoder::new(Cursor::new(data))
            .unwrap()
            .into_frames()
            .collect_frames()
            .unwrap()
    }

    fn dominant_channel(frame: &Frame) -> usize {
        let pixel = frame.buffer().get_pixel(0, 0).0;
        (0..3).max_by_key(|&c| pixel[c]).unwrap()
    }

    #[test]
    fn test_frame_order_matches_input() {
        let images = vec![
            solid([255, 0, 0], 16, 16, at(8, 0)),
            solid([0, 255, 0], 16, 16, at(8, 30)),
            solid([0, 0, 255], 16, 16, at(9, 0)),
        ];

        for duration in [100, 250, 1000] {
            let artifact = encoder(duration, None).encode(&images, at(23, 59)).unwrap();
            assert_eq!(artifact.frame_count, 3);

            let frames = decode(&artifact.data);
            let order: Vec<usize> = frames.iter().map(dominant_channel).collect();
            assert_eq!(order, vec![0, 1, 2]);

            for frame in &frames {
                let (numer, denom) = frame.delay().numer_denom_ms();
                assert_eq!(numer / denom, duration);
            }
        }
    }

    #[test]
    fn test_artifact_metadata() {
        let images = vec![
            solid([10, 10, 10], 8, 8, at(6, 15)),
            solid([20, 20, 20], 8, 8, at(21, 45)),
        ];
        let stamp = NaiveDate::from_ymd_opt(2024, 6, 2)
            .unwrap()
            .and_hms_opt(0, 0, 1)
            .unwrap();

        let artifact = encoder(250, None).encode(&images, stamp).unwrap();
        assert_eq!(artifact.filename, "webcam_timelapse_20240602-000001.gif");
        assert_eq!(artifact.first_capture, at(6, 15));
        assert_eq!(artifact.last_capture, at(21, 45));
        assert!(artifact.data.starts_with(b"GIF89a"));
    }

    #[test]
    fn test_empty_input() {
        let err = encoder(250, None).encode(&[], at(0, 0)).unwrap_err();
        assert!(matches!(err, EncodingError::Empty));
    }

    #[test]
    fn test_zero_duration() {
        let images = vec![solid([1, 2, 3], 4, 4, at(8, 0))];
        let err = encoder(0, None).encode(&images, at(0, 0)).unwrap_err();
        assert!(matches!(err, EncodingError::ZeroDuration));
    }

    #[test]
    fn test_corrupt_payload_reports_index() {
        let images = vec![
            solid([1, 2, 3], 4, 4, at(8, 0)),
            CapturedImage::new(at(8, 30), b"not an image".to_vec()),
        ];
        match encoder(250, None).encode(&images, at(0, 0)).unwrap_err() {
            EncodingError::Decode { index, timestamp, .. } => {
                assert_eq!(index, 1);
                assert_eq!(timestamp, at(8, 30));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_max_width_downscales_and_unifies_size() {
        let images = vec![
            solid([200, 0, 0], 64, 32, at(8, 0)),
            solid([0, 200, 0], 40, 40, at(8, 30)),
        ];
        let artifact = encoder(250, Some(32)).encode(&images, at(0, 0)).unwrap();

        for frame in decode(&artifact.data) {
            assert_eq!(frame.buffer().dimensions(), (32, 16));
        }
    }
}
