use crate::event::CapturedImage;

/// 当天已拍摄图像的有序集合
///
/// 只追加; 插入顺序即拍摄顺序。每次日切或退出时整体清空一次。
#[derive(Debug, Default)]
pub struct Accumulator {
    images: Vec<CapturedImage>,
}

impl Accumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, image: CapturedImage) {
        self.images.push(image);
    }

    /// 只读视图, 不转移所有权
    pub fn snapshot(&self) -> &[CapturedImage] {
        &self.images
    }

    pub fn clear(&mut self) {
        self.images.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn image(hour: u32, byte: u8) -> CapturedImage {
        let ts = NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap();
        CapturedImage::new(ts, vec![byte])
    }

    #[test]
    fn test_append_preserves_order() {
        let mut acc = Accumulator::new();
        acc.append(image(8, 1));
        acc.append(image(9, 2));
        acc.append(image(10, 3));

        let bytes: Vec<u8> = acc.snapshot().iter().map(|i| i.data[0]).collect();
        assert_eq!(bytes, vec![1, 2, 3]);
        assert_eq!(acc.len(), 3);
    }

    #[test]
    fn test_snapshot_does_not_consume() {
        let mut acc = Accumulator::new();
        acc.append(image(8, 1));
        assert_eq!(acc.snapshot().len(), 1);
        assert_eq!(acc.snapshot().len(), 1);
        assert!(!acc.is_empty());
    }

    #[test]
    fn test_clear() {
        let mut acc = Accumulator::new();
        assert!(acc.is_empty());
        acc.append(image(8, 1));
        acc.append(image(9, 2));
        acc.clear();
        assert!(acc.is_empty());
        assert_eq!(acc.len(), 0);
    }
}
