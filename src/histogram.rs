use byteorder::{ByteOrder, LittleEndian};

use crate::decode::DecodedImage;

/// 单个颜色通道的取值上限（RGB16）
const CHANNEL_MAX: f64 = 65535.0;

/// 归一化的颜色直方图特征，所有分量之和为 1.0
#[derive(Debug, Clone, PartialEq)]
pub struct Feature(Vec<f32>);

impl Feature {
    pub fn values(&self) -> &[f32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// 序列化为小端 f32 数组，无额外头部，长度即分箱数量
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = vec![0u8; self.0.len() * 4];
        LittleEndian::write_f32_into(&self.0, &mut buf);
        buf
    }

    /// 从 [`Feature::to_bytes`] 的结果还原特征向量
    ///
    /// 长度不是 4 的倍数意味着记录已损坏，属于编程错误，直接 panic
    pub fn from_bytes(data: &[u8]) -> Self {
        assert_eq!(data.len() % 4, 0, "feature bytes not a multiple of 4");
        let mut out = vec![0f32; data.len() / 4];
        LittleEndian::read_f32_into(data, &mut out);
        Self(out)
    }
}

/// 三通道独立分箱的 RGB 直方图描述子
#[derive(Debug, Clone, Copy)]
pub struct RgbHistogram {
    r_bins: u32,
    g_bins: u32,
    b_bins: u32,
}

impl RgbHistogram {
    pub fn new(r_bins: u32, g_bins: u32, b_bins: u32) -> Self {
        assert!(r_bins > 0 && g_bins > 0 && b_bins > 0, "bins must be positive");
        Self { r_bins, g_bins, b_bins }
    }

    /// 联合分箱总数，即特征向量长度
    pub fn len(&self) -> usize {
        (self.r_bins * self.g_bins * self.b_bins) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 统计每个联合分箱的像素数并按总像素数归一化
    ///
    /// 纯函数：同一张图片和分箱配置得到的结果逐位一致
    pub fn describe(&self, img: &DecodedImage) -> Feature {
        let r_div = (CHANNEL_MAX / self.r_bins as f64).ceil() as u32;
        let g_div = (CHANNEL_MAX / self.g_bins as f64).ceil() as u32;
        let b_div = (CHANNEL_MAX / self.b_bins as f64).ceil() as u32;

        let mut counts = vec![0u64; self.len()];
        for y in 0..img.height() {
            for x in 0..img.width() {
                let [r, g, b] = img.rgb_at(x, y);
                let r = r as u32 / r_div;
                let g = g as u32 / g_div;
                let b = b as u32 / b_div;
                counts[(r + g * self.r_bins + b * self.r_bins * self.g_bins) as usize] += 1;
            }
        }

        let total = img.width() as u64 * img.height() as u64;
        Feature(counts.into_iter().map(|c| c as f32 / total as f32).collect())
    }
}

impl Default for RgbHistogram {
    fn default() -> Self {
        Self::new(8, 8, 8)
    }
}

/// 提取特征向量，同时做格式检查
///
/// 不支持的格式返回 None，调用方视为硬性拒绝
pub fn generate_feature(histogram: &RgbHistogram, img: &DecodedImage) -> Option<Feature> {
    match img.format() {
        "png" | "jpeg" => Some(histogram.describe(img)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(width: u32, height: u32, rgb: [u16; 3], format: &str) -> DecodedImage {
        let mut pixels = Vec::with_capacity(width as usize * height as usize * 3);
        for _ in 0..width * height {
            pixels.extend_from_slice(&rgb);
        }
        DecodedImage::new(width, height, format.to_string(), pixels)
    }

    // 2x2x2 分箱下，八种纯色各落在一个分箱
    #[test]
    fn test_solid_colors_2x2x2() {
        let histo = RgbHistogram::new(2, 2, 2);
        let cases = [
            ([0, 0, 0], 0),             // black
            ([65535, 0, 0], 1),         // red
            ([0, 65535, 0], 2),         // green
            ([65535, 65535, 0], 3),     // yellow
            ([0, 0, 65535], 4),         // blue
            ([65535, 0, 65535], 5),     // purple
            ([0, 65535, 65535], 6),     // teal
            ([65535, 65535, 65535], 7), // white
        ];
        for (rgb, expected) in cases {
            let feature = histo.describe(&solid(100, 100, rgb, "png"));
            let mut want = vec![0f32; 8];
            want[expected] = 1.0;
            assert_eq!(feature.values(), &want[..], "rgb {rgb:?}");
        }
    }

    #[test]
    fn test_normalized() {
        let mut pixels = Vec::new();
        for y in 0..64u32 {
            for x in 0..64u32 {
                pixels.extend_from_slice(&[(x * 1024) as u16, (y * 1024) as u16, 32768]);
            }
        }
        let img = DecodedImage::new(64, 64, "png".to_string(), pixels);
        let feature = RgbHistogram::default().describe(&img);
        assert_eq!(feature.len(), 512);
        let sum: f32 = feature.values().iter().sum();
        assert!((sum - 1.0).abs() < 1e-5, "sum = {sum}");
    }

    #[test]
    fn test_deterministic() {
        let img = solid(32, 32, [12345, 54321, 2], "jpeg");
        let histo = RgbHistogram::default();
        let a = histo.describe(&img);
        let b = histo.describe(&img);
        assert_eq!(a.to_bytes(), b.to_bytes());
    }

    #[test]
    fn test_format_check() {
        let histo = RgbHistogram::default();
        assert!(generate_feature(&histo, &solid(4, 4, [0, 0, 0], "png")).is_some());
        assert!(generate_feature(&histo, &solid(4, 4, [0, 0, 0], "jpeg")).is_some());
        assert!(generate_feature(&histo, &solid(4, 4, [0, 0, 0], "bmp")).is_none());
        assert!(generate_feature(&histo, &solid(4, 4, [0, 0, 0], "gif")).is_none());
    }

    #[test]
    fn test_feature_bytes_roundtrip() {
        let feature = RgbHistogram::new(2, 2, 2).describe(&solid(10, 10, [65535, 0, 0], "png"));
        let bytes = feature.to_bytes();
        assert_eq!(bytes.len(), 32);
        assert_eq!(Feature::from_bytes(&bytes), feature);
    }
}
