use anyhow::{Context, Result};
use image::ImageFormat;

/// 解码后的图片，像素为按行排列的 RGB16 缓冲区
pub struct DecodedImage {
    width: u32,
    height: u32,
    format: String,
    pixels: Vec<u16>,
}

impl DecodedImage {
    pub fn new(width: u32, height: u32, format: String, pixels: Vec<u16>) -> Self {
        assert_eq!(pixels.len(), width as usize * height as usize * 3, "pixel buffer size mismatch");
        Self { width, height, format, pixels }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// 解码时识别出的格式标签，例如 "png"、"jpeg"
    pub fn format(&self) -> &str {
        &self.format
    }

    #[inline]
    pub fn rgb_at(&self, x: u32, y: u32) -> [u16; 3] {
        let i = (y as usize * self.width as usize + x as usize) * 3;
        [self.pixels[i], self.pixels[i + 1], self.pixels[i + 2]]
    }
}

/// 图片解码器接口，由摄取流程调用
pub trait ImageDecoder: Send + Sync {
    fn decode(&self, data: &[u8]) -> Result<DecodedImage>;
}

/// 基于 image crate 的默认解码器
#[derive(Debug, Default)]
pub struct DefaultDecoder;

impl ImageDecoder for DefaultDecoder {
    fn decode(&self, data: &[u8]) -> Result<DecodedImage> {
        let format = image::guess_format(data).context("unknown image format")?;
        let img = image::load_from_memory_with_format(data, format).context("failed to decode image")?;
        let rgb = img.to_rgb16();
        let (width, height) = (rgb.width(), rgb.height());
        Ok(DecodedImage::new(width, height, format_tag(format), rgb.into_raw()))
    }
}

fn format_tag(format: ImageFormat) -> String {
    match format {
        // image crate 的 jpeg 首选扩展名是 "jpg"，这里统一使用解码器名称
        ImageFormat::Jpeg => "jpeg".to_string(),
        other => other.extensions_str().first().copied().unwrap_or("unknown").to_string(),
    }
}
