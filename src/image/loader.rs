use crate::utils::error::ClassifierError;
use crate::Result;
use base64::Engine;
use image::{DynamicImage, GenericImageView, ImageFormat};
use std::path::Path;

/// 单张图片的最大字节数
pub const MAX_IMAGE_BYTES: usize = 50 * 1024 * 1024;

/// 待分类的图像来源，解码延后到工作线程执行
#[derive(Debug, Clone)]
pub enum ImageSource {
    /// 原始文件字节（PNG/JPEG 等）
    Encoded(Vec<u8>),
    /// base64 字符串，可带 data URL 前缀
    Base64(String),
    /// 已解码的图像
    Decoded(DynamicImage),
}

impl ImageSource {
    pub fn decode(self) -> Result<DynamicImage> {
        match self {
            ImageSource::Encoded(bytes) => ImageLoader::from_bytes(&bytes),
            ImageSource::Base64(data) => ImageLoader::from_base64(&data),
            ImageSource::Decoded(image) => ImageLoader::validate(image),
        }
    }
}

impl From<DynamicImage> for ImageSource {
    fn from(image: DynamicImage) -> Self {
        ImageSource::Decoded(image)
    }
}

impl From<Vec<u8>> for ImageSource {
    fn from(bytes: Vec<u8>) -> Self {
        ImageSource::Encoded(bytes)
    }
}

pub struct ImageLoader;

impl ImageLoader {
    /// 从base64字符串加载图像
    pub fn from_base64(base64_data: &str) -> Result<DynamicImage> {
        // 移除可能的数据URL前缀 (data:image/xxx;base64,)
        let base64_clean = match base64_data.strip_prefix("data:") {
            Some(rest) => rest.split_once(',').map(|(_, data)| data).unwrap_or(rest),
            None => base64_data,
        };

        let image_bytes = base64::engine::general_purpose::STANDARD.decode(base64_clean.trim())?;

        Self::from_bytes(&image_bytes)
    }

    /// 从字节流加载图像
    pub fn from_bytes(bytes: &[u8]) -> Result<DynamicImage> {
        if bytes.len() > MAX_IMAGE_BYTES {
            return Err(ClassifierError::FileTooLarge(bytes.len(), MAX_IMAGE_BYTES));
        }

        if let Some(format) = Self::detect_format(bytes) {
            if !Self::is_supported_format(format) {
                return Err(ClassifierError::UnsupportedFormat(format!("{:?}", format)));
            }
        }

        let image = image::load_from_memory(bytes)
            .map_err(|e| ClassifierError::Conversion(e.to_string()))?;

        Self::validate(image)
    }

    /// 从文件路径加载图像
    pub fn from_path(path: impl AsRef<Path>) -> Result<DynamicImage> {
        let path = path.as_ref();
        let image = image::open(path)
            .map_err(|e| ClassifierError::Conversion(format!("{}: {}", path.display(), e)))?;

        Self::validate(image)
    }

    /// 检测图像格式
    pub fn detect_format(bytes: &[u8]) -> Option<ImageFormat> {
        image::guess_format(bytes).ok()
    }

    /// 验证图像格式是否支持
    pub fn is_supported_format(format: ImageFormat) -> bool {
        matches!(
            format,
            ImageFormat::Png
                | ImageFormat::Jpeg
                | ImageFormat::Bmp
                | ImageFormat::Tiff
                | ImageFormat::WebP
                | ImageFormat::Gif
        )
    }

    /// 零尺寸图像无法构成像素缓冲区
    fn validate(image: DynamicImage) -> Result<DynamicImage> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(ClassifierError::Conversion(format!(
                "Image has no pixels: {}x{}",
                width, height
            )));
        }
        Ok(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};
    use std::io::Cursor;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img: ImageBuffer<Rgb<u8>, Vec<u8>> =
            ImageBuffer::from_fn(width, height, |x, y| Rgb([x as u8, y as u8, 128]));
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut out, ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    #[test]
    fn loads_png_from_bytes() {
        let image = ImageLoader::from_bytes(&png_bytes(31, 17)).unwrap();
        assert_eq!(image.dimensions(), (31, 17));
    }

    #[test]
    fn accepts_data_url_prefix() {
        let encoded = base64::engine::general_purpose::STANDARD.encode(png_bytes(8, 8));
        let data_url = format!("data:image/png;base64,{}", encoded);
        let image = ImageLoader::from_base64(&data_url).unwrap();
        assert_eq!(image.dimensions(), (8, 8));
    }

    #[test]
    fn garbage_bytes_are_a_conversion_error() {
        let err = ImageLoader::from_bytes(b"definitely not an image").unwrap_err();
        assert!(matches!(err, ClassifierError::Conversion(_)));
    }

    #[test]
    fn truncated_png_is_a_conversion_error() {
        let mut bytes = png_bytes(16, 16);
        bytes.truncate(40);
        let err = ImageLoader::from_bytes(&bytes).unwrap_err();
        assert!(matches!(err, ClassifierError::Conversion(_)));
    }

    #[test]
    fn image_source_decodes_lazily() {
        let source = ImageSource::from(png_bytes(5, 7));
        assert_eq!(source.decode().unwrap().dimensions(), (5, 7));

        let empty = ImageSource::from(DynamicImage::new_rgb8(0, 0));
        assert!(matches!(empty.decode(), Err(ClassifierError::Conversion(_))));
    }

    #[test]
    fn invalid_base64_is_rejected() {
        let err = ImageLoader::from_base64("@@@@").unwrap_err();
        assert!(matches!(err, ClassifierError::Base64(_)));
    }
}
