use crate::config::ClassifierConfig;
use crate::utils::error::ClassifierError;
use crate::Result;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, RgbImage};
use ndarray::Array4;

/// 将任意尺寸的图像拉伸到模型输入尺寸（不保持宽高比，不加边）
#[derive(Debug, Clone)]
pub struct ImagePreprocessor {
    width: u32,
    height: u32,
    filter: FilterType,
    mean: [f32; 3],
    std: [f32; 3],
}

impl ImagePreprocessor {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            filter: FilterType::Triangle,
            mean: [0.0; 3],
            std: [1.0; 3],
        }
    }

    pub fn from_config(config: &ClassifierConfig) -> Self {
        Self::new(config.input_width, config.input_height).with_filter(config.resize_filter)
    }

    pub fn with_filter(mut self, filter: FilterType) -> Self {
        self.filter = filter;
        self
    }

    /// 设置归一化参数，作用于缩放到 [0,1] 之后的像素值
    pub fn with_normalization(mut self, mean: [f32; 3], std: [f32; 3]) -> Self {
        self.mean = mean;
        self.std = std;
        self
    }

    pub fn target_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// 缩放为 W×H 的 RGB 图像，原图保持不变
    pub fn resize(&self, image: &DynamicImage) -> Result<RgbImage> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(ClassifierError::Conversion(format!(
                "Cannot resize an empty image ({}x{})",
                width, height
            )));
        }

        let resized = if (width, height) == (self.width, self.height) {
            image.to_rgb8()
        } else {
            image
                .resize_exact(self.width, self.height, self.filter)
                .to_rgb8()
        };

        tracing::debug!(
            "Resized image {}x{} -> {}x{}",
            width,
            height,
            self.width,
            self.height
        );

        Ok(resized)
    }

    /// RGB图像转换为 NCHW 张量 [1, 3, H, W]
    pub fn to_tensor(&self, image: &RgbImage) -> Result<Array4<f32>> {
        if image.dimensions() != (self.width, self.height) {
            return Err(ClassifierError::Inference(format!(
                "Expected {}x{} input, got {}x{}",
                self.width,
                self.height,
                image.width(),
                image.height()
            )));
        }

        let (h, w) = (self.height as usize, self.width as usize);
        let tensor = Array4::from_shape_fn((1, 3, h, w), |(_, c, y, x)| {
            let value = image.get_pixel(x as u32, y as u32)[c] as f32 / 255.0;
            (value - self.mean[c]) / self.std[c]
        });

        Ok(tensor)
    }
}
