use crate::Result;
use image::RgbImage;

/// "图像进，概率向量出"的统一推理接口，屏蔽具体运行时
///
/// 输入必须已经缩放到 `input_size()`；返回的向量长度应等于标签数，
/// 但是否一致由调用方校验，实现方不做截断或补齐。
pub trait InferenceAdapter: Send + Sync {
    /// 运行时名称，用于日志与统计
    fn name(&self) -> &str;

    /// 期望的输入尺寸 (width, height)
    fn input_size(&self) -> (u32, u32);

    /// 执行一次推理
    fn infer(&self, image: &RgbImage) -> Result<Vec<f32>>;
}
