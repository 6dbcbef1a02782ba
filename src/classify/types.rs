use serde::{Deserialize, Serialize};

/// 单次分类的最终预测
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// 标签名称
    pub label: String,
    /// 归一化后的置信度 (0.0 - 1.0)
    pub confidence: f32,
    /// 标签表中的下标
    pub index: usize,
}

/// 完整分类结果
#[derive(Debug, Clone, Serialize)]
pub struct ClassificationResult {
    pub prediction: Prediction,
    /// 置信度最高的若干候选（包含最终预测）
    pub alternatives: Vec<Prediction>,
    /// 处理耗时（秒）
    pub processing_time: f32,
    /// 搜索更多信息的链接
    #[serde(skip_serializing_if = "Option::is_none")]
    pub more_info_url: Option<String>,
}

/// 分类处理选项
#[derive(Debug, Clone, Deserialize)]
pub struct ClassifyOptions {
    /// 返回的候选数量
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

fn default_top_k() -> usize {
    3
}

impl Default for ClassifyOptions {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
        }
    }
}

/// 分类处理阶段
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum ClassifyStage {
    Preprocessing,
    Inference,
    Resolution,
    Completed,
    Error,
}

/// 分类处理状态
#[derive(Debug, Clone)]
pub struct ClassifyStatus {
    pub stage: ClassifyStage,
    /// 进度 (0.0 - 1.0)
    pub progress: f32,
    pub message: String,
}

impl ClassifyStatus {
    pub fn new(stage: ClassifyStage, progress: f32, message: &str) -> Self {
        Self {
            stage,
            progress,
            message: message.to_string(),
        }
    }
}

/// 展示状态快照
#[derive(Debug, Clone, Serialize)]
pub struct DisplaySnapshot {
    /// 成功时为标签，失败时为错误提示
    pub label: String,
    pub identified_butterfly: Option<String>,
    pub more_info_url: Option<String>,
    pub history: Vec<String>,
}
