use crate::config::Config;
use crate::models::{InferenceAdapter, LabelTable, OnnxClassifier};
use crate::Result;
use image::RgbImage;
use std::sync::Arc;

/// 模型管理器：持有推理适配器与标签表，启动时校验二者一致
#[derive(Clone)]
pub struct ModelManager {
    adapter: Arc<dyn InferenceAdapter>,
    labels: LabelTable,
    output_len: usize,
    intra_threads: usize,
    optimization_level: i32,
}

impl ModelManager {
    /// 加载 ONNX 模型与标签表
    pub fn init(config: &Config) -> Result<Self> {
        tracing::info!("Initializing model manager...");

        let labels = match config.labels_path() {
            Some(path) => LabelTable::from_file(path)?,
            None => {
                tracing::info!("Using built-in label table");
                LabelTable::builtin()
            }
        };

        let adapter: Arc<dyn InferenceAdapter> = Arc::new(OnnxClassifier::new(config)?);

        let mut manager = Self::with_adapter(adapter, labels)?;
        manager.intra_threads = config.onnx_config.intra_threads;
        manager.optimization_level = config.onnx_config.optimization_level;

        tracing::info!("Model manager initialized successfully");
        Ok(manager)
    }

    /// 使用任意推理适配器构建，标签数与模型输出宽度不一致时立即失败
    pub fn with_adapter(adapter: Arc<dyn InferenceAdapter>, labels: LabelTable) -> Result<Self> {
        let output_len = Self::probe_output_len(adapter.as_ref())?;
        labels.ensure_matches(output_len)?;

        tracing::info!(
            "Model '{}' verified: {} classes, labels version '{}'",
            adapter.name(),
            output_len,
            labels.version()
        );

        Ok(Self {
            adapter,
            labels,
            output_len,
            intra_threads: 0,
            optimization_level: 0,
        })
    }

    /// 用一张空白图像试跑一次推理，得到模型实际输出宽度
    fn probe_output_len(adapter: &dyn InferenceAdapter) -> Result<usize> {
        let (width, height) = adapter.input_size();
        let blank = RgbImage::new(width, height);
        let scores = adapter.infer(&blank)?;
        tracing::debug!("Probe inference produced {} scores", scores.len());
        Ok(scores.len())
    }

    pub fn adapter(&self) -> Arc<dyn InferenceAdapter> {
        Arc::clone(&self.adapter)
    }

    pub fn labels(&self) -> &LabelTable {
        &self.labels
    }

    /// 模型健康检查：重新试跑并确认输出宽度未变
    pub fn health_check(&self) -> Result<()> {
        tracing::debug!("Performing model health check...");
        let output_len = Self::probe_output_len(self.adapter.as_ref())?;
        self.labels.ensure_matches(output_len)?;
        tracing::debug!("Model health check passed");
        Ok(())
    }

    pub fn get_stats(&self) -> ModelStats {
        let (input_width, input_height) = self.adapter.input_size();
        ModelStats {
            runtime: self.adapter.name().to_string(),
            num_classes: self.output_len,
            labels_version: self.labels.version().to_string(),
            input_width,
            input_height,
            intra_threads: self.intra_threads,
            optimization_level: self.optimization_level,
        }
    }
}

/// 模型统计信息
#[derive(Debug, Clone, serde::Serialize)]
pub struct ModelStats {
    pub runtime: String,
    pub num_classes: usize,
    pub labels_version: String,
    pub input_width: u32,
    pub input_height: u32,
    pub intra_threads: usize,
    pub optimization_level: i32,
}
