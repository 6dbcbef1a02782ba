use crate::config::Config;
use crate::image::ImagePreprocessor;
use crate::models::InferenceAdapter;
use crate::utils::error::ClassifierError;
use crate::Result;
use image::RgbImage;
use ort::{
    inputs,
    session::{builder::GraphOptimizationLevel, Session},
    value::Tensor,
};
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;

/// 基于 ONNX Runtime 的蝴蝶分类器
pub struct OnnxClassifier {
    session: Arc<Mutex<Session>>,
    input_name: String,  // 动态发现的输入名称
    output_name: String, // 动态发现的输出名称
    preprocessor: ImagePreprocessor,
}

impl OnnxClassifier {
    pub fn new(config: &Config) -> Result<Self> {
        let model_path = config.model_path();

        if !model_path.exists() {
            return Err(ClassifierError::ModelLoad(format!(
                "Classification model not found: {}",
                model_path.display()
            )));
        }

        tracing::info!("Loading classification model from: {}", model_path.display());

        let session = Self::build_session(
            &model_path,
            config.onnx_config.optimization_level,
            config.onnx_config.intra_threads,
        )
        .map_err(|e| {
            ClassifierError::ModelLoad(format!("{}: {}", model_path.display(), e))
        })?;

        let input_name = match session.inputs.first() {
            Some(input) => input.name.clone(),
            None => {
                return Err(ClassifierError::ModelLoad(
                    "Classification model has no inputs".to_string(),
                ))
            }
        };

        let output_name = match session.outputs.first() {
            Some(output) => output.name.clone(),
            None => {
                return Err(ClassifierError::ModelLoad(
                    "Classification model has no outputs".to_string(),
                ))
            }
        };

        tracing::info!(
            "Classification model io: input='{}', output='{}'",
            input_name,
            output_name
        );
        for (i, output) in session.outputs.iter().enumerate() {
            tracing::debug!("Classification output[{}]: '{}'", i, output.name);
        }

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            input_name,
            output_name,
            preprocessor: ImagePreprocessor::from_config(&config.classifier_config),
        })
    }

    fn build_session(path: &Path, level: i32, intra_threads: usize) -> ort::Result<Session> {
        let level = match level {
            0 => GraphOptimizationLevel::Disable,
            1 => GraphOptimizationLevel::Level1,
            2 => GraphOptimizationLevel::Level2,
            _ => GraphOptimizationLevel::Level3,
        };

        Session::builder()?
            .with_optimization_level(level)?
            .with_intra_threads(intra_threads)?
            .commit_from_file(path)
    }
}

impl InferenceAdapter for OnnxClassifier {
    fn name(&self) -> &str {
        "onnxruntime"
    }

    fn input_size(&self) -> (u32, u32) {
        self.preprocessor.target_size()
    }

    fn infer(&self, image: &RgbImage) -> Result<Vec<f32>> {
        let input = self.preprocessor.to_tensor(image)?;
        let input_tensor = Tensor::from_array(input)
            .map_err(|e| ClassifierError::Inference(format!("Failed to build input tensor: {}", e)))?;

        let mut session = self.session.lock();
        let outputs = session
            .run(inputs![self.input_name.as_str() => input_tensor])
            .map_err(|e| ClassifierError::Inference(e.to_string()))?;

        let output = match outputs.get(self.output_name.as_str()) {
            Some(output) => output,
            None => {
                let available_outputs: Vec<String> =
                    outputs.keys().map(|s| s.to_string()).collect();
                return Err(ClassifierError::Inference(format!(
                    "Classification output '{}' not found. Available outputs: {:?}",
                    self.output_name, available_outputs
                )));
            }
        };

        let scores = output
            .try_extract_array::<f32>()
            .map_err(|e| ClassifierError::Inference(format!("Unexpected output tensor: {}", e)))?;

        // 期望形状 [1, N] 或 [N]
        let shape = scores.shape();
        let batch = if shape.len() >= 2 { shape[0] } else { 1 };
        if batch != 1 {
            return Err(ClassifierError::Inference(format!(
                "Expected batch size 1, got output shape {:?}",
                shape
            )));
        }

        Ok(scores.iter().copied().collect())
    }
}
