use crate::{
    classify::{
        ClassificationResult, ClassifyOptions, ClassifyStage, ClassifyStatus, DecisionResolver,
        Prediction, SearchLinker,
    },
    config::ClassifierConfig,
    image::{ImagePreprocessor, ImageSource},
    models::{InferenceAdapter, LabelTable, ModelManager},
    utils::error::ClassifierError,
    Result,
};
use image::DynamicImage;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;

type StatusSender = mpsc::UnboundedSender<ClassifyStatus>;

/// 分类流水线：预处理 -> 推理 -> 决策
#[derive(Clone)]
pub struct ClassificationPipeline {
    preprocessor: ImagePreprocessor,
    adapter: Arc<dyn InferenceAdapter>,
    resolver: DecisionResolver,
    linker: SearchLinker,
}

impl ClassificationPipeline {
    pub fn new(adapter: Arc<dyn InferenceAdapter>, labels: LabelTable) -> Self {
        let (width, height) = adapter.input_size();
        Self {
            preprocessor: ImagePreprocessor::new(width, height),
            adapter,
            resolver: DecisionResolver::new(labels),
            linker: SearchLinker::default(),
        }
    }

    pub fn from_manager(manager: &ModelManager, config: &ClassifierConfig) -> Self {
        let mut pipeline = Self::new(manager.adapter(), manager.labels().clone());
        pipeline.preprocessor = pipeline.preprocessor.with_filter(config.resize_filter);
        pipeline.linker = SearchLinker::new(config.search_engine.clone());
        pipeline
    }

    pub fn with_search_linker(mut self, linker: SearchLinker) -> Self {
        self.linker = linker;
        self
    }

    pub fn labels(&self) -> &LabelTable {
        self.resolver.labels()
    }

    pub fn search_linker(&self) -> &SearchLinker {
        &self.linker
    }

    /// 对单张图像分类
    pub fn classify(&self, image: &DynamicImage) -> Result<Prediction> {
        self.classify_detailed(image, &ClassifyOptions::default(), None)
            .map(|result| result.prediction)
    }

    /// 核心流水线，在调用线程上同步执行
    pub fn classify_detailed(
        &self,
        image: &DynamicImage,
        options: &ClassifyOptions,
        status_tx: Option<&StatusSender>,
    ) -> Result<ClassificationResult> {
        let result = self.run_stages(image, options, status_tx);

        if let (Err(e), Some(tx)) = (&result, status_tx) {
            let _ = tx.send(ClassifyStatus::new(
                ClassifyStage::Error,
                1.0,
                &e.to_string(),
            ));
        }

        result
    }

    fn run_stages(
        &self,
        image: &DynamicImage,
        options: &ClassifyOptions,
        status_tx: Option<&StatusSender>,
    ) -> Result<ClassificationResult> {
        let start_time = Instant::now();

        if let Some(tx) = status_tx {
            let _ = tx.send(ClassifyStatus::new(
                ClassifyStage::Preprocessing,
                0.1,
                "Resizing image",
            ));
        }

        let resized = self.preprocessor.resize(image)?;
        let preprocessing_time = start_time.elapsed();

        if let Some(tx) = status_tx {
            let _ = tx.send(ClassifyStatus::new(
                ClassifyStage::Inference,
                0.3,
                "Running classifier",
            ));
        }

        let inference_start = Instant::now();
        let scores = self.adapter.infer(&resized)?;
        let inference_time = inference_start.elapsed();

        if let Some(tx) = status_tx {
            let _ = tx.send(ClassifyStatus::new(
                ClassifyStage::Resolution,
                0.8,
                &format!("Resolving {} scores", scores.len()),
            ));
        }

        let resolution = self.resolver.resolve(&scores)?;
        let alternatives = resolution.top_k(self.resolver.labels(), options.top_k.max(1));
        let prediction = resolution.prediction;
        let total_time = start_time.elapsed();

        if let Some(tx) = status_tx {
            let _ = tx.send(ClassifyStatus::new(
                ClassifyStage::Completed,
                1.0,
                &format!("Identified {}", prediction.label),
            ));
        }

        tracing::info!(
            "Classified: label={}, confidence={:.3}, preprocess={:.3}s, inference={:.3}s, total={:.3}s",
            prediction.label,
            prediction.confidence,
            preprocessing_time.as_secs_f32(),
            inference_time.as_secs_f32(),
            total_time.as_secs_f32()
        );

        Ok(ClassificationResult {
            more_info_url: Some(self.linker.more_info_url(&prediction.label)),
            prediction,
            alternatives,
            processing_time: total_time.as_secs_f32(),
        })
    }

    /// 在阻塞线程池上解码并分类，结果通过返回的 future 送回调用方
    pub async fn process_image(
        &self,
        source: ImageSource,
        options: ClassifyOptions,
        status_tx: Option<StatusSender>,
    ) -> Result<ClassificationResult> {
        let pipeline = self.clone();
        tokio::task::spawn_blocking(move || {
            if let Some(ref tx) = status_tx {
                let _ = tx.send(ClassifyStatus::new(
                    ClassifyStage::Preprocessing,
                    0.0,
                    "Decoding image",
                ));
            }

            let image = match source.decode() {
                Ok(image) => image,
                Err(e) => {
                    if let Some(ref tx) = status_tx {
                        let _ = tx.send(ClassifyStatus::new(
                            ClassifyStage::Error,
                            1.0,
                            &e.to_string(),
                        ));
                    }
                    return Err(e);
                }
            };

            pipeline.classify_detailed(&image, &options, status_tx.as_ref())
        })
        .await
        .map_err(|e| ClassifierError::Internal(format!("Classification task failed: {}", e)))?
    }
}
