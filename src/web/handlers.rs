use crate::{
    classify::{ClassificationResult, ClassifyOptions, ClassifyStatus, DisplaySnapshot},
    image::ImageSource,
    utils::error::ClassifierError,
    web::{
        extractors::{check_top_k, RequestId, ValidatedJson},
        AppState,
    },
    Result,
};
use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Json, Redirect, Response},
};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tokio::sync::mpsc;

/// JSON请求体（base64模式）
#[derive(Debug, Deserialize)]
pub struct ClassifyJsonRequest {
    /// Base64编码的图像数据
    pub image: String,

    /// 返回的候选数量
    #[serde(default)]
    pub top_k: Option<usize>,
}

/// JSON响应格式
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
    pub timestamp: String,
    pub request_id: String,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
            request_id: uuid::Uuid::new_v4().to_string(),
        }
    }

    pub fn with_request_id(mut self, request_id: String) -> Self {
        self.request_id = request_id;
        self
    }

    pub fn error(code: String, message: String) -> ApiResponse<()> {
        ApiResponse {
            success: false,
            data: None,
            error: Some(ApiError { code, message }),
            timestamp: chrono::Utc::now().to_rfc3339(),
            request_id: uuid::Uuid::new_v4().to_string(),
        }
    }
}

/// 开发模式下创建进度通道，并在后台记录每个阶段
fn progress_channel(
    state: &AppState,
    request_id: &str,
) -> Option<mpsc::UnboundedSender<ClassifyStatus>> {
    if !state.config.dev_mode {
        return None;
    }

    let (status_tx, mut status_rx) = mpsc::unbounded_channel::<ClassifyStatus>();
    let request_id = request_id.to_string();
    tokio::spawn(async move {
        while let Some(status) = status_rx.recv().await {
            tracing::debug!(
                "Classification progress [{}]: {:?} - {:.1}% - {}",
                request_id,
                status.stage,
                status.progress * 100.0,
                status.message
            );
        }
    });

    Some(status_tx)
}

async fn run_classification(
    state: &AppState,
    request_id: String,
    source: ImageSource,
    options: ClassifyOptions,
) -> Result<Json<ApiResponse<ClassificationResult>>> {
    let start_time = Instant::now();
    let status_tx = progress_channel(state, &request_id);

    let result = state.classifier.classify(source, options, status_tx).await?;

    tracing::info!(
        "Classification completed: request_id={}, label={}, confidence={:.3}, time={:.3}s",
        request_id,
        result.prediction.label,
        result.prediction.confidence,
        start_time.elapsed().as_secs_f32()
    );

    Ok(Json(ApiResponse::success(result).with_request_id(request_id)))
}

/// JSON base64上传处理器
pub async fn classify_json_handler(
    State(state): State<AppState>,
    RequestId(request_id): RequestId,
    ValidatedJson(request): ValidatedJson<ClassifyJsonRequest>,
) -> Result<Json<ApiResponse<ClassificationResult>>> {
    tracing::info!(
        "Processing JSON classification request: request_id={}, payload={} chars",
        request_id,
        request.image.len()
    );

    let mut options = ClassifyOptions::default();
    if let Some(top_k) = request.top_k {
        options.top_k = top_k;
    }

    run_classification(&state, request_id, ImageSource::Base64(request.image), options).await
}

/// Multipart文件上传处理器
pub async fn classify_upload_handler(
    State(state): State<AppState>,
    RequestId(request_id): RequestId,
    mut multipart: Multipart,
) -> Result<Json<ApiResponse<ClassificationResult>>> {
    tracing::info!(
        "Processing multipart classification request: request_id={}",
        request_id
    );

    let mut image_data: Option<Vec<u8>> = None;
    let mut options = ClassifyOptions::default();

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        ClassifierError::InvalidInput(format!("Failed to read multipart field: {}", e))
    })? {
        let field_name = field.name().unwrap_or("unknown").to_string();

        match field_name.as_str() {
            "file" => {
                if let Some(content_type) = field.content_type() {
                    if !content_type.starts_with("image/") {
                        return Err(ClassifierError::UnsupportedFormat(content_type.to_string()));
                    }
                }

                let data = field.bytes().await.map_err(|e| {
                    ClassifierError::InvalidInput(format!("Failed to read file data: {}", e))
                })?;

                if data.is_empty() {
                    return Err(ClassifierError::InvalidInput("Empty file".to_string()));
                }

                tracing::debug!("Received file: {} bytes", data.len());
                image_data = Some(data.to_vec());
            }
            "top_k" => {
                let value = field.text().await.map_err(|e| {
                    ClassifierError::InvalidInput(format!("Failed to read top_k: {}", e))
                })?;
                options.top_k = parse_top_k(&value)?;
            }
            _ => {
                tracing::debug!("Ignoring unknown field: {}", field_name);
            }
        }
    }

    let image_data = image_data
        .ok_or_else(|| ClassifierError::InvalidInput("No image file provided".to_string()))?;

    run_classification(&state, request_id, ImageSource::Encoded(image_data), options).await
}

/// 解析表单中的 top_k，范围与 JSON 请求一致
pub fn parse_top_k(value: &str) -> Result<usize> {
    let top_k = value.trim().parse::<usize>().map_err(|_| {
        ClassifierError::InvalidInput(format!("top_k is not a number: {:?}", value))
    })?;
    check_top_k(top_k).map_err(ClassifierError::InvalidInput)?;
    Ok(top_k)
}

/// 预测历史（最新的在前）
pub async fn history_handler(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<String>>>> {
    let history = state.classifier.history().await?;
    Ok(Json(ApiResponse::success(history)))
}

/// 当前展示状态
pub async fn state_handler(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<DisplaySnapshot>>> {
    let snapshot = state.classifier.snapshot().await?;
    Ok(Json(ApiResponse::success(snapshot)))
}

/// 跳转到已识别蝴蝶的搜索页
pub async fn more_info_handler(State(state): State<AppState>) -> Result<Response> {
    let snapshot = state.classifier.snapshot().await?;

    match snapshot.more_info_url {
        Some(url) => {
            tracing::debug!("Redirecting to {}", url);
            Ok(Redirect::temporary(&url).into_response())
        }
        None => {
            let body = ApiResponse::<()>::error(
                "NO_IDENTIFIED_BUTTERFLY".to_string(),
                "No butterfly has been identified yet".to_string(),
            );
            Ok((StatusCode::NOT_FOUND, Json(body)).into_response())
        }
    }
}
