pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod ui;

use crate::{
    classify::{ClassificationPipeline, ClassifierController, ClassifierHandle},
    models::ModelManager,
    utils::error::ClassifierError,
    Config, Result,
};
use axum::{
    extract::{Query, State},
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, timeout::TimeoutLayer};

/// 处理器共享的应用状态
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub models: ModelManager,
    pub classifier: ClassifierHandle,
}

impl AppState {
    pub fn new(config: Config, models: ModelManager) -> Self {
        let pipeline = ClassificationPipeline::from_manager(&models, &config.classifier_config);
        let classifier =
            ClassifierController::spawn(pipeline, config.classifier_config.history_limit);
        Self {
            config,
            models,
            classifier,
        }
    }
}

pub async fn serve(config: Config) -> Result<()> {
    let models = ModelManager::init(&config)?;
    let state = AppState::new(config.clone(), models);

    let app = create_app(state);

    let addr: SocketAddr = config.bind_addr.parse().map_err(|e| {
        ClassifierError::Config(format!("Invalid bind address {}: {}", config.bind_addr, e))
    })?;

    tracing::info!("Server starting on http://{}", addr);
    tracing::info!("API endpoints:");
    tracing::info!("  POST /classify        - JSON base64 upload");
    tracing::info!("  POST /classify/upload - Multipart file upload");
    tracing::info!("  GET  /history         - Prediction history");
    tracing::info!("  GET  /state           - Current display state");
    tracing::info!("  GET  /more-info       - Search the identified butterfly");
    tracing::info!("  GET  /                - Web UI");
    tracing::info!("  GET  /health          - Health check");
    tracing::info!("  GET  /api/info        - Service information");

    let listener = TcpListener::bind(&addr).await.map_err(|e| {
        ClassifierError::Internal(format!("Failed to bind to address {}: {}", addr, e))
    })?;

    axum::serve(listener, app)
        .await
        .map_err(|e| ClassifierError::Internal(format!("Server failed to start: {}", e)))?;

    Ok(())
}

pub fn create_app(state: AppState) -> Router {
    let server_config = state.config.server_config.clone();

    Router::new()
        .route("/classify", post(handlers::classify_json_handler))
        .route("/classify/upload", post(handlers::classify_upload_handler))
        .route("/history", get(handlers::history_handler))
        .route("/state", get(handlers::state_handler))
        .route("/more-info", get(handlers::more_info_handler))
        .route("/", get(ui::index_handler))
        .route("/health", get(health_handler))
        .route("/api/info", get(info_handler))
        .layer(axum::middleware::from_fn(middleware::request_logging))
        .layer(axum::middleware::from_fn(middleware::security_headers))
        .layer(RequestBodyLimitLayer::new(server_config.max_request_size))
        .layer(TimeoutLayer::new(Duration::from_secs(
            server_config.request_timeout,
        )))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[derive(Debug, Default, Deserialize)]
pub struct HealthQuery {
    /// 为 true 时额外试跑一次推理
    #[serde(default)]
    pub deep: bool,
}

/// 健康检查端点，默认只返回缓存的模型信息，不占用推理会话
pub async fn health_handler(
    State(state): State<AppState>,
    Query(query): Query<HealthQuery>,
) -> Result<Json<serde_json::Value>> {
    if query.deep {
        let models = state.models.clone();
        tokio::task::spawn_blocking(move || models.health_check())
            .await
            .map_err(|e| ClassifierError::Internal(format!("Health check task failed: {}", e)))??;
    }

    Ok(Json(json!({
        "status": "healthy",
        "deep": query.deep,
        "models": state.models.get_stats(),
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION")
    })))
}

/// 服务信息端点
async fn info_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    let stats = state.models.get_stats();
    Json(json!({
        "service": "Butterfly Classifier",
        "version": env!("CARGO_PKG_VERSION"),
        "description": env!("CARGO_PKG_DESCRIPTION"),
        "models": stats,
        "history_limit": state.config.classifier_config.history_limit,
        "labels": state.models.labels().iter().collect::<Vec<_>>(),
    }))
}
