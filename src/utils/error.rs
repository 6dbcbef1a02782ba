use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClassifierError {
    #[error("Image conversion failed: {0}")]
    Conversion(String),

    #[error("Model loading failed: {0}")]
    ModelLoad(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Label table mismatch: model produced {actual} scores, label table has {expected} labels")]
    LabelMismatch { expected: usize, actual: usize },

    #[error("No result: probability vector is empty or sums to zero")]
    NoResult,

    #[error("Resolved index {index} is outside the label table (len {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Request superseded by a newer classification")]
    Superseded,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("File too large: {0} bytes, max allowed: {1} bytes")]
    FileTooLarge(usize, usize),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ClassifierError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ClassifierError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ClassifierError::Conversion(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ClassifierError::FileTooLarge(_, _) => StatusCode::PAYLOAD_TOO_LARGE,
            ClassifierError::UnsupportedFormat(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ClassifierError::Base64(_) => StatusCode::BAD_REQUEST,
            ClassifierError::Json(_) => StatusCode::BAD_REQUEST,
            ClassifierError::NoResult => StatusCode::UNPROCESSABLE_ENTITY,
            ClassifierError::Superseded => StatusCode::CONFLICT,
            ClassifierError::ModelLoad(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            ClassifierError::Conversion(_) => "CONVERSION_ERROR",
            ClassifierError::ModelLoad(_) => "MODEL_LOAD_ERROR",
            ClassifierError::Inference(_) => "INFERENCE_ERROR",
            ClassifierError::LabelMismatch { .. } => "LABEL_MISMATCH",
            ClassifierError::NoResult => "NO_RESULT",
            ClassifierError::IndexOutOfRange { .. } => "INDEX_OUT_OF_RANGE",
            ClassifierError::Superseded => "SUPERSEDED",
            ClassifierError::InvalidInput(_) => "INVALID_INPUT",
            ClassifierError::FileTooLarge(_, _) => "FILE_TOO_LARGE",
            ClassifierError::UnsupportedFormat(_) => "UNSUPPORTED_FORMAT",
            ClassifierError::Config(_) => "CONFIG_ERROR",
            ClassifierError::Io(_) => "IO_ERROR",
            ClassifierError::Json(_) => "JSON_ERROR",
            ClassifierError::Base64(_) => "BASE64_DECODE_ERROR",
            ClassifierError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// 面向用户的展示文本
    pub fn display_message(&self) -> String {
        match self {
            ClassifierError::Conversion(_)
            | ClassifierError::Base64(_)
            | ClassifierError::UnsupportedFormat(_) => "Could not convert the photo.".to_string(),
            ClassifierError::ModelLoad(detail) | ClassifierError::Inference(detail) => {
                format!("Classification error: {}", detail)
            }
            ClassifierError::LabelMismatch { .. } => {
                "Error: could not interpret the results.".to_string()
            }
            ClassifierError::NoResult => "No results.".to_string(),
            ClassifierError::IndexOutOfRange { .. } => "Error: index out of range.".to_string(),
            other => format!("Classification error: {}", other),
        }
    }
}

impl IntoResponse for ClassifierError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_response = serde_json::json!({
            "error": {
                "code": self.error_code(),
                "message": self.to_string(),
                "display": self.display_message(),
            }
        });

        if status.is_server_error() {
            tracing::error!("Request failed: {} ({})", self, status);
        } else {
            tracing::warn!("Request rejected: {} ({})", self, status);
        }

        (status, axum::Json(error_response)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages_match_error_kind() {
        assert_eq!(ClassifierError::NoResult.display_message(), "No results.");
        assert_eq!(
            ClassifierError::IndexOutOfRange { index: 9, len: 3 }.display_message(),
            "Error: index out of range."
        );
        assert_eq!(
            ClassifierError::Conversion("bad png".into()).display_message(),
            "Could not convert the photo."
        );
        assert_eq!(
            ClassifierError::Inference("session poisoned".into()).display_message(),
            "Classification error: session poisoned"
        );
    }

    #[test]
    fn label_mismatch_is_a_server_side_defect() {
        let err = ClassifierError::LabelMismatch { expected: 75, actual: 74 };
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.error_code(), "LABEL_MISMATCH");
    }
}
