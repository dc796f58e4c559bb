//! 错误 → HTTP 响应
//!
//! 响应体统一为 `{"error": "..."}`；内部细节只进日志。

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::core::{FlowError, StoreError};
use crate::pipeline::EnqueueError;

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "Não autorizado")
    }

    pub fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, "Lead não encontrado.")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

impl From<FlowError> for ApiError {
    fn from(err: FlowError) -> Self {
        let status = match &err {
            FlowError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            FlowError::LeadNotFound(_) => StatusCode::NOT_FOUND,
            FlowError::Generation(_) | FlowError::ReportAudit(_) | FlowError::Store(_) => {
                tracing::error!(error = %err, "chat turn failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self::new(status, err.user_message())
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(_) => Self::not_found(),
            other => {
                tracing::error!(error = %other, "store operation failed");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Erro de conexão com o banco de dados.")
            }
        }
    }
}

impl From<EnqueueError> for ApiError {
    fn from(err: EnqueueError) -> Self {
        tracing::warn!(error = %err, "report job rejected");
        Self::new(
            StatusCode::SERVICE_UNAVAILABLE,
            "Fila de relatórios indisponível. Tente novamente em instantes.",
        )
    }
}

/// 请求体不是合法 JSON 或字段类型不符；解析细节只进日志
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::info!(error = %rejection.body_text(), "rejected request body");
        Self::bad_request(INVALID_BODY)
    }
}

pub const INVALID_BODY: &str = "Corpo da requisição inválido. Envie um JSON com os campos esperados.";
