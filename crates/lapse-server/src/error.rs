//! Admin API errors and their `IntoResponse` mapping.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
  /// Another cycle, or a reset, holds the cycle lock.
  #[error("a reconciliation cycle is already in progress")]
  Busy,

  #[error(transparent)]
  Cycle(#[from] lapse_engine::Error),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = match &self {
      ApiError::Busy => StatusCode::CONFLICT,
      ApiError::Cycle(lapse_engine::Error::Source(_)) => StatusCode::BAD_GATEWAY,
      ApiError::Cycle(lapse_engine::Error::Store(_)) | ApiError::Store(_) => {
        StatusCode::INTERNAL_SERVER_ERROR
      }
    };
    if status.is_server_error() {
      tracing::error!(error = %self, "admin request failed");
    }
    (status, Json(json!({ "error": self.to_string() }))).into_response()
  }
}
