//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  /// Boundary input rejected before reaching the store.
  #[error("{message}")]
  Validation { field: Option<String>, message: String },

  /// The caller's `expected_version` is stale.
  #[error("version conflict: expected {expected}, record is at {actual}")]
  Conflict { expected: u32, actual: u32 },

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  pub fn store(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Store(Box::new(e))
  }
}

impl From<psur_core::Error> for ApiError {
  fn from(e: psur_core::Error) -> Self {
    Self::Validation {
      field:   Some(e.field().to_owned()),
      message: e.to_string(),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let message = self.to_string();
    let body = match &self {
      ApiError::NotFound(m) | ApiError::BadRequest(m) => {
        json!({ "error": m })
      }
      ApiError::Validation { field, .. } => {
        json!({ "error": message, "field": field })
      }
      ApiError::Conflict { actual, .. } => {
        json!({ "error": message, "current_version": actual })
      }
      ApiError::Store(_) => json!({ "error": message }),
    };
    let status = match self {
      ApiError::NotFound(_) => StatusCode::NOT_FOUND,
      ApiError::BadRequest(_) | ApiError::Validation { .. } => StatusCode::BAD_REQUEST,
      ApiError::Conflict { .. } => StatusCode::CONFLICT,
      ApiError::Store(e) => {
        tracing::error!(error = %e, "store failure");
        StatusCode::INTERNAL_SERVER_ERROR
      }
    };
    (status, Json(body)).into_response()
  }
}
