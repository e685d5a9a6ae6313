//! API error type and [`axum::response::IntoResponse`] implementation.

use appraisal_core::Error as CoreError;
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

  #[error("forbidden: {0}")]
  Forbidden(String),

  #[error("conflict: {0}")]
  Conflict(String),

  #[error("internal error: {0}")]
  Internal(#[source] CoreError),
}

impl From<CoreError> for ApiError {
  fn from(e: CoreError) -> Self {
    let message = e.to_string();
    match e {
      CoreError::RoundNotFound(_) | CoreError::PersonNotFound(_) | CoreError::RatingNotFound(_) => {
        Self::NotFound(message)
      }
      CoreError::AnotherRoundActive { .. }
      | CoreError::InvalidRoundTransition { .. }
      | CoreError::RoundNotActive(_)
      | CoreError::AlreadySubmitted { .. }
      | CoreError::NotReviewable { .. } => Self::Conflict(message),
      CoreError::NotAssigned { .. } => Self::Forbidden(message),
      CoreError::RosterTooSmall(_)
      | CoreError::ScoreOutOfRange { .. }
      | CoreError::QuestionNotEligible(_)
      | CoreError::KpiNotApplicable(_) => Self::BadRequest(message),
      other => Self::Internal(other),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::Forbidden(m) => (StatusCode::FORBIDDEN, m.clone()),
      ApiError::Conflict(m) => (StatusCode::CONFLICT, m.clone()),
      ApiError::Internal(e) => {
        tracing::error!(error = %e, "request failed");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
      }
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}
