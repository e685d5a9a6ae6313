//! Error type for `appraisal-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// A text column held a value that does not name any variant.
  #[error("unknown {column} value: {value:?}")]
  UnknownValue { column: &'static str, value: String },

  #[error("round not found: {0}")]
  RoundNotFound(uuid::Uuid),

  #[error("rating not found: {0}")]
  RatingNotFound(uuid::Uuid),

  #[error("assignment for round {round} does not belong to the batch being replaced")]
  MismatchedAssignment { round: uuid::Uuid },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
