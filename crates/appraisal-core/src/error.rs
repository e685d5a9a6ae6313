//! Error types for `appraisal-core`.

use thiserror::Error;
use uuid::Uuid;

use crate::{rating::RatingStatus, round::RoundStatus};

#[derive(Debug, Error)]
pub enum Error {
  #[error("pseudonymization secret must not be empty")]
  EmptySecret,

  #[error("round not found: {0}")]
  RoundNotFound(Uuid),

  #[error("person not found: {0}")]
  PersonNotFound(Uuid),

  #[error("rating not found: {0}")]
  RatingNotFound(Uuid),

  #[error("round {active} is already active; close it before activating another")]
  AnotherRoundActive { active: Uuid },

  #[error("round {round} is {status} and cannot be {action}")]
  InvalidRoundTransition {
    round:  Uuid,
    status: RoundStatus,
    action: &'static str,
  },

  #[error("at least 2 active people are needed to plan a round, found {0}")]
  RosterTooSmall(usize),

  #[error("no {kind} assignment for this rater and ratee in round {round}")]
  NotAssigned { kind: &'static str, round: Uuid },

  #[error("round {0} is not active")]
  RoundNotActive(Uuid),

  #[error("score {score} for {item} is outside 1-5")]
  ScoreOutOfRange { item: Uuid, score: f64 },

  #[error("question {0} is not available to this rater")]
  QuestionNotEligible(Uuid),

  #[error("KPI {0} does not apply to this ratee")]
  KpiNotApplicable(Uuid),

  #[error("{what} already submitted in round {round}; it can no longer be saved as a draft")]
  AlreadySubmitted { what: &'static str, round: Uuid },

  #[error("rating {id} is {status} and cannot be reviewed")]
  NotReviewable { id: Uuid, status: RatingStatus },

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// Wrap a backend error; used with `map_err` on every store call.
  pub fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
