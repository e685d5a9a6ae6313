//! Handlers that record feedback answers and KPI ratings.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/rounds/:id/people/:person/questions?rater=…` | Questions `rater` answers about `person` |
//! | `POST` | `/rounds/:id/feedback` | 403 without a peer assignment |
//! | `POST` | `/rounds/:id/ratings` | 403 without a KPI assignment |
//! | `POST` | `/ratings/:id/review` | Body: `{"approver_id":"…","approve":true}` |

use std::{collections::BTreeMap, sync::Arc};

use appraisal_core::{
  engine::{Engine, FeedbackSubmission, RatingSubmission},
  question::FeedbackQuestion,
  rating::{RatingItem, RatingStatus},
  store::EvaluationStore,
};
use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::error::ApiError;

/// A rating as returned to clients, with the KPI scores decoded.
#[derive(Debug, Serialize)]
pub struct RatingView {
  pub rating_id:    Uuid,
  pub evaluator_id: Uuid,
  pub ratee_id:     Uuid,
  pub round_id:     Uuid,
  /// Empty when the stored payload does not decode.
  pub scores:       BTreeMap<Uuid, f64>,
  pub comment:      Option<String>,
  pub status:       RatingStatus,
  pub submitted_at: Option<DateTime<Utc>>,
  pub approved_at:  Option<DateTime<Utc>>,
  pub approved_by:  Option<Uuid>,
}

impl From<RatingItem> for RatingView {
  fn from(rating: RatingItem) -> Self {
    Self {
      scores:       rating.scores().unwrap_or_default(),
      rating_id:    rating.rating_id,
      evaluator_id: rating.evaluator_id,
      ratee_id:     rating.ratee_id,
      round_id:     rating.round_id,
      comment:      rating.comment,
      status:       rating.status,
      submitted_at: rating.submitted_at,
      approved_at:  rating.approved_at,
      approved_by:  rating.approved_by,
    }
  }
}

#[derive(Debug, Deserialize)]
pub struct QuestionParams {
  pub rater: Uuid,
}

/// `GET /rounds/:id/people/:person/questions?rater=…`
pub async fn questions<S: EvaluationStore>(
  State(engine): State<Arc<Engine<S>>>,
  Path((round_id, person_id)): Path<(Uuid, Uuid)>,
  Query(params): Query<QuestionParams>,
) -> Result<Json<Vec<FeedbackQuestion>>, ApiError> {
  engine.get_round(round_id).await?;
  Ok(Json(engine.questions_for(params.rater, person_id).await?))
}

/// `POST /rounds/:id/feedback`
pub async fn feedback<S: EvaluationStore>(
  State(engine): State<Arc<Engine<S>>>,
  Path(round_id): Path<Uuid>,
  Json(body): Json<FeedbackSubmission>,
) -> Result<impl IntoResponse, ApiError> {
  if body.answers.is_empty() {
    return Err(ApiError::BadRequest("at least one answer is required".into()));
  }
  let submitted = body.submit;
  let stored = engine.submit_feedback(round_id, body).await?;
  Ok(Json(json!({ "stored": stored, "submitted": submitted })))
}

/// `POST /rounds/:id/ratings`
pub async fn rating<S: EvaluationStore>(
  State(engine): State<Arc<Engine<S>>>,
  Path(round_id): Path<Uuid>,
  Json(body): Json<RatingSubmission>,
) -> Result<impl IntoResponse, ApiError> {
  if body.scores.is_empty() {
    return Err(ApiError::BadRequest("at least one KPI score is required".into()));
  }
  let rating = engine.submit_rating(round_id, body).await?;
  Ok((StatusCode::CREATED, Json(RatingView::from(rating))))
}

#[derive(Debug, Deserialize)]
pub struct ReviewBody {
  pub approver_id: Uuid,
  pub approve:     bool,
}

/// `POST /ratings/:id/review`
pub async fn review<S: EvaluationStore>(
  State(engine): State<Arc<Engine<S>>>,
  Path(id): Path<Uuid>,
  Json(body): Json<ReviewBody>,
) -> Result<Json<RatingView>, ApiError> {
  let rating = engine.review_rating(id, body.approver_id, body.approve).await?;
  Ok(Json(rating.into()))
}
