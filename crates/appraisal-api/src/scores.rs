//! Read-only score endpoints under `/rounds/:id/people/:person`.

use std::sync::Arc;

use appraisal_core::{
  aggregate::{CategoryBreakdown, KpiMode, KpiScore, Performance, TrimmedMean},
  engine::Engine,
  store::EvaluationStore,
};
use axum::{
  Json,
  extract::{Path, Query, State},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;

#[derive(Debug, Default, Deserialize)]
pub struct KpiParams {
  /// `display` also counts pending ratings while nothing is approved.
  #[serde(default)]
  pub mode: Option<String>,
}

/// `GET /rounds/:id/people/:person/kpi[?mode=approved|display]`
pub async fn kpi<S: EvaluationStore>(
  State(engine): State<Arc<Engine<S>>>,
  Path((round_id, person_id)): Path<(Uuid, Uuid)>,
  Query(params): Query<KpiParams>,
) -> Result<Json<KpiScore>, ApiError> {
  let mode = match params.mode.as_deref() {
    None | Some("approved") => KpiMode::Approved,
    Some("display") => KpiMode::Display,
    Some(other) => return Err(ApiError::BadRequest(format!("unknown mode: {other}"))),
  };
  Ok(Json(engine.compute_kpi_score(person_id, round_id, mode).await?))
}

/// `GET /rounds/:id/people/:person/feedback`
pub async fn feedback<S: EvaluationStore>(
  State(engine): State<Arc<Engine<S>>>,
  Path((round_id, person_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<TrimmedMean>, ApiError> {
  Ok(Json(engine.compute_360_score(person_id, round_id).await?))
}

/// `GET /rounds/:id/people/:person/feedback/categories`
pub async fn categories<S: EvaluationStore>(
  State(engine): State<Arc<Engine<S>>>,
  Path((round_id, person_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Vec<CategoryBreakdown>>, ApiError> {
  Ok(Json(engine.feedback_by_category(person_id, round_id).await?))
}

/// `GET /rounds/:id/people/:person/performance`
pub async fn performance<S: EvaluationStore>(
  State(engine): State<Arc<Engine<S>>>,
  Path((round_id, person_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Performance>, ApiError> {
  Ok(Json(engine.compute_performance(person_id, round_id).await?))
}
