//! Handlers for `/rounds` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/rounds` | Body: `{"name":"2026 H1","include_kpi":true}` |
//! | `GET`  | `/rounds/:id` | 404 if not found |
//! | `POST` | `/rounds/:id/activate` | Plans assignments; 409 if another round is active |
//! | `POST` | `/rounds/:id/close` | 409 unless active |
//! | `POST` | `/rounds/:id/sync-kpi` | Adds KPI assignments for new reports |

use std::sync::Arc;

use appraisal_core::{
  engine::{Activation, Engine},
  round::{NewRound, Round},
  store::EvaluationStore,
};
use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::error::ApiError;

/// `POST /rounds`
pub async fn create<S: EvaluationStore>(
  State(engine): State<Arc<Engine<S>>>,
  Json(body): Json<NewRound>,
) -> Result<impl IntoResponse, ApiError> {
  if body.name.trim().is_empty() {
    return Err(ApiError::BadRequest("round name must not be empty".into()));
  }
  let round = engine.create_round(body).await?;
  Ok((StatusCode::CREATED, Json(round)))
}

/// `GET /rounds/:id`
pub async fn get_one<S: EvaluationStore>(
  State(engine): State<Arc<Engine<S>>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Round>, ApiError> {
  Ok(Json(engine.get_round(id).await?))
}

/// `POST /rounds/:id/activate`
pub async fn activate<S: EvaluationStore>(
  State(engine): State<Arc<Engine<S>>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Activation>, ApiError> {
  Ok(Json(engine.activate_round(id).await?))
}

/// `POST /rounds/:id/close`
pub async fn close<S: EvaluationStore>(
  State(engine): State<Arc<Engine<S>>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Round>, ApiError> {
  Ok(Json(engine.close_round(id).await?))
}

/// `POST /rounds/:id/sync-kpi`
pub async fn sync_kpi<S: EvaluationStore>(
  State(engine): State<Arc<Engine<S>>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
  let added = engine.sync_kpi_assignments(id).await?;
  Ok(Json(json!({ "added": added })))
}
