//! JSON REST API for the appraisal engine.
//!
//! Exposes an axum [`Router`] backed by an [`Engine`] over any
//! [`EvaluationStore`]. Auth, TLS, and transport concerns are the caller's
//! responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", appraisal_api::api_router(engine.clone()))
//! ```

pub mod error;
pub mod rounds;
pub mod scores;
pub mod submissions;

use std::sync::Arc;

use appraisal_core::{engine::Engine, store::EvaluationStore};
use axum::{
  Router,
  routing::{get, post},
};
use tower_http::trace::TraceLayer;

pub use error::ApiError;

/// Build a fully-materialised API router for `engine`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(engine: Arc<Engine<S>>) -> Router<()>
where
  S: EvaluationStore + 'static,
{
  Router::new()
    // Rounds
    .route("/rounds", post(rounds::create::<S>))
    .route("/rounds/{id}", get(rounds::get_one::<S>))
    .route("/rounds/{id}/activate", post(rounds::activate::<S>))
    .route("/rounds/{id}/close", post(rounds::close::<S>))
    .route("/rounds/{id}/sync-kpi", post(rounds::sync_kpi::<S>))
    // Scores
    .route("/rounds/{id}/people/{person}/kpi", get(scores::kpi::<S>))
    .route("/rounds/{id}/people/{person}/feedback", get(scores::feedback::<S>))
    .route(
      "/rounds/{id}/people/{person}/feedback/categories",
      get(scores::categories::<S>),
    )
    .route("/rounds/{id}/people/{person}/performance", get(scores::performance::<S>))
    // Submissions
    .route("/rounds/{id}/people/{person}/questions", get(submissions::questions::<S>))
    .route("/rounds/{id}/feedback", post(submissions::feedback::<S>))
    .route("/rounds/{id}/ratings", post(submissions::rating::<S>))
    .route("/ratings/{id}/review", post(submissions::review::<S>))
    .layer(TraceLayer::new_for_http())
    .with_state(engine)
}

#[cfg(test)]
mod tests;
