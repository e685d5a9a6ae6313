//! The `EvaluationStore` trait.
//!
//! The trait is implemented by storage backends (e.g.
//! `appraisal-store-sqlite`). The engine and the HTTP layer depend on this
//! abstraction, not on any concrete backend.

use std::future::Future;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
  assignment::{AssignmentKind, AssignmentRecord, RaterRef},
  feedback::{FeedbackItem, RaterScore},
  kpi::KpiDefinition,
  pseudonym::RaterToken,
  question::FeedbackQuestion,
  rating::{RatingItem, RatingStatus},
  relationship::RelationshipFact,
  round::{NewRound, Person, Round, RoundStatus},
};

/// Persistence for rounds, reference data, assignments and submissions.
///
/// The store holds no mapping from rater tokens back to people: 360
/// assignments, feedback and cached scores carry the token only.
///
/// All methods return `Send` futures so the trait can be used behind `axum`.
pub trait EvaluationStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Roster and reference data ─────────────────────────────────────────

  /// Insert or replace a roster entry.
  fn upsert_person(
    &self,
    person: Person,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn get_person(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Person>, Self::Error>> + Send + '_;

  /// All people, or only active ones, ordered by name then id.
  fn list_people(
    &self,
    active_only: bool,
  ) -> impl Future<Output = Result<Vec<Person>, Self::Error>> + Send + '_;

  /// Insert or replace relationship facts keyed by (rater role, ratee role).
  fn put_relationships(
    &self,
    facts: Vec<RelationshipFact>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn list_relationships(
    &self,
  ) -> impl Future<Output = Result<Vec<RelationshipFact>, Self::Error>> + Send + '_;

  fn upsert_question(
    &self,
    question: FeedbackQuestion,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn list_questions(
    &self,
  ) -> impl Future<Output = Result<Vec<FeedbackQuestion>, Self::Error>> + Send + '_;

  fn upsert_kpi(
    &self,
    kpi: KpiDefinition,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn list_kpis(
    &self,
  ) -> impl Future<Output = Result<Vec<KpiDefinition>, Self::Error>> + Send + '_;

  // ── Rounds ────────────────────────────────────────────────────────────

  /// Persist a new round in [`RoundStatus::Draft`].
  fn create_round(
    &self,
    input: NewRound,
  ) -> impl Future<Output = Result<Round, Self::Error>> + Send + '_;

  fn get_round(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Round>, Self::Error>> + Send + '_;

  /// The round currently in [`RoundStatus::Active`], if any.
  fn active_round(
    &self,
  ) -> impl Future<Output = Result<Option<Round>, Self::Error>> + Send + '_;

  fn set_round_status(
    &self,
    id: Uuid,
    status: RoundStatus,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Assignments ───────────────────────────────────────────────────────

  /// Atomically replace every assignment of `kind` in `round_id` with
  /// `records`, discarding that kind's submissions with them. Returns the
  /// number of records stored.
  fn replace_assignments(
    &self,
    round_id: Uuid,
    kind: AssignmentKind,
    records: Vec<AssignmentRecord>,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  /// Insert records, ignoring ones that already exist. Returns the number
  /// actually inserted.
  fn insert_assignments(
    &self,
    records: Vec<AssignmentRecord>,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  fn has_assignment(
    &self,
    round_id: Uuid,
    rater: RaterRef,
    ratee_id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  fn list_assignments(
    &self,
    round_id: Uuid,
    kind: AssignmentKind,
  ) -> impl Future<Output = Result<Vec<AssignmentRecord>, Self::Error>> + Send + '_;

  // ── KPI ratings ───────────────────────────────────────────────────────

  /// Insert or update the rating for (evaluator, ratee, round). An existing
  /// row keeps its id. Returns the stored row.
  fn upsert_rating(
    &self,
    rating: RatingItem,
  ) -> impl Future<Output = Result<RatingItem, Self::Error>> + Send + '_;

  fn get_rating(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<RatingItem>, Self::Error>> + Send + '_;

  /// Record an approver's decision.
  fn review_rating(
    &self,
    id: Uuid,
    status: RatingStatus,
    approver: Uuid,
    at: DateTime<Utc>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Every rating received by `ratee_id` in `round_id`, any status.
  fn list_ratings(
    &self,
    round_id: Uuid,
    ratee_id: Uuid,
  ) -> impl Future<Output = Result<Vec<RatingItem>, Self::Error>> + Send + '_;

  // ── 360 feedback ──────────────────────────────────────────────────────

  /// Insert or update answers keyed by (token, ratee, round, question), all
  /// in one transaction. A submitted answer never reverts to draft.
  fn upsert_feedback(
    &self,
    items: Vec<FeedbackItem>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Every answer about `ratee_id` in `round_id`, any status.
  fn list_feedback(
    &self,
    round_id: Uuid,
    ratee_id: Uuid,
  ) -> impl Future<Output = Result<Vec<FeedbackItem>, Self::Error>> + Send + '_;

  fn upsert_rater_score(
    &self,
    score: RaterScore,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn delete_rater_score(
    &self,
    round_id: Uuid,
    rater_token: RaterToken,
    ratee_id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn list_rater_scores(
    &self,
    round_id: Uuid,
    ratee_id: Uuid,
  ) -> impl Future<Output = Result<Vec<RaterScore>, Self::Error>> + Send + '_;
}
