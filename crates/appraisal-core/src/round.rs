//! Evaluation rounds and the roster entries they are planned over.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

// ─── Person ──────────────────────────────────────────────────────────────────

/// A roster entry. Owned by the surrounding application; the engine only
/// reads it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
  pub person_id:  Uuid,
  pub name:       String,
  /// Free-text role label; the key into the relationship matrix and the
  /// hierarchy table.
  pub role:       String,
  pub department: String,
  pub manager_id: Option<Uuid>,
  pub active:     bool,
}

// ─── Round ───────────────────────────────────────────────────────────────────

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  AsRefStr,
  Display,
  EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RoundStatus {
  Draft,
  Active,
  Completed,
}

/// One evaluation cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Round {
  pub round_id:    Uuid,
  pub name:        String,
  pub status:      RoundStatus,
  pub include_kpi: bool,
  pub include_360: bool,
  pub starts_on:   Option<NaiveDate>,
  pub ends_on:     Option<NaiveDate>,
  pub created_at:  DateTime<Utc>,
}

/// Input to [`crate::store::EvaluationStore::create_round`]. New rounds always
/// start as [`RoundStatus::Draft`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewRound {
  pub name:        String,
  #[serde(default = "default_true")]
  pub include_kpi: bool,
  #[serde(default = "default_true")]
  pub include_360: bool,
  #[serde(default)]
  pub starts_on:   Option<NaiveDate>,
  #[serde(default)]
  pub ends_on:     Option<NaiveDate>,
}

fn default_true() -> bool { true }

impl NewRound {
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name:        name.into(),
      include_kpi: true,
      include_360: true,
      starts_on:   None,
      ends_on:     None,
    }
  }
}
