//! Anonymous 360 feedback answers and the per-rater score cache.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use crate::pseudonym::{AttributeToken, RaterToken};

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
pub enum FeedbackStatus {
  Draft,
  Submitted,
}

/// Pseudonymized rater attributes stored alongside each answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RaterAttributes {
  pub department: AttributeToken,
  pub role:       AttributeToken,
  /// Whether the rater is the ratee's line manager.
  pub is_manager: AttributeToken,
}

/// One answer. Unique per (token, ratee, round, question).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackItem {
  pub rater_token:  RaterToken,
  pub ratee_id:     Uuid,
  pub round_id:     Uuid,
  pub question_id:  Uuid,
  /// 1-5, absent for open-ended questions.
  pub score:        Option<f64>,
  pub comment:      Option<String>,
  pub status:       FeedbackStatus,
  pub submitted_at: Option<DateTime<Utc>>,
  pub attributes:   RaterAttributes,
}

/// Cached mean of one rater's scored answers for a ratee.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaterScore {
  pub rater_token:    RaterToken,
  pub ratee_id:       Uuid,
  pub round_id:       Uuid,
  pub score:          f64,
  pub question_count: usize,
  pub updated_at:     DateTime<Utc>,
}
