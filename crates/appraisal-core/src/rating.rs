//! KPI rating items.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{AsRefStr, Display, EnumString};
use tracing::warn;
use uuid::Uuid;

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
pub enum RatingStatus {
  Draft,
  PendingReview,
  Approved,
  Final,
  Declined,
}

impl RatingStatus {
  /// Counts towards the KPI score.
  pub fn is_approved(self) -> bool { matches!(self, Self::Approved | Self::Final) }
}

/// A manager's KPI scores for one subordinate in one round.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatingItem {
  pub rating_id:    Uuid,
  pub evaluator_id: Uuid,
  pub ratee_id:     Uuid,
  pub round_id:     Uuid,
  /// JSON object of KPI id → score. Kept as stored text so a malformed
  /// payload only costs the one record.
  pub scores_json:  String,
  pub comment:      Option<String>,
  pub status:       RatingStatus,
  pub submitted_at: Option<DateTime<Utc>>,
  pub approved_at:  Option<DateTime<Utc>>,
  pub approved_by:  Option<Uuid>,
}

impl RatingItem {
  /// The parsed score payload.
  ///
  /// Returns `None` when the payload is not a JSON object. Entries whose key
  /// is not a KPI id or whose value is not numeric are dropped.
  pub fn scores(&self) -> Option<BTreeMap<Uuid, f64>> {
    let value: Value = match serde_json::from_str(&self.scores_json) {
      Ok(v) => v,
      Err(e) => {
        warn!(rating = %self.rating_id, error = %e, "unparseable KPI score payload");
        return None;
      }
    };
    let Value::Object(map) = value else {
      warn!(rating = %self.rating_id, "KPI score payload is not an object");
      return None;
    };

    let mut scores = BTreeMap::new();
    for (key, value) in map {
      let score = match &value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
      };
      match (key.parse::<Uuid>(), score) {
        (Ok(kpi), Some(score)) if score.is_finite() => {
          scores.insert(kpi, score);
        }
        _ => warn!(rating = %self.rating_id, entry = %key, "skipping malformed KPI score"),
      }
    }
    Some(scores)
  }
}
