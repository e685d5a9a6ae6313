//! Read-time score aggregation.
//!
//! Everything here is a pure function over already-loaded records. Missing
//! data never fails; it degrades to zero with an explicit count of zero.

mod confidence;
mod feedback;
mod kpi;

use serde::Serialize;

pub use self::{
  confidence::{Confidence, ConfidenceLabel, ConfidencePillars, confidence},
  feedback::{
    CategoryBreakdown, TrimmedMean, by_category, feedback_score, rater_means, scored_answers,
    trimmed_mean,
  },
  kpi::{KpiMode, KpiScore, kpi_score},
};
use crate::{config::ScoringConfig, round::Round};

/// Everything a results page shows for one person in one round.
#[derive(Debug, Clone, Serialize)]
pub struct Performance {
  pub kpi:         KpiScore,
  pub feedback:    TrimmedMean,
  /// Distinct raters with at least one submitted answer.
  pub rater_count: usize,
  pub final_score: f64,
  pub confidence:  Confidence,
}

/// Blend the two components. A component counts only when the round
/// includes it and its score is positive.
pub fn combined_score(round: &Round, kpi: f64, feedback: f64, config: &ScoringConfig) -> f64 {
  let use_kpi = round.include_kpi && kpi > 0.0;
  let use_feedback = round.include_360 && feedback > 0.0;
  match (use_kpi, use_feedback) {
    (true, true) => kpi * config.kpi_weight + feedback * config.feedback_weight,
    (true, false) => kpi,
    (false, true) => feedback,
    (false, false) => 0.0,
  }
}

#[cfg(test)]
mod tests {
  use chrono::Utc;
  use uuid::Uuid;

  use super::*;
  use crate::round::RoundStatus;

  fn round(include_kpi: bool, include_360: bool) -> Round {
    Round {
      round_id: Uuid::new_v4(),
      name: "H1".into(),
      status: RoundStatus::Active,
      include_kpi,
      include_360,
      starts_on: None,
      ends_on: None,
      created_at: Utc::now(),
    }
  }

  #[test]
  fn blends_both_components() {
    let score = combined_score(&round(true, true), 4.0, 3.0, &ScoringConfig::default());
    assert!((score - 3.6).abs() < 1e-9);
  }

  #[test]
  fn single_component_passes_through() {
    let config = ScoringConfig::default();
    assert_eq!(combined_score(&round(true, true), 0.0, 3.0, &config), 3.0);
    assert_eq!(combined_score(&round(false, true), 4.0, 3.0, &config), 3.0);
    assert_eq!(combined_score(&round(true, false), 4.0, 3.0, &config), 4.0);
    assert_eq!(combined_score(&round(false, false), 4.0, 3.0, &config), 0.0);
  }
}
