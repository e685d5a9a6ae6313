//! Tunables for planning and scoring.

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
  /// Peer raters targeted per ratee, and the cap on assignments per rater.
  pub max_per_person: usize,
  /// Share of a ratee's raters that should have a direct relationship.
  pub direct_share:   f64,
  /// How many of the best-scoring candidates a pick is drawn from.
  pub top_tier_width: usize,
  /// Fixed seed for reproducible plans.
  pub seed:           Option<u64>,
}

impl Default for PlannerConfig {
  fn default() -> Self {
    Self {
      max_per_person: 10,
      direct_share:   0.7,
      top_tier_width: 25,
      seed:           None,
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
  pub kpi_weight:      f64,
  pub feedback_weight: f64,
  /// Rater count at which the volume pillar is fully credited.
  pub volume_target:   usize,
}

impl Default for ScoringConfig {
  fn default() -> Self {
    Self {
      kpi_weight:      0.6,
      feedback_weight: 0.4,
      volume_target:   10,
    }
  }
}
