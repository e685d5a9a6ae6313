use std::collections::BTreeSet;

use serde::Serialize;
use strum::{AsRefStr, Display};

use crate::relationship::InteractionScope;

const VOLUME_WEIGHT: f64 = 40.0;
const DIVERSITY_WEIGHT: f64 = 25.0;
const CONSISTENCY_WEIGHT: f64 = 25.0;
const RELEVANCE_WEIGHT: f64 = 10.0;
const SCOPE_COUNT: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, AsRefStr, Display)]
pub enum ConfidenceLabel {
  #[serde(rename = "Very High")]
  #[strum(serialize = "Very High")]
  VeryHigh,
  High,
  Medium,
  Low,
  #[serde(rename = "Very Low")]
  #[strum(serialize = "Very Low")]
  VeryLow,
  Critical,
  #[serde(rename = "No Confidence")]
  #[strum(serialize = "No Confidence")]
  NoConfidence,
}

impl ConfidenceLabel {
  pub fn from_percentage(percentage: f64) -> Self {
    match percentage {
      p if p >= 90.0 => Self::VeryHigh,
      p if p >= 75.0 => Self::High,
      p if p >= 60.0 => Self::Medium,
      p if p >= 40.0 => Self::Low,
      p if p >= 20.0 => Self::VeryLow,
      p if p > 0.0 => Self::Critical,
      _ => Self::NoConfidence,
    }
  }
}

/// Points earned per pillar, out of 40 / 25 / 25 / 10.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ConfidencePillars {
  pub volume:      f64,
  pub diversity:   f64,
  pub consistency: f64,
  pub relevance:   f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Confidence {
  /// 0-100.
  pub percentage: f64,
  /// 0-1.
  pub confidence: f64,
  pub label:      ConfidenceLabel,
  pub pillars:    ConfidencePillars,
}

/// Reliability of a ratee's 360 feedback.
///
/// `rater_count` is the number of distinct raters who submitted anything.
/// `scopes` holds the interaction scope of each of those raters that could be
/// resolved against the active roster; unresolved raters count towards
/// volume only. `responses` are all individual scored answers.
pub fn confidence(
  rater_count: usize,
  scopes: &[InteractionScope],
  responses: &[f64],
  volume_target: usize,
) -> Confidence {
  let volume = (rater_count as f64 / volume_target.max(1) as f64).min(1.0) * VOLUME_WEIGHT;

  let distinct = scopes.iter().collect::<BTreeSet<_>>().len().min(SCOPE_COUNT);
  let diversity = distinct as f64 / SCOPE_COUNT as f64 * DIVERSITY_WEIGHT;

  let consistency = consistency_factor(responses) * CONSISTENCY_WEIGHT;

  let relevance = if rater_count == 0 {
    0.0
  } else {
    let relevant = scopes.iter().filter(|s| **s != InteractionScope::Indirect).count();
    relevant as f64 / rater_count as f64 * RELEVANCE_WEIGHT
  };

  let percentage = volume + diversity + consistency + relevance;
  Confidence {
    percentage,
    confidence: percentage / 100.0,
    label: ConfidenceLabel::from_percentage(percentage),
    pillars: ConfidencePillars { volume, diversity, consistency, relevance },
  }
}

/// Banded inverse of the population standard deviation.
fn consistency_factor(responses: &[f64]) -> f64 {
  match responses.len() {
    0 => 0.0,
    1 => 0.6,
    n => {
      let mean = responses.iter().sum::<f64>() / n as f64;
      let variance = responses.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n as f64;
      match variance.sqrt() {
        sd if sd <= 0.5 => 1.0,
        sd if sd <= 0.8 => 0.8,
        sd if sd <= 1.1 => 0.6,
        sd if sd <= 1.5 => 0.4,
        _ => 0.2,
      }
    }
  }
}
