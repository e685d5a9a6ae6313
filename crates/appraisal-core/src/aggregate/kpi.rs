use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::{
  kpi::KpiDefinition,
  policy::OrgPolicy,
  rating::{RatingItem, RatingStatus},
};

/// Which rating statuses qualify.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KpiMode {
  /// Approved and final ratings only.
  Approved,
  /// Approved ratings, or pending-review ones when nothing is approved yet.
  Display,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct KpiScore {
  pub score:            f64,
  /// Ratings that contributed. Zero means "no data", not a score of zero.
  pub qualifying_count: usize,
}

impl KpiScore {
  pub const NONE: Self = Self { score: 0.0, qualifying_count: 0 };
}

/// Weight-normalized KPI average for one ratee.
///
/// `evaluator_roles` maps evaluator ids to their current role label; it is
/// consulted only when the policy names an authoritative rater for
/// `ratee_role`.
pub fn kpi_score(
  items: &[RatingItem],
  ratee_role: &str,
  evaluator_roles: &HashMap<Uuid, String>,
  kpis: &HashMap<Uuid, KpiDefinition>,
  policy: &OrgPolicy,
  mode: KpiMode,
) -> KpiScore {
  let approved: Vec<&RatingItem> = items.iter().filter(|i| i.status.is_approved()).collect();
  let mut qualifying = match mode {
    KpiMode::Display if approved.is_empty() => items
      .iter()
      .filter(|i| i.status == RatingStatus::PendingReview)
      .collect(),
    _ => approved,
  };

  if let Some(authority) = policy.authoritative_rater(ratee_role) {
    let authoritative: Vec<_> = qualifying
      .iter()
      .copied()
      .filter(|i| {
        evaluator_roles
          .get(&i.evaluator_id)
          .is_some_and(|role| policy.is_role(role, authority))
      })
      .collect();
    if authoritative.is_empty() {
      debug!(%authority, "no ratings from the authoritative rater; using all ratings");
    } else {
      qualifying = authoritative;
    }
  }

  let mut sums: BTreeMap<Uuid, (f64, usize)> = BTreeMap::new();
  let mut count = 0;
  for item in qualifying {
    let Some(scores) = item.scores() else { continue };
    count += 1;
    for (kpi, score) in scores {
      let slot = sums.entry(kpi).or_default();
      slot.0 += score;
      slot.1 += 1;
    }
  }

  if sums.is_empty() {
    return KpiScore { score: 0.0, qualifying_count: count };
  }

  let fallback = 100.0 / sums.len() as f64;
  let (weighted, total) = sums.iter().fold((0.0, 0.0), |(weighted, total), (kpi, (sum, n))| {
    let weight = kpis
      .get(kpi)
      .and_then(KpiDefinition::effective_weight)
      .unwrap_or(fallback);
    (weighted + (sum / *n as f64) * weight, total + weight)
  });

  KpiScore { score: weighted / total, qualifying_count: count }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::kpi::{Applicability, KpiStatus};

  fn definition(weight: Option<f64>) -> KpiDefinition {
    KpiDefinition {
      kpi_id: Uuid::new_v4(),
      name: "KPI".into(),
      weight,
      applicability: Applicability::Global,
      status: KpiStatus::Approved,
      active: true,
    }
  }

  fn rating(evaluator: Uuid, status: RatingStatus, scores: &[(Uuid, f64)]) -> RatingItem {
    let map: serde_json::Map<_, _> = scores
      .iter()
      .map(|(k, v)| (k.to_string(), serde_json::json!(v)))
      .collect();
    RatingItem {
      rating_id: Uuid::new_v4(),
      evaluator_id: evaluator,
      ratee_id: Uuid::new_v4(),
      round_id: Uuid::new_v4(),
      scores_json: serde_json::Value::Object(map).to_string(),
      comment: None,
      status,
      submitted_at: None,
      approved_at: None,
      approved_by: None,
    }
  }

  fn index(defs: &[KpiDefinition]) -> HashMap<Uuid, KpiDefinition> {
    defs.iter().map(|d| (d.kpi_id, d.clone())).collect()
  }

  fn dp_policy() -> OrgPolicy {
    serde_json::from_value(serde_json::json!({
      "authority": [{
        "ratee": { "match": "prefix", "role": "DP", "except": ["DP Supervisor"] },
        "rater": "DP Supervisor"
      }]
    }))
    .unwrap()
  }

  #[test]
  fn weights_are_normalized_by_their_sum() {
    let (a, b) = (definition(Some(30.0)), definition(Some(20.0)));
    let items = [rating(Uuid::new_v4(), RatingStatus::Approved, &[(a.kpi_id, 4.0), (b.kpi_id, 2.0)])];
    let score = kpi_score(
      &items,
      "Ops 1",
      &HashMap::new(),
      &index(&[a, b]),
      &OrgPolicy::default(),
      KpiMode::Approved,
    );
    assert!((score.score - 3.2).abs() < 1e-9);
    assert_eq!(score.qualifying_count, 1);
  }

  #[test]
  fn unset_weights_fall_back_to_equal_shares() {
    let (a, b) = (definition(None), definition(Some(0.0)));
    let items = [rating(Uuid::new_v4(), RatingStatus::Final, &[(a.kpi_id, 4.0), (b.kpi_id, 2.0)])];
    let score = kpi_score(
      &items,
      "Ops 1",
      &HashMap::new(),
      &index(&[a, b]),
      &OrgPolicy::default(),
      KpiMode::Approved,
    );
    assert!((score.score - 3.0).abs() < 1e-9);
  }

  #[test]
  fn kpi_averages_across_raters_first() {
    let a = definition(None);
    let items = [
      rating(Uuid::new_v4(), RatingStatus::Approved, &[(a.kpi_id, 5.0)]),
      rating(Uuid::new_v4(), RatingStatus::Approved, &[(a.kpi_id, 3.0)]),
    ];
    let score = kpi_score(
      &items,
      "CFO",
      &HashMap::new(),
      &index(&[a]),
      &OrgPolicy::default(),
      KpiMode::Approved,
    );
    assert_eq!(score, KpiScore { score: 4.0, qualifying_count: 2 });
  }

  #[test]
  fn no_data_is_distinguishable_from_zero() {
    let items = [rating(Uuid::new_v4(), RatingStatus::PendingReview, &[(Uuid::new_v4(), 4.0)])];
    let score = kpi_score(
      &items,
      "CFO",
      &HashMap::new(),
      &HashMap::new(),
      &OrgPolicy::default(),
      KpiMode::Approved,
    );
    assert_eq!(score, KpiScore::NONE);
  }

  #[test]
  fn display_mode_falls_back_to_pending_review() {
    let a = definition(None);
    let items = [rating(Uuid::new_v4(), RatingStatus::PendingReview, &[(a.kpi_id, 4.0)])];
    let score = kpi_score(
      &items,
      "CFO",
      &HashMap::new(),
      &index(&[a.clone()]),
      &OrgPolicy::default(),
      KpiMode::Display,
    );
    assert_eq!(score, KpiScore { score: 4.0, qualifying_count: 1 });

    let mut both = items.to_vec();
    both.push(rating(Uuid::new_v4(), RatingStatus::Approved, &[(a.kpi_id, 2.0)]));
    let score = kpi_score(
      &both,
      "CFO",
      &HashMap::new(),
      &index(&[a]),
      &OrgPolicy::default(),
      KpiMode::Display,
    );
    assert_eq!(score, KpiScore { score: 2.0, qualifying_count: 1 });
  }

  #[test]
  fn authoritative_rater_wins() {
    let a = definition(None);
    let (supervisor, peer) = (Uuid::new_v4(), Uuid::new_v4());
    let roles = HashMap::from([
      (supervisor, "DP Supervisor".to_string()),
      (peer, "Unit Manager".to_string()),
    ]);
    let items = [
      rating(supervisor, RatingStatus::Approved, &[(a.kpi_id, 5.0)]),
      rating(peer, RatingStatus::Approved, &[(a.kpi_id, 1.0)]),
    ];
    let score = kpi_score(&items, "DP 2", &roles, &index(&[a]), &dp_policy(), KpiMode::Approved);
    assert_eq!(score, KpiScore { score: 5.0, qualifying_count: 1 });
  }

  #[test]
  fn authority_falls_back_to_all_ratings() {
    let a = definition(None);
    let items = [
      rating(Uuid::new_v4(), RatingStatus::Approved, &[(a.kpi_id, 5.0)]),
      rating(Uuid::new_v4(), RatingStatus::Approved, &[(a.kpi_id, 1.0)]),
    ];
    let score =
      kpi_score(&items, "DP 2", &HashMap::new(), &index(&[a]), &dp_policy(), KpiMode::Approved);
    assert_eq!(score, KpiScore { score: 3.0, qualifying_count: 2 });
  }

  #[test]
  fn malformed_payloads_are_skipped_per_record() {
    let a = definition(None);
    let mut broken = rating(Uuid::new_v4(), RatingStatus::Approved, &[]);
    broken.scores_json = "\"not an object\"".into();
    let items = [broken, rating(Uuid::new_v4(), RatingStatus::Approved, &[(a.kpi_id, 4.0)])];
    let score = kpi_score(
      &items,
      "CFO",
      &HashMap::new(),
      &index(&[a]),
      &OrgPolicy::default(),
      KpiMode::Approved,
    );
    assert_eq!(score, KpiScore { score: 4.0, qualifying_count: 1 });
  }
}
