//! KPI definitions and which people they apply to.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
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
pub enum KpiStatus {
  Draft,
  PendingReview,
  Approved,
  Declined,
}

/// Who a KPI is scored for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Applicability {
  Global,
  Assigned { people: BTreeSet<Uuid> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpiDefinition {
  pub kpi_id:        Uuid,
  pub name:          String,
  /// 0-100. Advisory: the weights of one person's KPIs need not sum to 100.
  pub weight:        Option<f64>,
  pub applicability: Applicability,
  pub status:        KpiStatus,
  pub active:        bool,
}

impl KpiDefinition {
  /// Usable weight, or `None` when unset or zero.
  pub fn effective_weight(&self) -> Option<f64> {
    self.weight.filter(|w| w.is_finite() && *w > 0.0)
  }

  /// Whether an evaluator may score this KPI for `person`.
  pub fn applies_to(&self, person: Uuid) -> bool {
    if !self.active || self.status != KpiStatus::Approved {
      return false;
    }
    match &self.applicability {
      Applicability::Global => true,
      Applicability::Assigned { people } => people.contains(&person),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn kpi(weight: Option<f64>, applicability: Applicability) -> KpiDefinition {
    KpiDefinition {
      kpi_id: Uuid::new_v4(),
      name: "On-time delivery".into(),
      weight,
      applicability,
      status: KpiStatus::Approved,
      active: true,
    }
  }

  #[test]
  fn zero_weight_counts_as_unset() {
    assert_eq!(kpi(Some(0.0), Applicability::Global).effective_weight(), None);
    assert_eq!(kpi(None, Applicability::Global).effective_weight(), None);
    assert_eq!(kpi(Some(30.0), Applicability::Global).effective_weight(), Some(30.0));
  }

  #[test]
  fn applicability() {
    let person = Uuid::new_v4();
    let assigned = kpi(None, Applicability::Assigned { people: BTreeSet::from([person]) });
    assert!(assigned.applies_to(person));
    assert!(!assigned.applies_to(Uuid::new_v4()));

    let mut draft = kpi(None, Applicability::Global);
    draft.status = KpiStatus::Draft;
    assert!(!draft.applies_to(person));
  }
}
