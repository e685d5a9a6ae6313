use std::collections::BTreeSet;

use tracing::{info, warn};
use uuid::Uuid;

use crate::{assignment::AssignmentRecord, policy::OrgPolicy, round::Person};

/// One `kpi` assignment per (manager, subordinate) pair of distinct active
/// people that the hierarchy allows. The output has no duplicates, and
/// re-planning the same round yields the same set.
pub fn plan_kpi_assignments(
  roster: &[Person],
  round_id: Uuid,
  policy: &OrgPolicy,
) -> Vec<AssignmentRecord> {
  if !policy.has_hierarchy() {
    warn!(%round_id, "no KPI hierarchy configured; nobody will be assigned KPI ratings");
    return Vec::new();
  }

  let active: Vec<&Person> = roster.iter().filter(|p| p.active).collect();
  let mut records = BTreeSet::new();
  for manager in &active {
    if policy.resolve_hierarchy(&manager.role).is_empty() {
      continue;
    }
    for subordinate in &active {
      if manager.person_id != subordinate.person_id
        && policy.may_rate(&manager.role, &subordinate.role)
      {
        records.insert(AssignmentRecord::kpi(
          round_id,
          manager.person_id,
          subordinate.person_id,
        ));
      }
    }
  }

  info!(%round_id, assigned = records.len(), "planned KPI assignments");
  records.into_iter().collect()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{assignment::RaterRef, planner::fixtures::person, policy::PolicyConfig};

  fn policy() -> OrgPolicy {
    let raw = serde_json::json!({
      "evaluator_aliases": { "Operations Manager": "Ops Manager" },
      "hierarchy": [
        { "manager": "Ops Manager", "subordinates": [
          { "match": "prefix", "role": "Ops", "except": ["Ops Manager"] }
        ] },
        { "manager": "CFO", "subordinates": ["Accountant 1"] }
      ]
    });
    serde_json::from_value(raw).unwrap()
  }

  #[test]
  fn manager_rates_matching_subordinates() {
    let manager = person("Operations Manager");
    let roster = vec![manager.clone(), person("Ops 1"), person("Ops Lebanon"), person("Accountant 1")];
    let records = plan_kpi_assignments(&roster, Uuid::new_v4(), &policy());
    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|r| r.rater == RaterRef::Id(manager.person_id)));
  }

  #[test]
  fn two_managers_with_the_same_role_do_not_rate_each_other() {
    let roster = vec![person("Ops Manager"), person("Ops Manager"), person("Ops 2")];
    let records = plan_kpi_assignments(&roster, Uuid::new_v4(), &policy());
    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|r| r.ratee_id == roster[2].person_id));
  }

  #[test]
  fn replanning_is_idempotent() {
    let roster = vec![person("CFO"), person("Accountant 1"), person("Ops Manager"), person("Ops 3")];
    let round = Uuid::new_v4();
    let first = plan_kpi_assignments(&roster, round, &policy());
    let second = plan_kpi_assignments(&roster, round, &policy());
    assert_eq!(first, second);
    let unique: BTreeSet<_> = first.iter().chain(&second).collect();
    assert_eq!(unique.len(), first.len());
  }

  #[test]
  fn inactive_and_duplicate_entries() {
    let cfo = person("CFO");
    let mut gone = person("Accountant 1");
    gone.active = false;
    let roster = vec![cfo.clone(), cfo.clone(), gone];
    assert!(plan_kpi_assignments(&roster, Uuid::new_v4(), &policy()).is_empty());
  }

  #[test]
  fn empty_hierarchy_plans_nothing() {
    let roster = vec![person("CFO"), person("Accountant 1")];
    let policy = OrgPolicy::from(PolicyConfig::default());
    assert!(plan_kpi_assignments(&roster, Uuid::new_v4(), &policy).is_empty());
  }
}
