use std::collections::HashSet;

use rand::{Rng, seq::SliceRandom};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
  assignment::AssignmentRecord,
  config::PlannerConfig,
  pseudonym::Pseudonymizer,
  relationship::{Relationship, RelationshipMatrix},
  round::Person,
};

/// Result of [`plan_peer_assignments`].
#[derive(Debug, Clone)]
pub struct PeerPlan {
  pub assignments:      Vec<AssignmentRecord>,
  pub iterations:       usize,
  /// The iteration budget ran out while pairs were still assignable. The
  /// assignments are a valid partial plan.
  pub budget_exhausted: bool,
}

#[derive(Debug, Clone, Copy)]
struct Pair {
  rater:  usize,
  ratee:  usize,
  direct: bool,
}

#[derive(Debug, Default, Clone, Copy)]
struct Quota {
  target:          usize,
  target_direct:   usize,
  received:        usize,
  received_direct: usize,
}

/// Build the peer-feedback graph for a round with randomized greedy top-k
/// matching.
///
/// Each ratee is targeted for up to `max_per_person` raters, `direct_share`
/// of them direct. No rater gets more than `max_per_person` assignments.
/// Self-pairs and unrelated pairs are never emitted.
pub fn plan_peer_assignments<R: Rng + ?Sized>(
  roster: &[Person],
  round_id: Uuid,
  matrix: &RelationshipMatrix,
  pseudonymizer: &Pseudonymizer,
  config: &PlannerConfig,
  rng: &mut R,
) -> PeerPlan {
  let active: Vec<&Person> = roster.iter().filter(|p| p.active).collect();
  let cap = config.max_per_person;

  let mut pairs = Vec::new();
  for (ratee, ratee_p) in active.iter().enumerate() {
    for (rater, rater_p) in active.iter().enumerate() {
      if rater_p.person_id == ratee_p.person_id {
        continue;
      }
      let relationship = matrix.resolve(&rater_p.role, &ratee_p.role);
      if relationship.is_assignable() {
        pairs.push(Pair {
          rater,
          ratee,
          direct: relationship == Relationship::Direct,
        });
      }
    }
  }

  let mut quotas = vec![Quota::default(); active.len()];
  let mut available = vec![(0usize, 0usize); active.len()];
  for pair in &pairs {
    let slot = &mut available[pair.ratee];
    if pair.direct { slot.0 += 1 } else { slot.1 += 1 }
  }
  for (ratee, (direct, indirect)) in available.iter().enumerate() {
    let target = cap.min(direct + indirect);
    let target_direct =
      ((config.direct_share * target as f64).round() as usize).min(*direct).min(target);
    quotas[ratee].target = target;
    quotas[ratee].target_direct = target_direct;
    if target == 0 {
      warn!(person = %active[ratee].person_id, role = %active[ratee].role, "no valid peer raters");
    }
  }

  let mut given = vec![0usize; active.len()];
  let mut used = vec![false; pairs.len()];
  let budget = pairs.len() * 2;
  let mut iterations = 0;
  let mut budget_exhausted = false;

  loop {
    let mut candidates: Vec<(usize, usize)> = pairs
      .iter()
      .enumerate()
      .filter(|(i, p)| {
        !used[*i] && given[p.rater] < cap && quotas[p.ratee].received < quotas[p.ratee].target
      })
      .map(|(i, p)| {
        let q = &quotas[p.ratee];
        let mut score = (q.target - q.received) + (cap - given[p.rater]);
        let direct_unmet = q.received_direct < q.target_direct;
        if p.direct && direct_unmet {
          score += 100;
        } else if !p.direct && !direct_unmet {
          score += 50;
        }
        (score, i)
      })
      .collect();

    if candidates.is_empty() {
      break;
    }
    if iterations == budget {
      budget_exhausted = true;
      break;
    }
    iterations += 1;

    candidates.sort_by(|a, b| b.0.cmp(&a.0));
    let tier = &candidates[..candidates.len().min(config.top_tier_width.max(1))];
    let Some(&(_, picked)) = tier.choose(rng) else { break };

    let pair = pairs[picked];
    used[picked] = true;
    given[pair.rater] += 1;
    let q = &mut quotas[pair.ratee];
    q.received += 1;
    if pair.direct {
      q.received_direct += 1;
    }
  }

  if budget_exhausted {
    warn!(%round_id, iterations, "peer planner hit its iteration budget; keeping partial plan");
  }

  let mut seen = HashSet::new();
  let assignments: Vec<_> = pairs
    .iter()
    .zip(&used)
    .filter(|(_, used)| **used)
    .map(|(p, _)| {
      let token = pseudonymizer.token(active[p.rater].person_id, round_id);
      AssignmentRecord::peer(round_id, token, active[p.ratee].person_id)
    })
    .filter(|record| seen.insert(record.clone()))
    .collect();

  for (ratee, q) in quotas.iter().enumerate() {
    debug!(
      person = %active[ratee].person_id,
      received = q.received,
      direct = q.received_direct,
      target = q.target,
      target_direct = q.target_direct,
      "peer quota"
    );
  }
  info!(%round_id, pairs = pairs.len(), assigned = assignments.len(), iterations, "planned peer assignments");

  PeerPlan { assignments, iterations, budget_exhausted }
}

#[cfg(test)]
mod tests {
  use std::collections::{HashMap, HashSet};

  use rand::{SeedableRng, rngs::StdRng};

  use super::*;
  use crate::{
    assignment::RaterRef,
    planner::fixtures::person,
    relationship::RelationshipFact,
  };

  fn pseudonymizer() -> Pseudonymizer { Pseudonymizer::new(b"planner-secret").unwrap() }

  /// A roster with one role per person and a random relationship matrix.
  fn random_org(size: usize, seed: u64) -> (Vec<Person>, RelationshipMatrix) {
    let mut rng = StdRng::seed_from_u64(seed);
    let roster: Vec<_> = (0..size).map(|i| person(&format!("Role {i}"))).collect();
    let mut facts = Vec::new();
    for a in &roster {
      for b in &roster {
        let relationship = match rng.gen_range(0..3) {
          0 => Relationship::Direct,
          1 => Relationship::Indirect,
          _ => Relationship::Unrelated,
        };
        facts.push(RelationshipFact {
          rater_role: a.role.clone(),
          ratee_role: b.role.clone(),
          relationship,
        });
      }
    }
    (roster, RelationshipMatrix::from_facts(&facts))
  }

  fn fully_connected(size: usize, relationship: Relationship) -> (Vec<Person>, RelationshipMatrix) {
    let roster: Vec<_> = (0..size).map(|i| person(&format!("Role {i}"))).collect();
    let facts: Vec<_> = roster
      .iter()
      .flat_map(|a| {
        roster.iter().map(move |b| RelationshipFact {
          rater_role: a.role.clone(),
          ratee_role: b.role.clone(),
          relationship,
        })
      })
      .collect();
    (roster, RelationshipMatrix::from_facts(&facts))
  }

  /// Map tokens back to people the way only a test can.
  fn token_owners(roster: &[Person], round: Uuid, p: &Pseudonymizer) -> HashMap<RaterRef, Uuid> {
    roster
      .iter()
      .map(|person| (RaterRef::Token(p.token(person.person_id, round)), person.person_id))
      .collect()
  }

  fn plan(roster: &[Person], matrix: &RelationshipMatrix, seed: u64) -> (Uuid, PeerPlan) {
    let round = Uuid::new_v4();
    let mut rng = StdRng::seed_from_u64(seed);
    let plan = plan_peer_assignments(
      roster,
      round,
      matrix,
      &pseudonymizer(),
      &PlannerConfig::default(),
      &mut rng,
    );
    (round, plan)
  }

  #[test]
  fn structural_properties_hold_on_random_orgs() {
    for seed in 0..20 {
      let (roster, matrix) = random_org(8 + seed as usize, seed);
      let (round, plan) = plan(&roster, &matrix, seed);
      let owners = token_owners(&roster, round, &pseudonymizer());
      let by_id: HashMap<_, _> = roster.iter().map(|p| (p.person_id, p)).collect();

      let mut seen = HashSet::new();
      let mut given: HashMap<Uuid, usize> = HashMap::new();
      for record in &plan.assignments {
        let rater = owners[&record.rater];
        assert_ne!(rater, record.ratee_id, "self-assignment");
        assert!(
          matrix.resolve(&by_id[&rater].role, &by_id[&record.ratee_id].role).is_assignable(),
          "unrelated pair"
        );
        assert!(seen.insert(record.clone()), "duplicate record");
        *given.entry(rater).or_default() += 1;
      }
      assert!(given.values().all(|n| *n <= 10), "rater cap exceeded");
      assert!(plan.iterations <= 2 * roster.len() * roster.len());
    }
  }

  #[test]
  fn same_seed_gives_same_plan() {
    let (roster, matrix) = random_org(15, 7);
    let round = Uuid::new_v4();
    let run = |seed| {
      let mut rng = StdRng::seed_from_u64(seed);
      plan_peer_assignments(
        &roster,
        round,
        &matrix,
        &pseudonymizer(),
        &PlannerConfig::default(),
        &mut rng,
      )
      .assignments
    };
    assert_eq!(run(42), run(42));
  }

  #[test]
  fn ratees_reach_target_in_a_large_org() {
    let (roster, matrix) = fully_connected(40, Relationship::Direct);
    let (_, plan) = plan(&roster, &matrix, 1);
    let mut received: HashMap<Uuid, usize> = HashMap::new();
    for r in &plan.assignments {
      *received.entry(r.ratee_id).or_default() += 1;
    }
    assert!(!plan.budget_exhausted);
    assert_eq!(received.len(), 40);
    assert!(received.values().all(|n| *n == 10));
  }

  #[test]
  fn small_org_uses_what_exists() {
    let (roster, matrix) = fully_connected(4, Relationship::Indirect);
    let (_, plan) = plan(&roster, &matrix, 3);
    assert_eq!(plan.assignments.len(), 4 * 3);
  }

  #[test]
  fn no_relationships_means_no_assignments() {
    let (roster, matrix) = fully_connected(5, Relationship::Unrelated);
    let (_, plan) = plan(&roster, &matrix, 3);
    assert!(plan.assignments.is_empty());
    assert_eq!(plan.iterations, 0);
    assert!(!plan.budget_exhausted);
  }

  #[test]
  fn inactive_people_are_ignored() {
    let (mut roster, matrix) = fully_connected(3, Relationship::Direct);
    roster[0].active = false;
    let (round, plan) = plan(&roster, &matrix, 3);
    let absent = RaterRef::Token(pseudonymizer().token(roster[0].person_id, round));
    assert_eq!(plan.assignments.len(), 2);
    assert!(plan.assignments.iter().all(|r| r.rater != absent && r.ratee_id != roster[0].person_id));
  }

  #[test]
  fn direct_raters_are_preferred_up_to_the_split() {
    // Everyone is direct with "Team *" roles and indirect with "Other *".
    let team: Vec<_> = (0..12).map(|i| person(&format!("Team {i}"))).collect();
    let others: Vec<_> = (0..12).map(|i| person(&format!("Other {i}"))).collect();
    let roster: Vec<_> = team.iter().chain(&others).cloned().collect();
    let mut facts = Vec::new();
    for a in &roster {
      for b in &roster {
        let same = a.role.starts_with("Team") == b.role.starts_with("Team");
        facts.push(RelationshipFact {
          rater_role: a.role.clone(),
          ratee_role: b.role.clone(),
          relationship: if same { Relationship::Direct } else { Relationship::Indirect },
        });
      }
    }
    let matrix = RelationshipMatrix::from_facts(&facts);
    let (round, plan) = plan(&roster, &matrix, 11);
    let owners = token_owners(&roster, round, &pseudonymizer());
    let role: HashMap<_, _> = roster.iter().map(|p| (p.person_id, p.role.as_str())).collect();

    let ratee = team[0].person_id;
    let raters: Vec<_> = plan
      .assignments
      .iter()
      .filter(|r| r.ratee_id == ratee)
      .map(|r| role[&owners[&r.rater]])
      .collect();
    let direct = raters.iter().filter(|r| r.starts_with("Team")).count();
    assert!(raters.len() <= 10);
    assert!(direct >= 6, "expected a direct majority, got {direct}/{}", raters.len());
  }
}
