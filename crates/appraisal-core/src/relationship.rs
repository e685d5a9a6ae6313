//! The evaluator↔evaluatee relationship matrix.
//!
//! Facts are keyed by role label pairs and are directional. When a pair is
//! only recorded in one direction, the other direction is mirrored from it.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// Working-relationship strength between two roles.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  AsRefStr,
  Display,
  EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Relationship {
  Direct,
  Indirect,
  #[serde(rename = "none")]
  #[strum(serialize = "none")]
  Unrelated,
}

impl Relationship {
  /// Only direct and indirect pairs may ever receive a peer assignment.
  pub fn is_assignable(self) -> bool { !matches!(self, Self::Unrelated) }
}

/// Coarse category of a rater's working relationship to a ratee.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum InteractionScope {
  Operational,
  Managerial,
  Strategic,
  Indirect,
}

/// One directional entry of the matrix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipFact {
  pub rater_role:   String,
  pub ratee_role:   String,
  pub relationship: Relationship,
}

/// Canonical form of a free-text role label: trimmed, single-spaced and
/// case-folded.
pub fn normalize_role(label: &str) -> String {
  label
    .split_whitespace()
    .collect::<Vec<_>>()
    .join(" ")
    .to_lowercase()
}

/// Lookup table built from [`RelationshipFact`]s.
#[derive(Debug, Clone, Default)]
pub struct RelationshipMatrix {
  entries: HashMap<(String, String), Relationship>,
}

impl RelationshipMatrix {
  pub fn from_facts<'a>(facts: impl IntoIterator<Item = &'a RelationshipFact>) -> Self {
    let mut entries = HashMap::new();
    for fact in facts {
      let rater = normalize_role(&fact.rater_role);
      let ratee = normalize_role(&fact.ratee_role);
      if rater == ratee {
        continue;
      }
      entries.insert((rater, ratee), fact.relationship);
    }

    let mirrored: Vec<_> = entries
      .iter()
      .filter(|((a, b), _)| !entries.contains_key(&(b.clone(), a.clone())))
      .map(|((a, b), rel)| ((b.clone(), a.clone()), *rel))
      .collect();
    entries.extend(mirrored);

    Self { entries }
  }

  pub fn is_empty(&self) -> bool { self.entries.is_empty() }

  pub fn len(&self) -> usize { self.entries.len() }

  /// Self-pairs and absent entries resolve to [`Relationship::Unrelated`].
  pub fn resolve(&self, rater_role: &str, ratee_role: &str) -> Relationship {
    let rater = normalize_role(rater_role);
    let ratee = normalize_role(ratee_role);
    if rater == ratee {
      return Relationship::Unrelated;
    }
    self
      .entries
      .get(&(rater, ratee))
      .copied()
      .unwrap_or(Relationship::Unrelated)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn fact(a: &str, b: &str, relationship: Relationship) -> RelationshipFact {
    RelationshipFact {
      rater_role: a.into(),
      ratee_role: b.into(),
      relationship,
    }
  }

  #[test]
  fn normalizes_case_and_whitespace() {
    assert_eq!(normalize_role("  Ops   Manager "), "ops manager");
  }

  #[test]
  fn resolves_recorded_direction() {
    let m = RelationshipMatrix::from_facts(&[
      fact("DP 1", "DP 2", Relationship::Direct),
      fact("DP 2", "DP 1", Relationship::Indirect),
    ]);
    assert_eq!(m.resolve("DP 1", "DP 2"), Relationship::Direct);
    assert_eq!(m.resolve("dp 2", "DP 1"), Relationship::Indirect);
  }

  #[test]
  fn mirrors_missing_direction() {
    let m = RelationshipMatrix::from_facts(&[fact("CFO", "Accountant 1", Relationship::Direct)]);
    assert_eq!(m.resolve("Accountant 1", "CFO"), Relationship::Direct);
    assert_eq!(m.len(), 2);
  }

  #[test]
  fn explicit_none_is_not_overridden_by_mirroring() {
    let m = RelationshipMatrix::from_facts(&[
      fact("A", "B", Relationship::Direct),
      fact("B", "A", Relationship::Unrelated),
    ]);
    assert_eq!(m.resolve("B", "A"), Relationship::Unrelated);
  }

  #[test]
  fn self_and_absent_pairs_are_unrelated() {
    let m = RelationshipMatrix::from_facts(&[fact("A", "A", Relationship::Direct)]);
    assert!(m.is_empty());
    assert_eq!(m.resolve("A", "A"), Relationship::Unrelated);
    assert_eq!(m.resolve("A", "Z"), Relationship::Unrelated);
  }

  #[test]
  fn relationship_text_form() {
    assert_eq!(Relationship::Unrelated.as_ref(), "none");
    assert_eq!("indirect".parse::<Relationship>().unwrap(), Relationship::Indirect);
    assert!(!Relationship::Unrelated.is_assignable());
  }
}
