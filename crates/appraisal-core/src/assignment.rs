//! Assignment records emitted by the planners.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use crate::pseudonym::RaterToken;

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  PartialOrd,
  Ord,
  Serialize,
  Deserialize,
  AsRefStr,
  Display,
  EnumString,
)]
pub enum AssignmentKind {
  #[serde(rename = "kpi")]
  #[strum(serialize = "kpi")]
  Kpi,
  #[serde(rename = "peer360")]
  #[strum(serialize = "peer360")]
  Peer360,
}

/// How the rater is identified: KPI ratings are traceable, 360 feedback is
/// not.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RaterRef {
  Id(Uuid),
  Token(RaterToken),
}

/// One evaluator → evaluatee edge for a round. Unique per
/// (round, kind, rater, ratee).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AssignmentRecord {
  pub round_id: Uuid,
  pub rater:    RaterRef,
  pub ratee_id: Uuid,
}

impl AssignmentRecord {
  pub fn kpi(round_id: Uuid, manager_id: Uuid, ratee_id: Uuid) -> Self {
    Self { round_id, rater: RaterRef::Id(manager_id), ratee_id }
  }

  pub fn peer(round_id: Uuid, token: RaterToken, ratee_id: Uuid) -> Self {
    Self { round_id, rater: RaterRef::Token(token), ratee_id }
  }

  pub fn kind(&self) -> AssignmentKind {
    match self.rater {
      RaterRef::Id(_) => AssignmentKind::Kpi,
      RaterRef::Token(_) => AssignmentKind::Peer360,
    }
  }
}
