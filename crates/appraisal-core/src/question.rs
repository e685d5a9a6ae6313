//! 360 feedback questions and relationship-based eligibility.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use crate::relationship::Relationship;

#[derive(
  Debug,
  Clone,
  Copy,
  Default,
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
pub enum QuestionScope {
  /// Asked of every assigned rater.
  #[default]
  Global,
  /// Asked only of raters with a direct working relationship.
  Direct,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackQuestion {
  pub question_id:  Uuid,
  pub category:     String,
  pub text:         String,
  #[serde(default)]
  pub scope:        QuestionScope,
  /// Answered with a comment only; never scored.
  #[serde(default)]
  pub open_ended:   bool,
  /// Leadership questions, shown only when the ratee manages someone.
  #[serde(default)]
  pub for_managers: bool,
  pub active:       bool,
}

impl FeedbackQuestion {
  pub fn is_scored(&self) -> bool { self.active && !self.open_ended }

  fn visible_for(&self, relationship: Relationship, ratee_is_manager: bool) -> bool {
    if !self.active || (self.for_managers && !ratee_is_manager) {
      return false;
    }
    match self.scope {
      QuestionScope::Global => true,
      QuestionScope::Direct => relationship == Relationship::Direct,
    }
  }
}

/// Questions a rater with `relationship` to the ratee is asked, open-ended
/// ones last. Input order is otherwise preserved.
pub fn questions_for(
  questions: &[FeedbackQuestion],
  relationship: Relationship,
  ratee_is_manager: bool,
) -> Vec<&FeedbackQuestion> {
  let mut out: Vec<_> = questions
    .iter()
    .filter(|q| q.visible_for(relationship, ratee_is_manager))
    .collect();
  out.sort_by_key(|q| q.open_ended);
  out
}

#[cfg(test)]
mod tests {
  use super::*;

  fn question(scope: QuestionScope, open_ended: bool) -> FeedbackQuestion {
    FeedbackQuestion {
      question_id: Uuid::new_v4(),
      category: "Communication".into(),
      text: "How clearly does this person communicate?".into(),
      scope,
      open_ended,
      for_managers: false,
      active: true,
    }
  }

  #[test]
  fn direct_unlocks_direct_scoped_questions() {
    let qs = [question(QuestionScope::Global, false), question(QuestionScope::Direct, false)];
    assert_eq!(questions_for(&qs, Relationship::Direct, false).len(), 2);
    assert_eq!(questions_for(&qs, Relationship::Indirect, false).len(), 1);
    assert_eq!(questions_for(&qs, Relationship::Unrelated, false).len(), 1);
  }

  #[test]
  fn open_ended_questions_sort_last() {
    let qs = [
      question(QuestionScope::Global, true),
      question(QuestionScope::Global, false),
      question(QuestionScope::Direct, false),
    ];
    let out = questions_for(&qs, Relationship::Direct, false);
    assert_eq!(out[0].question_id, qs[1].question_id);
    assert_eq!(out[1].question_id, qs[2].question_id);
    assert!(out[2].open_ended);
  }

  #[test]
  fn inactive_and_leadership_questions_are_filtered() {
    let mut inactive = question(QuestionScope::Global, false);
    inactive.active = false;
    let mut leadership = question(QuestionScope::Global, false);
    leadership.for_managers = true;
    let qs = [inactive, leadership];
    assert!(questions_for(&qs, Relationship::Direct, false).is_empty());
    assert_eq!(questions_for(&qs, Relationship::Direct, true).len(), 1);
  }
}
