use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use uuid::Uuid;

use crate::{
  feedback::{FeedbackItem, FeedbackStatus},
  pseudonym::RaterToken,
  question::FeedbackQuestion,
};

/// Outlier-resistant mean across raters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrimmedMean {
  pub trimmed_mean:  f64,
  /// Untrimmed mean, kept for audit.
  pub raw_mean:      f64,
  pub rater_count:   usize,
  /// Values dropped, both ends together.
  pub trimmed_count: usize,
}

impl TrimmedMean {
  pub const NONE: Self = Self {
    trimmed_mean:  0.0,
    raw_mean:      0.0,
    rater_count:   0,
    trimmed_count: 0,
  };
}

/// Fewer than 5 values: plain mean. 5 to 9: drop the lowest and the highest.
/// 10 or more: drop `floor(n / 10)` from each end.
pub fn trimmed_mean(values: &[f64]) -> TrimmedMean {
  let n = values.len();
  if n == 0 {
    return TrimmedMean::NONE;
  }
  let raw_mean = values.iter().sum::<f64>() / n as f64;

  let per_side = match n {
    0..5 => 0,
    5..10 => 1,
    _ => n / 10,
  };
  let mut sorted = values.to_vec();
  sorted.sort_by(f64::total_cmp);
  let kept = &sorted[per_side..n - per_side];

  TrimmedMean {
    trimmed_mean: kept.iter().sum::<f64>() / kept.len() as f64,
    raw_mean,
    rater_count: n,
    trimmed_count: per_side * 2,
  }
}

/// Submitted answers that carry a score for an active, non-open-ended
/// question.
pub fn scored_answers<'a>(
  items: &'a [FeedbackItem],
  questions: &'a HashMap<Uuid, FeedbackQuestion>,
) -> impl Iterator<Item = (&'a FeedbackItem, f64)> + 'a {
  items.iter().filter_map(|item| {
    let score = item.score?;
    let scored = item.status == FeedbackStatus::Submitted
      && questions.get(&item.question_id).is_some_and(FeedbackQuestion::is_scored);
    scored.then_some((item, score))
  })
}

/// Each rater's mean over their scored answers, with the answer count.
pub fn rater_means<'a>(
  items: &'a [FeedbackItem],
  questions: &'a HashMap<Uuid, FeedbackQuestion>,
) -> BTreeMap<&'a RaterToken, (f64, usize)> {
  let mut sums: BTreeMap<&RaterToken, (f64, usize)> = BTreeMap::new();
  for (item, score) in scored_answers(items, questions) {
    let slot = sums.entry(&item.rater_token).or_default();
    slot.0 += score;
    slot.1 += 1;
  }
  sums
    .into_iter()
    .map(|(token, (sum, n))| (token, (sum / n as f64, n)))
    .collect()
}

/// The 360 composite: one value per rater, then trimmed across raters.
pub fn feedback_score(
  items: &[FeedbackItem],
  questions: &HashMap<Uuid, FeedbackQuestion>,
) -> TrimmedMean {
  let means: Vec<f64> = rater_means(items, questions).into_values().map(|(m, _)| m).collect();
  trimmed_mean(&means)
}

/// Per-category view of submitted feedback.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryBreakdown {
  pub category: String,
  /// Mean of scored answers, `None` when the category has only comments.
  pub average:  Option<f64>,
  pub count:    usize,
  pub comments: Vec<String>,
}

pub fn by_category(
  items: &[FeedbackItem],
  questions: &HashMap<Uuid, FeedbackQuestion>,
) -> Vec<CategoryBreakdown> {
  let mut categories: BTreeMap<&str, (f64, usize, Vec<String>)> = BTreeMap::new();
  for item in items.iter().filter(|i| i.status == FeedbackStatus::Submitted) {
    let Some(question) = questions.get(&item.question_id).filter(|q| q.active) else {
      continue;
    };
    let slot = categories.entry(question.category.as_str()).or_default();
    if let Some(score) = item.score.filter(|_| !question.open_ended) {
      slot.0 += score;
      slot.1 += 1;
    }
    if let Some(comment) = item.comment.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
      slot.2.push(comment.to_owned());
    }
  }

  categories
    .into_iter()
    .map(|(category, (sum, count, comments))| CategoryBreakdown {
      category: category.to_owned(),
      average: (count > 0).then(|| sum / count as f64),
      count,
      comments,
    })
    .collect()
}
