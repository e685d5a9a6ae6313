//! The evaluation engine: planners, pseudonymizer and aggregator wired to an
//! [`EvaluationStore`].

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::Utc;
use rand::{Rng, SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
  Error, Result,
  aggregate::{
    self, CategoryBreakdown, KpiMode, KpiScore, Performance, TrimmedMean, combined_score,
  },
  assignment::{AssignmentKind, AssignmentRecord, RaterRef},
  config::{PlannerConfig, ScoringConfig},
  feedback::{FeedbackItem, FeedbackStatus, RaterAttributes, RaterScore},
  kpi::KpiDefinition,
  planner::{self, PeerPlan},
  policy::OrgPolicy,
  pseudonym::{Pseudonymizer, RaterToken},
  question::{self, FeedbackQuestion},
  rating::{RatingItem, RatingStatus},
  relationship::{InteractionScope, RelationshipMatrix},
  round::{NewRound, Person, Round, RoundStatus},
  store::EvaluationStore,
};

// ─── Inputs and outputs ──────────────────────────────────────────────────────

/// Outcome of [`Engine::activate_round`].
#[derive(Debug, Clone, Serialize)]
pub struct Activation {
  pub round:            Round,
  pub peer_assignments: usize,
  pub kpi_assignments:  usize,
  pub peer_iterations:  usize,
  pub budget_exhausted: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Answer {
  pub question_id: Uuid,
  #[serde(default)]
  pub score:       Option<f64>,
  #[serde(default)]
  pub comment:     Option<String>,
}

/// A rater's answers about one ratee. `submit = false` saves a draft.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedbackSubmission {
  pub rater_id: Uuid,
  pub ratee_id: Uuid,
  pub answers:  Vec<Answer>,
  #[serde(default)]
  pub submit:   bool,
}

/// A manager's KPI scores for one subordinate. `submit = false` saves a
/// draft; `true` sends it for review.
#[derive(Debug, Clone, Deserialize)]
pub struct RatingSubmission {
  pub evaluator_id: Uuid,
  pub ratee_id:     Uuid,
  pub scores:       BTreeMap<Uuid, f64>,
  #[serde(default)]
  pub comment:      Option<String>,
  #[serde(default)]
  pub submit:       bool,
}

fn check_score(item: Uuid, score: f64) -> Result<()> {
  if (1.0..=5.0).contains(&score) {
    Ok(())
  } else {
    Err(Error::ScoreOutOfRange { item, score })
  }
}

// ─── Engine ──────────────────────────────────────────────────────────────────

pub struct Engine<S> {
  store:         S,
  pseudonymizer: Pseudonymizer,
  policy:        OrgPolicy,
  planner:       PlannerConfig,
  scoring:       ScoringConfig,
}

impl<S: EvaluationStore> Engine<S> {
  pub fn new(
    store: S,
    pseudonymizer: Pseudonymizer,
    policy: OrgPolicy,
    planner: PlannerConfig,
    scoring: ScoringConfig,
  ) -> Self {
    Self { store, pseudonymizer, policy, planner, scoring }
  }

  pub fn store(&self) -> &S { &self.store }

  pub fn pseudonymizer(&self) -> &Pseudonymizer { &self.pseudonymizer }

  /// Planner RNG: seeded when the configuration fixes a seed.
  pub fn rng(&self) -> StdRng {
    match self.planner.seed {
      Some(seed) => StdRng::seed_from_u64(seed),
      None => StdRng::from_entropy(),
    }
  }

  async fn load_round(&self, id: Uuid) -> Result<Round> {
    self
      .store
      .get_round(id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::RoundNotFound(id))
  }

  async fn load_person(&self, id: Uuid) -> Result<Person> {
    self
      .store
      .get_person(id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::PersonNotFound(id))
  }

  async fn load_active_round(&self, id: Uuid) -> Result<Round> {
    let round = self.load_round(id).await?;
    if round.status != RoundStatus::Active {
      return Err(Error::RoundNotActive(id));
    }
    Ok(round)
  }

  async fn matrix(&self) -> Result<RelationshipMatrix> {
    let facts = self.store.list_relationships().await.map_err(Error::store)?;
    Ok(RelationshipMatrix::from_facts(&facts))
  }

  async fn question_index(&self) -> Result<HashMap<Uuid, FeedbackQuestion>> {
    let questions = self.store.list_questions().await.map_err(Error::store)?;
    Ok(questions.into_iter().map(|q| (q.question_id, q)).collect())
  }

  // ── Rounds ────────────────────────────────────────────────────────────

  pub async fn create_round(&self, input: NewRound) -> Result<Round> {
    let round = self.store.create_round(input).await.map_err(Error::store)?;
    info!(round = %round.round_id, name = %round.name, "created round");
    Ok(round)
  }

  pub async fn get_round(&self, id: Uuid) -> Result<Round> { self.load_round(id).await }

  /// Activate with the configured planner RNG.
  pub async fn activate_round(&self, round_id: Uuid) -> Result<Activation> {
    let mut rng = self.rng();
    self.activate_round_with(round_id, &mut rng).await
  }

  /// Plan and persist the round's assignments, then mark it active.
  ///
  /// Each included assignment kind is replaced as a unit, together with that
  /// kind's submissions. Re-activating an already active round re-plans it.
  pub async fn activate_round_with<R: Rng + Send + ?Sized>(
    &self,
    round_id: Uuid,
    rng: &mut R,
  ) -> Result<Activation> {
    let round = self.load_round(round_id).await?;
    if round.status == RoundStatus::Completed {
      return Err(Error::InvalidRoundTransition {
        round:  round_id,
        status: round.status,
        action: "activated",
      });
    }
    let other = self
      .store
      .active_round()
      .await
      .map_err(Error::store)?
      .filter(|active| active.round_id != round_id);
    if let Some(active) = other {
      return Err(Error::AnotherRoundActive { active: active.round_id });
    }

    let roster = self.store.list_people(true).await.map_err(Error::store)?;
    if roster.len() < 2 {
      return Err(Error::RosterTooSmall(roster.len()));
    }

    let mut peer = PeerPlan { assignments: Vec::new(), iterations: 0, budget_exhausted: false };
    let mut peer_assignments = 0;
    if round.include_360 {
      let matrix = self.matrix().await?;
      if matrix.is_empty() {
        warn!(%round_id, "relationship matrix is empty; no peer assignments will be made");
      }
      peer = planner::plan_peer_assignments(
        &roster,
        round_id,
        &matrix,
        &self.pseudonymizer,
        &self.planner,
        rng,
      );
      peer_assignments = self
        .store
        .replace_assignments(round_id, AssignmentKind::Peer360, std::mem::take(&mut peer.assignments))
        .await
        .map_err(Error::store)?;
    }

    let mut kpi_assignments = 0;
    if round.include_kpi {
      let records = planner::plan_kpi_assignments(&roster, round_id, &self.policy);
      kpi_assignments = self
        .store
        .replace_assignments(round_id, AssignmentKind::Kpi, records)
        .await
        .map_err(Error::store)?;
    }

    self
      .store
      .set_round_status(round_id, RoundStatus::Active)
      .await
      .map_err(Error::store)?;
    info!(%round_id, peer_assignments, kpi_assignments, "activated round");

    Ok(Activation {
      round: Round { status: RoundStatus::Active, ..round },
      peer_assignments,
      kpi_assignments,
      peer_iterations: peer.iterations,
      budget_exhausted: peer.budget_exhausted,
    })
  }

  /// `active → completed`; any other starting status is rejected.
  pub async fn close_round(&self, round_id: Uuid) -> Result<Round> {
    let round = self.load_round(round_id).await?;
    if round.status != RoundStatus::Active {
      return Err(Error::InvalidRoundTransition {
        round:  round_id,
        status: round.status,
        action: "closed",
      });
    }
    self
      .store
      .set_round_status(round_id, RoundStatus::Completed)
      .await
      .map_err(Error::store)?;
    info!(%round_id, "closed round");
    Ok(Round { status: RoundStatus::Completed, ..round })
  }

  // ── Planning ──────────────────────────────────────────────────────────

  /// Compute, without persisting, the peer plan for the current roster.
  pub async fn plan_peer_assignments<R: Rng + Send + ?Sized>(
    &self,
    round_id: Uuid,
    rng: &mut R,
  ) -> Result<PeerPlan> {
    self.load_round(round_id).await?;
    let roster = self.store.list_people(true).await.map_err(Error::store)?;
    let matrix = self.matrix().await?;
    Ok(planner::plan_peer_assignments(
      &roster,
      round_id,
      &matrix,
      &self.pseudonymizer,
      &self.planner,
      rng,
    ))
  }

  /// Compute, without persisting, the KPI assignments for the current roster.
  pub async fn plan_kpi_assignments(&self, round_id: Uuid) -> Result<Vec<AssignmentRecord>> {
    self.load_round(round_id).await?;
    let roster = self.store.list_people(true).await.map_err(Error::store)?;
    Ok(planner::plan_kpi_assignments(&roster, round_id, &self.policy))
  }

  /// Add KPI assignments for pairs that became eligible since activation,
  /// keeping existing ones and their ratings. Returns how many were added.
  pub async fn sync_kpi_assignments(&self, round_id: Uuid) -> Result<usize> {
    let records = self.plan_kpi_assignments(round_id).await?;
    let added = self.store.insert_assignments(records).await.map_err(Error::store)?;
    info!(%round_id, added, "synced KPI assignments");
    Ok(added)
  }

  // ── 360 feedback ──────────────────────────────────────────────────────

  async fn eligible_questions(&self, rater: &Person, ratee: &Person) -> Result<Vec<FeedbackQuestion>> {
    let relationship = self.matrix().await?.resolve(&rater.role, &ratee.role);
    let ratee_is_manager = self
      .store
      .list_people(true)
      .await
      .map_err(Error::store)?
      .iter()
      .any(|p| p.manager_id == Some(ratee.person_id));
    let questions = self.store.list_questions().await.map_err(Error::store)?;
    Ok(
      question::questions_for(&questions, relationship, ratee_is_manager)
        .into_iter()
        .cloned()
        .collect(),
    )
  }

  /// The questions `rater_id` is asked about `ratee_id`, open-ended last.
  pub async fn questions_for(&self, rater_id: Uuid, ratee_id: Uuid) -> Result<Vec<FeedbackQuestion>> {
    let rater = self.load_person(rater_id).await?;
    let ratee = self.load_person(ratee_id).await?;
    self.eligible_questions(&rater, &ratee).await
  }

  /// Save a rater's answers under their round token. Returns the number of
  /// answers stored.
  ///
  /// Once a rater has submitted about a ratee, further drafts are refused;
  /// resubmitting is allowed.
  pub async fn submit_feedback(&self, round_id: Uuid, input: FeedbackSubmission) -> Result<usize> {
    self.load_active_round(round_id).await?;
    let token = self.pseudonymizer.token(input.rater_id, round_id);
    let assigned = self
      .store
      .has_assignment(round_id, RaterRef::Token(token.clone()), input.ratee_id)
      .await
      .map_err(Error::store)?;
    if !assigned {
      return Err(Error::NotAssigned { kind: "peer360", round: round_id });
    }

    let rater = self.load_person(input.rater_id).await?;
    let ratee = self.load_person(input.ratee_id).await?;
    let eligible: HashMap<Uuid, FeedbackQuestion> = self
      .eligible_questions(&rater, &ratee)
      .await?
      .into_iter()
      .map(|q| (q.question_id, q))
      .collect();

    if !input.submit {
      let submitted = self
        .store
        .list_feedback(round_id, ratee.person_id)
        .await
        .map_err(Error::store)?
        .iter()
        .any(|i| i.rater_token == token && i.status == FeedbackStatus::Submitted);
      if submitted {
        return Err(Error::AlreadySubmitted { what: "feedback", round: round_id });
      }
    }

    let is_manager = ratee.manager_id == Some(rater.person_id);
    let attributes = RaterAttributes {
      department: self.pseudonymizer.attribute_token(
        rater.person_id,
        round_id,
        "department",
        &rater.department,
      ),
      role:       self.pseudonymizer.attribute_token(rater.person_id, round_id, "role", &rater.role),
      is_manager: self.pseudonymizer.attribute_token(
        rater.person_id,
        round_id,
        "is_manager",
        if is_manager { "true" } else { "false" },
      ),
    };

    let (status, submitted_at) = if input.submit {
      (FeedbackStatus::Submitted, Some(Utc::now()))
    } else {
      (FeedbackStatus::Draft, None)
    };

    let mut items = Vec::with_capacity(input.answers.len());
    for answer in input.answers {
      let question = eligible
        .get(&answer.question_id)
        .ok_or(Error::QuestionNotEligible(answer.question_id))?;
      let score = if question.open_ended { None } else { answer.score };
      if let Some(score) = score {
        check_score(question.question_id, score)?;
      }
      let comment = answer
        .comment
        .map(|c| c.trim().to_owned())
        .filter(|c| !c.is_empty());
      items.push(FeedbackItem {
        rater_token: token.clone(),
        ratee_id: ratee.person_id,
        round_id,
        question_id: question.question_id,
        score,
        comment,
        status,
        submitted_at,
        attributes: attributes.clone(),
      });
    }

    let stored = items.len();
    self.store.upsert_feedback(items).await.map_err(Error::store)?;
    self.refresh_rater_score(round_id, &token, ratee.person_id).await?;
    info!(%round_id, ratee = %ratee.person_id, answers = stored, submitted = input.submit, "stored feedback");
    Ok(stored)
  }

  async fn refresh_rater_score(&self, round_id: Uuid, token: &RaterToken, ratee_id: Uuid) -> Result<()> {
    let items: Vec<FeedbackItem> = self
      .store
      .list_feedback(round_id, ratee_id)
      .await
      .map_err(Error::store)?
      .into_iter()
      .filter(|i| i.rater_token == *token)
      .collect();
    let questions = self.question_index().await?;
    let Some((score, question_count)) = aggregate::rater_means(&items, &questions).get(token).copied()
    else {
      return self
        .store
        .delete_rater_score(round_id, token.clone(), ratee_id)
        .await
        .map_err(Error::store);
    };
    self
      .store
      .upsert_rater_score(RaterScore {
        rater_token: token.clone(),
        ratee_id,
        round_id,
        score,
        question_count,
        updated_at: Utc::now(),
      })
      .await
      .map_err(Error::store)
  }

  // ── KPI ratings ───────────────────────────────────────────────────────

  /// Store a manager's KPI scores as a draft, or as `pending_review` when
  /// submitted. A rating that has left draft cannot be saved as a draft
  /// again; resubmitting sends it back for review.
  pub async fn submit_rating(&self, round_id: Uuid, input: RatingSubmission) -> Result<RatingItem> {
    self.load_active_round(round_id).await?;
    let assigned = self
      .store
      .has_assignment(round_id, RaterRef::Id(input.evaluator_id), input.ratee_id)
      .await
      .map_err(Error::store)?;
    if !assigned {
      return Err(Error::NotAssigned { kind: "kpi", round: round_id });
    }

    let kpis: HashMap<Uuid, KpiDefinition> = self
      .store
      .list_kpis()
      .await
      .map_err(Error::store)?
      .into_iter()
      .map(|k| (k.kpi_id, k))
      .collect();
    for (kpi_id, score) in &input.scores {
      if !kpis.get(kpi_id).is_some_and(|k| k.applies_to(input.ratee_id)) {
        return Err(Error::KpiNotApplicable(*kpi_id));
      }
      check_score(*kpi_id, *score)?;
    }

    if !input.submit {
      let submitted = self
        .store
        .list_ratings(round_id, input.ratee_id)
        .await
        .map_err(Error::store)?
        .iter()
        .any(|r| r.evaluator_id == input.evaluator_id && r.status != RatingStatus::Draft);
      if submitted {
        return Err(Error::AlreadySubmitted { what: "KPI rating", round: round_id });
      }
    }

    let (status, submitted_at) = if input.submit {
      (RatingStatus::PendingReview, Some(Utc::now()))
    } else {
      (RatingStatus::Draft, None)
    };
    let rating = RatingItem {
      rating_id:    Uuid::new_v4(),
      evaluator_id: input.evaluator_id,
      ratee_id:     input.ratee_id,
      round_id,
      scores_json:  serde_json::to_string(&input.scores)?,
      comment:      input.comment,
      status,
      submitted_at,
      approved_at:  None,
      approved_by:  None,
    };
    let stored = self.store.upsert_rating(rating).await.map_err(Error::store)?;
    info!(
      rating = %stored.rating_id,
      %round_id,
      ratee = %stored.ratee_id,
      status = %stored.status,
      "stored KPI rating"
    );
    Ok(stored)
  }

  /// Approve or decline a rating that is pending review.
  pub async fn review_rating(&self, rating_id: Uuid, approver: Uuid, approve: bool) -> Result<RatingItem> {
    let rating = self
      .store
      .get_rating(rating_id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::RatingNotFound(rating_id))?;
    if rating.status != RatingStatus::PendingReview {
      return Err(Error::NotReviewable { id: rating_id, status: rating.status });
    }

    let status = if approve { RatingStatus::Approved } else { RatingStatus::Declined };
    let now = Utc::now();
    self
      .store
      .review_rating(rating_id, status, approver, now)
      .await
      .map_err(Error::store)?;
    info!(rating = %rating_id, %status, "reviewed KPI rating");
    Ok(RatingItem { status, approved_by: Some(approver), approved_at: Some(now), ..rating })
  }

  // ── Scores ────────────────────────────────────────────────────────────

  pub async fn compute_kpi_score(&self, person_id: Uuid, round_id: Uuid, mode: KpiMode) -> Result<KpiScore> {
    self.load_round(round_id).await?;
    let ratee = self.load_person(person_id).await?;
    let ratings = self.store.list_ratings(round_id, person_id).await.map_err(Error::store)?;
    let roles: HashMap<Uuid, String> = self
      .store
      .list_people(false)
      .await
      .map_err(Error::store)?
      .into_iter()
      .map(|p| (p.person_id, p.role))
      .collect();
    let kpis: HashMap<Uuid, KpiDefinition> = self
      .store
      .list_kpis()
      .await
      .map_err(Error::store)?
      .into_iter()
      .map(|k| (k.kpi_id, k))
      .collect();
    Ok(aggregate::kpi_score(&ratings, &ratee.role, &roles, &kpis, &self.policy, mode))
  }

  pub async fn compute_360_score(&self, person_id: Uuid, round_id: Uuid) -> Result<TrimmedMean> {
    self.load_round(round_id).await?;
    self.load_person(person_id).await?;
    let items = self.store.list_feedback(round_id, person_id).await.map_err(Error::store)?;
    let questions = self.question_index().await?;
    Ok(aggregate::feedback_score(&items, &questions))
  }

  pub async fn feedback_by_category(
    &self,
    person_id: Uuid,
    round_id: Uuid,
  ) -> Result<Vec<CategoryBreakdown>> {
    self.load_round(round_id).await?;
    self.load_person(person_id).await?;
    let items = self.store.list_feedback(round_id, person_id).await.map_err(Error::store)?;
    let questions = self.question_index().await?;
    Ok(aggregate::by_category(&items, &questions))
  }

  /// KPI score, 360 composite, their blend and the 360 confidence estimate.
  pub async fn compute_performance(&self, person_id: Uuid, round_id: Uuid) -> Result<Performance> {
    let round = self.load_round(round_id).await?;
    let ratee = self.load_person(person_id).await?;
    let kpi = self.compute_kpi_score(person_id, round_id, KpiMode::Approved).await?;

    let items = self.store.list_feedback(round_id, person_id).await.map_err(Error::store)?;
    let questions = self.question_index().await?;
    let feedback = aggregate::feedback_score(&items, &questions);

    let submitted: BTreeSet<&RaterToken> = items
      .iter()
      .filter(|i| i.status == FeedbackStatus::Submitted)
      .map(|i| &i.rater_token)
      .collect();
    let scopes = self.rater_scopes(round_id, &ratee, &submitted).await?;
    let responses: Vec<f64> = aggregate::scored_answers(&items, &questions).map(|(_, s)| s).collect();
    let confidence =
      aggregate::confidence(submitted.len(), &scopes, &responses, self.scoring.volume_target);

    Ok(Performance {
      kpi,
      feedback,
      rater_count: submitted.len(),
      final_score: combined_score(&round, kpi.score, feedback.trimmed_mean, &self.scoring),
      confidence,
    })
  }

  /// Interaction scopes of the raters behind `tokens`, found by recomputing
  /// every active person's token for this round. The token → person pairing
  /// lives only for the duration of this call.
  async fn rater_scopes(
    &self,
    round_id: Uuid,
    ratee: &Person,
    tokens: &BTreeSet<&RaterToken>,
  ) -> Result<Vec<InteractionScope>> {
    if tokens.is_empty() {
      return Ok(Vec::new());
    }
    let roster = self.store.list_people(true).await.map_err(Error::store)?;
    let matrix = self.matrix().await?;
    Ok(
      roster
        .iter()
        .filter(|p| tokens.contains(&self.pseudonymizer.token(p.person_id, round_id)))
        .map(|rater| {
          let relationship = matrix.resolve(&rater.role, &ratee.role);
          self.policy.interaction_scope(relationship, &rater.role, &ratee.role)
        })
        .collect(),
    )
  }
}
