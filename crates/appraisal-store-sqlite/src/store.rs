//! [`SqliteStore`], the SQLite implementation of [`EvaluationStore`].

use std::path::Path;

use appraisal_core::{
  assignment::{AssignmentKind, AssignmentRecord, RaterRef},
  feedback::{FeedbackItem, RaterScore},
  kpi::KpiDefinition,
  pseudonym::RaterToken,
  question::FeedbackQuestion,
  rating::{RatingItem, RatingStatus},
  relationship::RelationshipFact,
  round::{NewRound, Person, Round, RoundStatus},
  store::EvaluationStore,
};
use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension as _;
use tracing::warn;
use uuid::Uuid;

use crate::{
  Error, Result,
  encode::{
    RATING_COLUMNS, ROUND_COLUMNS, RawAssignment, RawFeedback, RawKpi, RawPerson, RawQuestion,
    RawRaterScore, RawRating, RawRelationship, RawRound, encode_date, encode_dt, encode_uuid,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// An evaluation store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, mostly for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

/// Decode fetched rows, logging and dropping any that fail.
fn decode_rows<R, T>(
  table: &'static str,
  raws: Vec<R>,
  decode: impl Fn(R) -> Result<T>,
) -> Vec<T> {
  raws
    .into_iter()
    .filter_map(|raw| match decode(raw) {
      Ok(value) => Some(value),
      Err(error) => {
        warn!(table, %error, "skipping malformed row");
        None
      }
    })
    .collect()
}

fn rater_columns(rater: &RaterRef) -> (Option<String>, Option<String>) {
  match rater {
    RaterRef::Id(id) => (Some(encode_uuid(*id)), None),
    RaterRef::Token(token) => (None, Some(token.as_str().to_owned())),
  }
}

/// Assignment rows ready for insertion: (round, kind, rater_id, rater_token,
/// ratee).
type AssignmentRow = (String, String, Option<String>, Option<String>, String);

fn assignment_rows(records: &[AssignmentRecord]) -> Vec<AssignmentRow> {
  records
    .iter()
    .map(|r| {
      let (rater_id, rater_token) = rater_columns(&r.rater);
      (
        encode_uuid(r.round_id),
        r.kind().as_ref().to_owned(),
        rater_id,
        rater_token,
        encode_uuid(r.ratee_id),
      )
    })
    .collect()
}

const INSERT_ASSIGNMENT: &str = "INSERT OR IGNORE INTO assignments
   (round_id, kind, rater_id, rater_token, ratee_id, assigned_at)
   VALUES (?1, ?2, ?3, ?4, ?5, ?6)";

// ─── EvaluationStore impl ────────────────────────────────────────────────────

impl EvaluationStore for SqliteStore {
  type Error = Error;

  // ── Roster and reference data ─────────────────────────────────────────────

  async fn upsert_person(&self, person: Person) -> Result<()> {
    let id_str      = encode_uuid(person.person_id);
    let manager_str = person.manager_id.map(encode_uuid);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO people (person_id, name, role, department, manager_id, active)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)
           ON CONFLICT (person_id) DO UPDATE SET
             name = excluded.name, role = excluded.role,
             department = excluded.department, manager_id = excluded.manager_id,
             active = excluded.active",
          rusqlite::params![
            id_str,
            person.name,
            person.role,
            person.department,
            manager_str,
            person.active,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn get_person(&self, id: Uuid) -> Result<Option<Person>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawPerson> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT person_id, name, role, department, manager_id, active
             FROM people WHERE person_id = ?1",
            rusqlite::params![id_str],
            |row| {
              Ok(RawPerson {
                person_id:  row.get(0)?,
                name:       row.get(1)?,
                role:       row.get(2)?,
                department: row.get(3)?,
                manager_id: row.get(4)?,
                active:     row.get(5)?,
              })
            },
          )
          .optional()?)
      })
      .await?;

    raw.map(RawPerson::into_person).transpose()
  }

  async fn list_people(&self, active_only: bool) -> Result<Vec<Person>> {
    let raws: Vec<RawPerson> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT person_id, name, role, department, manager_id, active
           FROM people WHERE active = 1 OR ?1 = 0
           ORDER BY name, person_id",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![active_only], |row| {
            Ok(RawPerson {
              person_id:  row.get(0)?,
              name:       row.get(1)?,
              role:       row.get(2)?,
              department: row.get(3)?,
              manager_id: row.get(4)?,
              active:     row.get(5)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawPerson::into_person).collect()
  }

  async fn put_relationships(&self, facts: Vec<RelationshipFact>) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        {
          let mut stmt = tx.prepare(
            "INSERT INTO relationships (rater_role, ratee_role, relationship)
             VALUES (?1, ?2, ?3)
             ON CONFLICT (rater_role, ratee_role)
             DO UPDATE SET relationship = excluded.relationship",
          )?;
          for fact in &facts {
            stmt.execute(rusqlite::params![
              fact.rater_role,
              fact.ratee_role,
              fact.relationship.as_ref(),
            ])?;
          }
        }
        tx.commit()?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn list_relationships(&self) -> Result<Vec<RelationshipFact>> {
    let raws: Vec<RawRelationship> = self
      .conn
      .call(|conn| {
        let mut stmt =
          conn.prepare("SELECT rater_role, ratee_role, relationship FROM relationships")?;
        let rows = stmt
          .query_map([], |row| {
            Ok(RawRelationship {
              rater_role:   row.get(0)?,
              ratee_role:   row.get(1)?,
              relationship: row.get(2)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawRelationship::into_fact).collect()
  }

  async fn upsert_question(&self, question: FeedbackQuestion) -> Result<()> {
    let id_str    = encode_uuid(question.question_id);
    let scope_str = question.scope.as_ref().to_owned();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO questions
             (question_id, category, text, scope, open_ended, for_managers, active)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
           ON CONFLICT (question_id) DO UPDATE SET
             category = excluded.category, text = excluded.text,
             scope = excluded.scope, open_ended = excluded.open_ended,
             for_managers = excluded.for_managers, active = excluded.active",
          rusqlite::params![
            id_str,
            question.category,
            question.text,
            scope_str,
            question.open_ended,
            question.for_managers,
            question.active,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn list_questions(&self) -> Result<Vec<FeedbackQuestion>> {
    let raws: Vec<RawQuestion> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT question_id, category, text, scope, open_ended, for_managers, active
           FROM questions ORDER BY rowid",
        )?;
        let rows = stmt
          .query_map([], |row| {
            Ok(RawQuestion {
              question_id:  row.get(0)?,
              category:     row.get(1)?,
              text:         row.get(2)?,
              scope:        row.get(3)?,
              open_ended:   row.get(4)?,
              for_managers: row.get(5)?,
              active:       row.get(6)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawQuestion::into_question).collect()
  }

  async fn upsert_kpi(&self, kpi: KpiDefinition) -> Result<()> {
    let id_str            = encode_uuid(kpi.kpi_id);
    let applicability_str = serde_json::to_string(&kpi.applicability)?;
    let status_str        = kpi.status.as_ref().to_owned();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO kpis (kpi_id, name, weight, applicability, status, active)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)
           ON CONFLICT (kpi_id) DO UPDATE SET
             name = excluded.name, weight = excluded.weight,
             applicability = excluded.applicability, status = excluded.status,
             active = excluded.active",
          rusqlite::params![id_str, kpi.name, kpi.weight, applicability_str, status_str, kpi.active],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn list_kpis(&self) -> Result<Vec<KpiDefinition>> {
    let raws: Vec<RawKpi> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT kpi_id, name, weight, applicability, status, active FROM kpis ORDER BY rowid",
        )?;
        let rows = stmt
          .query_map([], |row| {
            Ok(RawKpi {
              kpi_id:        row.get(0)?,
              name:          row.get(1)?,
              weight:        row.get(2)?,
              applicability: row.get(3)?,
              status:        row.get(4)?,
              active:        row.get(5)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    Ok(decode_rows("kpis", raws, RawKpi::into_kpi))
  }

  // ── Rounds ────────────────────────────────────────────────────────────────

  async fn create_round(&self, input: NewRound) -> Result<Round> {
    let round = Round {
      round_id:    Uuid::new_v4(),
      name:        input.name,
      status:      RoundStatus::Draft,
      include_kpi: input.include_kpi,
      include_360: input.include_360,
      starts_on:   input.starts_on,
      ends_on:     input.ends_on,
      created_at:  Utc::now(),
    };

    let id_str     = encode_uuid(round.round_id);
    let name       = round.name.clone();
    let status_str = round.status.as_ref().to_owned();
    let starts_str = round.starts_on.map(encode_date);
    let ends_str   = round.ends_on.map(encode_date);
    let at_str     = encode_dt(round.created_at);
    let (include_kpi, include_360) = (round.include_kpi, round.include_360);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          &format!("INSERT INTO rounds ({ROUND_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"),
          rusqlite::params![
            id_str,
            name,
            status_str,
            include_kpi,
            include_360,
            starts_str,
            ends_str,
            at_str,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(round)
  }

  async fn get_round(&self, id: Uuid) -> Result<Option<Round>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawRound> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {ROUND_COLUMNS} FROM rounds WHERE round_id = ?1"),
            rusqlite::params![id_str],
            RawRound::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawRound::into_round).transpose()
  }

  async fn active_round(&self) -> Result<Option<Round>> {
    let raw: Option<RawRound> = self
      .conn
      .call(|conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {ROUND_COLUMNS} FROM rounds WHERE status = 'active'"),
            [],
            RawRound::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawRound::into_round).transpose()
  }

  async fn set_round_status(&self, id: Uuid, status: RoundStatus) -> Result<()> {
    let id_str     = encode_uuid(id);
    let status_str = status.as_ref().to_owned();

    let updated = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE rounds SET status = ?2 WHERE round_id = ?1",
          rusqlite::params![id_str, status_str],
        )?)
      })
      .await?;

    if updated == 0 {
      return Err(Error::RoundNotFound(id));
    }
    Ok(())
  }

  // ── Assignments ───────────────────────────────────────────────────────────

  async fn replace_assignments(
    &self,
    round_id: Uuid,
    kind: AssignmentKind,
    records: Vec<AssignmentRecord>,
  ) -> Result<usize> {
    if let Some(stray) = records.iter().find(|r| r.round_id != round_id || r.kind() != kind) {
      return Err(Error::MismatchedAssignment { round: stray.round_id });
    }

    let round_str = encode_uuid(round_id);
    let kind_str  = kind.as_ref().to_owned();
    let at_str    = encode_dt(Utc::now());
    let rows      = assignment_rows(&records);

    let inserted = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "DELETE FROM assignments WHERE round_id = ?1 AND kind = ?2",
          rusqlite::params![round_str, kind_str],
        )?;
        match kind {
          AssignmentKind::Kpi => {
            tx.execute("DELETE FROM ratings WHERE round_id = ?1", rusqlite::params![round_str])?;
          }
          AssignmentKind::Peer360 => {
            tx.execute("DELETE FROM feedback WHERE round_id = ?1", rusqlite::params![round_str])?;
            tx.execute(
              "DELETE FROM rater_scores WHERE round_id = ?1",
              rusqlite::params![round_str],
            )?;
          }
        }

        let mut inserted = 0;
        {
          let mut stmt = tx.prepare(INSERT_ASSIGNMENT)?;
          for (round, kind, rater_id, rater_token, ratee) in &rows {
            inserted +=
              stmt.execute(rusqlite::params![round, kind, rater_id, rater_token, ratee, at_str])?;
          }
        }
        tx.commit()?;
        Ok(inserted)
      })
      .await?;

    Ok(inserted)
  }

  async fn insert_assignments(&self, records: Vec<AssignmentRecord>) -> Result<usize> {
    let at_str = encode_dt(Utc::now());
    let rows   = assignment_rows(&records);

    let inserted = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let mut inserted = 0;
        {
          let mut stmt = tx.prepare(INSERT_ASSIGNMENT)?;
          for (round, kind, rater_id, rater_token, ratee) in &rows {
            inserted +=
              stmt.execute(rusqlite::params![round, kind, rater_id, rater_token, ratee, at_str])?;
          }
        }
        tx.commit()?;
        Ok(inserted)
      })
      .await?;

    Ok(inserted)
  }

  async fn has_assignment(&self, round_id: Uuid, rater: RaterRef, ratee_id: Uuid) -> Result<bool> {
    let round_str = encode_uuid(round_id);
    let ratee_str = encode_uuid(ratee_id);
    let (rater_id, rater_token) = rater_columns(&rater);

    let found = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT 1 FROM assignments
             WHERE round_id = ?1 AND ratee_id = ?2
               AND (rater_id = ?3 OR rater_token = ?4)",
            rusqlite::params![round_str, ratee_str, rater_id, rater_token],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false))
      })
      .await?;

    Ok(found)
  }

  async fn list_assignments(
    &self,
    round_id: Uuid,
    kind: AssignmentKind,
  ) -> Result<Vec<AssignmentRecord>> {
    let round_str = encode_uuid(round_id);
    let kind_str  = kind.as_ref().to_owned();

    let raws: Vec<RawAssignment> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT round_id, rater_id, rater_token, ratee_id FROM assignments
           WHERE round_id = ?1 AND kind = ?2 ORDER BY rowid",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![round_str, kind_str], |row| {
            Ok(RawAssignment {
              round_id:    row.get(0)?,
              rater_id:    row.get(1)?,
              rater_token: row.get(2)?,
              ratee_id:    row.get(3)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawAssignment::into_record).collect()
  }

  // ── KPI ratings ───────────────────────────────────────────────────────────

  async fn upsert_rating(&self, rating: RatingItem) -> Result<RatingItem> {
    let id_str        = encode_uuid(rating.rating_id);
    let evaluator_str = encode_uuid(rating.evaluator_id);
    let ratee_str     = encode_uuid(rating.ratee_id);
    let round_str     = encode_uuid(rating.round_id);
    let status_str    = rating.status.as_ref().to_owned();
    let submitted_str = rating.submitted_at.map(encode_dt);
    let approved_str  = rating.approved_at.map(encode_dt);
    let approver_str  = rating.approved_by.map(encode_uuid);
    let scores_json   = rating.scores_json.clone();
    let comment       = rating.comment.clone();

    let raw: RawRating = self
      .conn
      .call(move |conn| {
        conn.execute(
          &format!(
            "INSERT INTO ratings ({RATING_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
             ON CONFLICT (evaluator_id, ratee_id, round_id) DO UPDATE SET
               scores_json = excluded.scores_json, comment = excluded.comment,
               status = excluded.status, submitted_at = excluded.submitted_at,
               approved_at = excluded.approved_at, approved_by = excluded.approved_by"
          ),
          rusqlite::params![
            id_str,
            evaluator_str,
            ratee_str,
            round_str,
            scores_json,
            comment,
            status_str,
            submitted_str,
            approved_str,
            approver_str,
          ],
        )?;
        Ok(conn.query_row(
          &format!(
            "SELECT {RATING_COLUMNS} FROM ratings
             WHERE evaluator_id = ?1 AND ratee_id = ?2 AND round_id = ?3"
          ),
          rusqlite::params![evaluator_str, ratee_str, round_str],
          RawRating::from_row,
        )?)
      })
      .await?;

    raw.into_rating()
  }

  async fn get_rating(&self, id: Uuid) -> Result<Option<RatingItem>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawRating> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {RATING_COLUMNS} FROM ratings WHERE rating_id = ?1"),
            rusqlite::params![id_str],
            RawRating::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawRating::into_rating).transpose()
  }

  async fn review_rating(
    &self,
    id: Uuid,
    status: RatingStatus,
    approver: Uuid,
    at: DateTime<Utc>,
  ) -> Result<()> {
    let id_str       = encode_uuid(id);
    let status_str   = status.as_ref().to_owned();
    let approver_str = encode_uuid(approver);
    let at_str       = encode_dt(at);

    let updated = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE ratings SET status = ?2, approved_by = ?3, approved_at = ?4
           WHERE rating_id = ?1",
          rusqlite::params![id_str, status_str, approver_str, at_str],
        )?)
      })
      .await?;

    if updated == 0 {
      return Err(Error::RatingNotFound(id));
    }
    Ok(())
  }

  async fn list_ratings(&self, round_id: Uuid, ratee_id: Uuid) -> Result<Vec<RatingItem>> {
    let round_str = encode_uuid(round_id);
    let ratee_str = encode_uuid(ratee_id);

    let raws: Vec<RawRating> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {RATING_COLUMNS} FROM ratings
           WHERE round_id = ?1 AND ratee_id = ?2 ORDER BY rowid"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![round_str, ratee_str], RawRating::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    Ok(decode_rows("ratings", raws, RawRating::into_rating))
  }

  // ── 360 feedback ──────────────────────────────────────────────────────────

  async fn upsert_feedback(&self, items: Vec<FeedbackItem>) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        {
          let mut stmt = tx.prepare(
            "INSERT INTO feedback (
               rater_token, ratee_id, round_id, question_id, score, comment,
               status, submitted_at, department_token, role_token, is_manager_token
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
             ON CONFLICT (rater_token, ratee_id, round_id, question_id) DO UPDATE SET
               score = excluded.score, comment = excluded.comment,
               status = CASE WHEN feedback.status = 'submitted'
                             THEN feedback.status ELSE excluded.status END,
               submitted_at = COALESCE(excluded.submitted_at, feedback.submitted_at),
               department_token = excluded.department_token,
               role_token = excluded.role_token,
               is_manager_token = excluded.is_manager_token",
          )?;
          for item in &items {
            stmt.execute(rusqlite::params![
              item.rater_token.as_str(),
              encode_uuid(item.ratee_id),
              encode_uuid(item.round_id),
              encode_uuid(item.question_id),
              item.score,
              item.comment,
              item.status.as_ref(),
              item.submitted_at.map(encode_dt),
              item.attributes.department.as_str(),
              item.attributes.role.as_str(),
              item.attributes.is_manager.as_str(),
            ])?;
          }
        }
        tx.commit()?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn list_feedback(&self, round_id: Uuid, ratee_id: Uuid) -> Result<Vec<FeedbackItem>> {
    let round_str = encode_uuid(round_id);
    let ratee_str = encode_uuid(ratee_id);

    let raws: Vec<RawFeedback> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT rater_token, ratee_id, round_id, question_id, score, comment,
                  status, submitted_at, department_token, role_token, is_manager_token
           FROM feedback WHERE round_id = ?1 AND ratee_id = ?2 ORDER BY rowid",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![round_str, ratee_str], |row| {
            Ok(RawFeedback {
              rater_token:      row.get(0)?,
              ratee_id:         row.get(1)?,
              round_id:         row.get(2)?,
              question_id:      row.get(3)?,
              score:            row.get(4)?,
              comment:          row.get(5)?,
              status:           row.get(6)?,
              submitted_at:     row.get(7)?,
              department_token: row.get(8)?,
              role_token:       row.get(9)?,
              is_manager_token: row.get(10)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    Ok(decode_rows("feedback", raws, RawFeedback::into_item))
  }

  async fn upsert_rater_score(&self, score: RaterScore) -> Result<()> {
    let token     = score.rater_token.as_str().to_owned();
    let ratee_str = encode_uuid(score.ratee_id);
    let round_str = encode_uuid(score.round_id);
    let at_str    = encode_dt(score.updated_at);
    let count     = i64::try_from(score.question_count).unwrap_or(i64::MAX);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO rater_scores
             (rater_token, ratee_id, round_id, score, question_count, updated_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)
           ON CONFLICT (rater_token, ratee_id, round_id) DO UPDATE SET
             score = excluded.score, question_count = excluded.question_count,
             updated_at = excluded.updated_at",
          rusqlite::params![token, ratee_str, round_str, score.score, count, at_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn delete_rater_score(
    &self,
    round_id: Uuid,
    rater_token: RaterToken,
    ratee_id: Uuid,
  ) -> Result<()> {
    let token     = rater_token.as_str().to_owned();
    let round_str = encode_uuid(round_id);
    let ratee_str = encode_uuid(ratee_id);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "DELETE FROM rater_scores
           WHERE rater_token = ?1 AND ratee_id = ?2 AND round_id = ?3",
          rusqlite::params![token, ratee_str, round_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn list_rater_scores(&self, round_id: Uuid, ratee_id: Uuid) -> Result<Vec<RaterScore>> {
    let round_str = encode_uuid(round_id);
    let ratee_str = encode_uuid(ratee_id);

    let raws: Vec<RawRaterScore> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT rater_token, ratee_id, round_id, score, question_count, updated_at
           FROM rater_scores WHERE round_id = ?1 AND ratee_id = ?2 ORDER BY rater_token",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![round_str, ratee_str], |row| {
            Ok(RawRaterScore {
              rater_token:    row.get(0)?,
              ratee_id:       row.get(1)?,
              round_id:       row.get(2)?,
              score:          row.get(3)?,
              question_count: row.get(4)?,
              updated_at:     row.get(5)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    Ok(decode_rows("rater_scores", raws, RawRaterScore::into_score))
  }
}
