//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are RFC 3339 strings, dates are `YYYY-MM-DD`, UUIDs are
//! hyphenated lowercase strings and enums use their snake_case names.

use std::str::FromStr;

use appraisal_core::{
  assignment::{AssignmentRecord, RaterRef},
  feedback::{FeedbackItem, RaterAttributes, RaterScore},
  kpi::KpiDefinition,
  question::FeedbackQuestion,
  rating::RatingItem,
  relationship::RelationshipFact,
  round::{Person, Round},
};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::Value;
use uuid::Uuid;

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn decode_opt_uuid(s: Option<String>) -> Result<Option<Uuid>> {
  s.as_deref().map(decode_uuid).transpose()
}

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

pub fn decode_opt_dt(s: Option<String>) -> Result<Option<DateTime<Utc>>> {
  s.as_deref().map(decode_dt).transpose()
}

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| Error::DateParse(e.to_string()))
}

/// Parse a text column into a `strum`-backed enum.
pub fn decode_enum<T: FromStr>(column: &'static str, s: &str) -> Result<T> {
  s.parse().map_err(|_| Error::UnknownValue { column, value: s.to_owned() })
}

/// Read a nullable numeric column. SQLite will hold text in a `REAL` column
/// if something wrote it there, so the value is taken untyped and checked.
pub fn decode_opt_real(column: &'static str, value: Value) -> Result<Option<f64>> {
  match value {
    Value::Null => Ok(None),
    Value::Real(f) => Ok(Some(f)),
    Value::Integer(i) => Ok(Some(i as f64)),
    Value::Text(s) => Err(Error::UnknownValue { column, value: s }),
    Value::Blob(b) => Err(Error::UnknownValue { column, value: format!("<{} byte blob>", b.len()) }),
  }
}

// ─── Row types ───────────────────────────────────────────────────────────────

pub struct RawPerson {
  pub person_id:  String,
  pub name:       String,
  pub role:       String,
  pub department: String,
  pub manager_id: Option<String>,
  pub active:     bool,
}

impl RawPerson {
  pub fn into_person(self) -> Result<Person> {
    Ok(Person {
      person_id:  decode_uuid(&self.person_id)?,
      name:       self.name,
      role:       self.role,
      department: self.department,
      manager_id: decode_opt_uuid(self.manager_id)?,
      active:     self.active,
    })
  }
}

pub struct RawRelationship {
  pub rater_role:   String,
  pub ratee_role:   String,
  pub relationship: String,
}

impl RawRelationship {
  pub fn into_fact(self) -> Result<RelationshipFact> {
    Ok(RelationshipFact {
      relationship: decode_enum("relationship", &self.relationship)?,
      rater_role:   self.rater_role,
      ratee_role:   self.ratee_role,
    })
  }
}

pub struct RawQuestion {
  pub question_id:  String,
  pub category:     String,
  pub text:         String,
  pub scope:        String,
  pub open_ended:   bool,
  pub for_managers: bool,
  pub active:       bool,
}

impl RawQuestion {
  pub fn into_question(self) -> Result<FeedbackQuestion> {
    Ok(FeedbackQuestion {
      question_id:  decode_uuid(&self.question_id)?,
      category:     self.category,
      text:         self.text,
      scope:        decode_enum("question scope", &self.scope)?,
      open_ended:   self.open_ended,
      for_managers: self.for_managers,
      active:       self.active,
    })
  }
}

pub struct RawKpi {
  pub kpi_id:        String,
  pub name:          String,
  pub weight:        Value,
  pub applicability: String,
  pub status:        String,
  pub active:        bool,
}

impl RawKpi {
  pub fn into_kpi(self) -> Result<KpiDefinition> {
    Ok(KpiDefinition {
      kpi_id:        decode_uuid(&self.kpi_id)?,
      name:          self.name,
      weight:        decode_opt_real("KPI weight", self.weight)?,
      applicability: serde_json::from_str(&self.applicability)?,
      status:        decode_enum("KPI status", &self.status)?,
      active:        self.active,
    })
  }
}

pub struct RawRound {
  pub round_id:    String,
  pub name:        String,
  pub status:      String,
  pub include_kpi: bool,
  pub include_360: bool,
  pub starts_on:   Option<String>,
  pub ends_on:     Option<String>,
  pub created_at:  String,
}

pub const ROUND_COLUMNS: &str =
  "round_id, name, status, include_kpi, include_360, starts_on, ends_on, created_at";

impl RawRound {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      round_id:    row.get(0)?,
      name:        row.get(1)?,
      status:      row.get(2)?,
      include_kpi: row.get(3)?,
      include_360: row.get(4)?,
      starts_on:   row.get(5)?,
      ends_on:     row.get(6)?,
      created_at:  row.get(7)?,
    })
  }

  pub fn into_round(self) -> Result<Round> {
    Ok(Round {
      round_id:    decode_uuid(&self.round_id)?,
      name:        self.name,
      status:      decode_enum("round status", &self.status)?,
      include_kpi: self.include_kpi,
      include_360: self.include_360,
      starts_on:   self.starts_on.as_deref().map(decode_date).transpose()?,
      ends_on:     self.ends_on.as_deref().map(decode_date).transpose()?,
      created_at:  decode_dt(&self.created_at)?,
    })
  }
}

pub struct RawAssignment {
  pub round_id:    String,
  pub rater_id:    Option<String>,
  pub rater_token: Option<String>,
  pub ratee_id:    String,
}

impl RawAssignment {
  pub fn into_record(self) -> Result<AssignmentRecord> {
    let rater = match (self.rater_id, self.rater_token) {
      (Some(id), None) => RaterRef::Id(decode_uuid(&id)?),
      (None, Some(token)) => RaterRef::Token(token.into()),
      _ => {
        return Err(Error::UnknownValue {
          column: "assignment rater",
          value:  "both or neither of rater_id and rater_token".into(),
        });
      }
    };
    Ok(AssignmentRecord {
      round_id: decode_uuid(&self.round_id)?,
      rater,
      ratee_id: decode_uuid(&self.ratee_id)?,
    })
  }
}

pub const RATING_COLUMNS: &str = "rating_id, evaluator_id, ratee_id, round_id, scores_json, \
                                  comment, status, submitted_at, approved_at, approved_by";

pub struct RawRating {
  pub rating_id:    String,
  pub evaluator_id: String,
  pub ratee_id:     String,
  pub round_id:     String,
  pub scores_json:  String,
  pub comment:      Option<String>,
  pub status:       String,
  pub submitted_at: Option<String>,
  pub approved_at:  Option<String>,
  pub approved_by:  Option<String>,
}

impl RawRating {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      rating_id:    row.get(0)?,
      evaluator_id: row.get(1)?,
      ratee_id:     row.get(2)?,
      round_id:     row.get(3)?,
      scores_json:  row.get(4)?,
      comment:      row.get(5)?,
      status:       row.get(6)?,
      submitted_at: row.get(7)?,
      approved_at:  row.get(8)?,
      approved_by:  row.get(9)?,
    })
  }

  pub fn into_rating(self) -> Result<RatingItem> {
    Ok(RatingItem {
      rating_id:    decode_uuid(&self.rating_id)?,
      evaluator_id: decode_uuid(&self.evaluator_id)?,
      ratee_id:     decode_uuid(&self.ratee_id)?,
      round_id:     decode_uuid(&self.round_id)?,
      // Left as text; malformed payloads are the aggregator's concern.
      scores_json:  self.scores_json,
      comment:      self.comment,
      status:       decode_enum("rating status", &self.status)?,
      submitted_at: decode_opt_dt(self.submitted_at)?,
      approved_at:  decode_opt_dt(self.approved_at)?,
      approved_by:  decode_opt_uuid(self.approved_by)?,
    })
  }
}

pub struct RawFeedback {
  pub rater_token:      String,
  pub ratee_id:         String,
  pub round_id:         String,
  pub question_id:      String,
  pub score:            Value,
  pub comment:          Option<String>,
  pub status:           String,
  pub submitted_at:     Option<String>,
  pub department_token: String,
  pub role_token:       String,
  pub is_manager_token: String,
}

impl RawFeedback {
  pub fn into_item(self) -> Result<FeedbackItem> {
    Ok(FeedbackItem {
      rater_token:  self.rater_token.into(),
      ratee_id:     decode_uuid(&self.ratee_id)?,
      round_id:     decode_uuid(&self.round_id)?,
      question_id:  decode_uuid(&self.question_id)?,
      score:        decode_opt_real("feedback score", self.score)?,
      comment:      self.comment,
      status:       decode_enum("feedback status", &self.status)?,
      submitted_at: decode_opt_dt(self.submitted_at)?,
      attributes:   RaterAttributes {
        department: self.department_token.into(),
        role:       self.role_token.into(),
        is_manager: self.is_manager_token.into(),
      },
    })
  }
}

pub struct RawRaterScore {
  pub rater_token:    String,
  pub ratee_id:       String,
  pub round_id:       String,
  pub score:          Value,
  pub question_count: i64,
  pub updated_at:     String,
}

impl RawRaterScore {
  pub fn into_score(self) -> Result<RaterScore> {
    Ok(RaterScore {
      rater_token:    self.rater_token.into(),
      ratee_id:       decode_uuid(&self.ratee_id)?,
      round_id:       decode_uuid(&self.round_id)?,
      score:          decode_opt_real("rater score", self.score)?.ok_or(Error::UnknownValue {
        column: "rater score",
        value:  "NULL".into(),
      })?,
      question_count: usize::try_from(self.question_count).unwrap_or_default(),
      updated_at:     decode_dt(&self.updated_at)?,
    })
  }
}
