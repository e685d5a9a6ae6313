//! Router tests against an engine over an in-memory SQLite store.

use std::sync::Arc;

use appraisal_core::{
  config::{PlannerConfig, ScoringConfig},
  engine::Engine,
  kpi::{Applicability, KpiDefinition, KpiStatus},
  policy::OrgPolicy,
  pseudonym::Pseudonymizer,
  question::{FeedbackQuestion, QuestionScope},
  relationship::{Relationship, RelationshipFact},
  round::Person,
  store::EvaluationStore,
};
use appraisal_store_sqlite::SqliteStore;
use axum::{
  Router,
  body::{Body, to_bytes},
  http::{Request, StatusCode},
};
use serde_json::{Value, json};
use tower::ServiceExt as _;
use uuid::Uuid;

use crate::api_router;

async fn app(people: usize) -> (Router, Vec<Uuid>) {
  let store = SqliteStore::open_in_memory().await.expect("in-memory store");
  let mut ids = Vec::new();
  for i in 0..people {
    let person = Person {
      person_id:  Uuid::new_v4(),
      name:       format!("Person {i}"),
      role:       format!("Analyst {i}"),
      department: "Finance".into(),
      manager_id: None,
      active:     true,
    };
    ids.push(person.person_id);
    store.upsert_person(person).await.unwrap();
  }
  store
    .put_relationships(vec![RelationshipFact {
      rater_role:   "Analyst 0".into(),
      ratee_role:   "Analyst 1".into(),
      relationship: Relationship::Direct,
    }])
    .await
    .unwrap();

  let engine = Engine::new(
    store,
    Pseudonymizer::new("router-tests").unwrap(),
    OrgPolicy::default(),
    PlannerConfig { seed: Some(1), ..PlannerConfig::default() },
    ScoringConfig::default(),
  );
  (api_router(Arc::new(engine)), ids)
}

/// A lead who manages one analyst, with one question and one KPI.
struct Team {
  app:      Router,
  lead:     Uuid,
  analyst:  Uuid,
  question: Uuid,
  kpi:      Uuid,
}

async fn team() -> Team {
  let store = SqliteStore::open_in_memory().await.expect("in-memory store");
  let lead = Person {
    person_id:  Uuid::new_v4(),
    name:       "Lena".into(),
    role:       "Team Lead".into(),
    department: "Finance".into(),
    manager_id: None,
    active:     true,
  };
  let analyst = Person {
    person_id: Uuid::new_v4(),
    name: "Abe".into(),
    role: "Analyst 1".into(),
    manager_id: Some(lead.person_id),
    ..lead.clone()
  };
  store.upsert_person(lead.clone()).await.unwrap();
  store.upsert_person(analyst.clone()).await.unwrap();
  store
    .put_relationships(vec![RelationshipFact {
      rater_role:   "Team Lead".into(),
      ratee_role:   "Analyst 1".into(),
      relationship: Relationship::Direct,
    }])
    .await
    .unwrap();

  let question = FeedbackQuestion {
    question_id:  Uuid::new_v4(),
    category:     "Communication".into(),
    text:         "Shares context early".into(),
    scope:        QuestionScope::Global,
    open_ended:   false,
    for_managers: false,
    active:       true,
  };
  store.upsert_question(question.clone()).await.unwrap();
  let kpi = KpiDefinition {
    kpi_id:        Uuid::new_v4(),
    name:          "Accuracy".into(),
    weight:        Some(100.0),
    applicability: Applicability::Global,
    status:        KpiStatus::Approved,
    active:        true,
  };
  store.upsert_kpi(kpi.clone()).await.unwrap();

  let policy: OrgPolicy = serde_json::from_value(json!({
    "hierarchy": [{ "manager": "Team Lead", "subordinates": ["Analyst 1"] }]
  }))
  .unwrap();
  let engine = Engine::new(
    store,
    Pseudonymizer::new("router-tests").unwrap(),
    policy,
    PlannerConfig { seed: Some(1), ..PlannerConfig::default() },
    ScoringConfig::default(),
  );
  Team {
    app:      api_router(Arc::new(engine)),
    lead:     lead.person_id,
    analyst:  analyst.person_id,
    question: question.question_id,
    kpi:      kpi.kpi_id,
  }
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
  let request = Request::builder()
    .method(method)
    .uri(uri)
    .header("content-type", "application/json")
    .body(body.map_or_else(Body::empty, |b| Body::from(b.to_string())))
    .unwrap();
  let response = app.clone().oneshot(request).await.unwrap();
  let status = response.status();
  let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
  let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
  (status, value)
}

async fn create_round(app: &Router, name: &str) -> String {
  let (status, round) = send(app, "POST", "/rounds", Some(json!({ "name": name }))).await;
  assert_eq!(status, StatusCode::CREATED);
  round["round_id"].as_str().unwrap().to_owned()
}

#[tokio::test]
async fn round_lifecycle() {
  let (app, _) = app(2).await;
  let id = create_round(&app, "2026 H1").await;

  let (status, round) = send(&app, "GET", &format!("/rounds/{id}"), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(round["status"], "draft");

  let (status, activation) = send(&app, "POST", &format!("/rounds/{id}/activate"), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(activation["round"]["status"], "active");
  assert_eq!(activation["peer_assignments"], 2);
  assert_eq!(activation["kpi_assignments"], 0);

  let (status, round) = send(&app, "POST", &format!("/rounds/{id}/close"), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(round["status"], "completed");

  let (status, body) = send(&app, "POST", &format!("/rounds/{id}/close"), None).await;
  assert_eq!(status, StatusCode::CONFLICT);
  assert!(body["error"].as_str().unwrap().contains("completed"));
}

#[tokio::test]
async fn unknown_round_is_404() {
  let (app, _) = app(2).await;
  let (status, body) = send(&app, "GET", &format!("/rounds/{}", Uuid::new_v4()), None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  assert!(body["error"].is_string());
}

#[tokio::test]
async fn second_active_round_conflicts() {
  let (app, _) = app(2).await;
  let first = create_round(&app, "A").await;
  let second = create_round(&app, "B").await;
  send(&app, "POST", &format!("/rounds/{first}/activate"), None).await;

  let (status, _) = send(&app, "POST", &format!("/rounds/{second}/activate"), None).await;
  assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn activation_with_one_person_is_rejected() {
  let (app, _) = app(1).await;
  let id = create_round(&app, "Solo").await;
  let (status, _) = send(&app, "POST", &format!("/rounds/{id}/activate"), None).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unassigned_rating_is_forbidden() {
  let (app, ids) = app(2).await;
  let id = create_round(&app, "R").await;
  send(&app, "POST", &format!("/rounds/{id}/activate"), None).await;

  let kpi_id = Uuid::new_v4().to_string();
  let body = json!({
    "evaluator_id": ids[0],
    "ratee_id": ids[1],
    "scores": { kpi_id: 4 },
  });
  let (status, _) = send(&app, "POST", &format!("/rounds/{id}/ratings"), Some(body)).await;
  assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn scores_without_data_are_zero() {
  let (app, ids) = app(2).await;
  let id = create_round(&app, "R").await;
  let person = ids[0];

  let (status, kpi) =
    send(&app, "GET", &format!("/rounds/{id}/people/{person}/kpi?mode=display"), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(kpi["qualifying_count"], 0);

  let (status, performance) =
    send(&app, "GET", &format!("/rounds/{id}/people/{person}/performance"), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(performance["final_score"], 0.0);
  assert_eq!(performance["confidence"]["label"], "No Confidence");

  let (status, _) =
    send(&app, "GET", &format!("/rounds/{id}/people/{person}/kpi?mode=bogus"), None).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn ratings_come_back_with_decoded_scores() {
  let t = team().await;
  let id = create_round(&t.app, "R").await;
  let (_, activation) = send(&t.app, "POST", &format!("/rounds/{id}/activate"), None).await;
  assert_eq!(activation["kpi_assignments"], 1);

  let kpi = t.kpi.to_string();
  let body = json!({
    "evaluator_id": t.lead,
    "ratee_id": t.analyst,
    "scores": { kpi.clone(): 4.5 },
    "submit": true,
  });
  let (status, rating) = send(&t.app, "POST", &format!("/rounds/{id}/ratings"), Some(body)).await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(rating["scores"][&kpi], 4.5);
  assert!(rating.get("scores_json").is_none());
  assert_eq!(rating["status"], "pending_review");

  let rating_id = rating["rating_id"].as_str().unwrap();
  let review = json!({ "approver_id": t.lead, "approve": true });
  let (status, reviewed) =
    send(&t.app, "POST", &format!("/ratings/{rating_id}/review"), Some(review)).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(reviewed["status"], "approved");
  assert_eq!(reviewed["scores"][&kpi], 4.5);
}

#[tokio::test]
async fn drafting_a_submitted_rating_conflicts() {
  let t = team().await;
  let id = create_round(&t.app, "R").await;
  send(&t.app, "POST", &format!("/rounds/{id}/activate"), None).await;

  let kpi = t.kpi.to_string();
  let body = |submit: bool| {
    json!({
      "evaluator_id": t.lead,
      "ratee_id": t.analyst,
      "scores": { kpi.clone(): 3 },
      "submit": submit,
    })
  };
  let uri = format!("/rounds/{id}/ratings");
  let (status, draft) = send(&t.app, "POST", &uri, Some(body(false))).await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(draft["status"], "draft");

  send(&t.app, "POST", &uri, Some(body(true))).await;
  let (status, error) = send(&t.app, "POST", &uri, Some(body(false))).await;
  assert_eq!(status, StatusCode::CONFLICT);
  assert!(error["error"].as_str().unwrap().contains("already submitted"));
}

#[tokio::test]
async fn questions_are_listed_per_rater() {
  let t = team().await;
  let id = create_round(&t.app, "R").await;
  let (lead, analyst) = (t.lead, t.analyst);

  let (status, questions) = send(
    &t.app,
    "GET",
    &format!("/rounds/{id}/people/{analyst}/questions?rater={lead}"),
    None,
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  let listed = questions.as_array().unwrap();
  assert_eq!(listed.len(), 1);
  assert_eq!(listed[0]["question_id"], t.question.to_string());

  let (status, _) =
    send(&t.app, "GET", &format!("/rounds/{id}/people/{analyst}/questions"), None).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let missing = Uuid::new_v4();
  let (status, _) = send(
    &t.app,
    "GET",
    &format!("/rounds/{missing}/people/{analyst}/questions?rater={lead}"),
    None,
  )
  .await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn sync_kpi_reports_added_assignments() {
  let t = team().await;
  let id = create_round(&t.app, "R").await;
  send(&t.app, "POST", &format!("/rounds/{id}/activate"), None).await;

  let (status, body) = send(&t.app, "POST", &format!("/rounds/{id}/sync-kpi"), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["added"], 0);
}
