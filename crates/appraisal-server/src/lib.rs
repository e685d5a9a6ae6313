//! Wiring for the `appraisal` binary: configuration, engine construction and
//! reference-data import.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use appraisal_core::{
  config::{PlannerConfig, ScoringConfig},
  engine::Engine,
  kpi::KpiDefinition,
  policy::OrgPolicy,
  pseudonym::Pseudonymizer,
  question::FeedbackQuestion,
  relationship::RelationshipFact,
  round::Person,
  store::EvaluationStore,
};
use appraisal_store_sqlite::SqliteStore;
use axum::Router;
use serde::{Deserialize, Serialize};

// ─── Configuration ───────────────────────────────────────────────────────────

/// Top-level configuration, read from `config.toml` and `APPRAISAL_*`
/// environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:             String,
  #[serde(default = "default_port")]
  pub port:             u16,
  pub store_path:       PathBuf,
  /// HMAC key for rater tokens. Changing it orphans every issued token.
  pub pseudonym_secret: String,
  #[serde(default)]
  pub planner:          PlannerConfig,
  #[serde(default)]
  pub scoring:          ScoringConfig,
  #[serde(default)]
  pub policy:           OrgPolicy,
}

fn default_host() -> String { "127.0.0.1".to_string() }

fn default_port() -> u16 { 8080 }

impl ServerConfig {
  /// Layer the file at `path` (optional) under the environment.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    let settings = config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("APPRAISAL"))
      .build()
      .context("failed to read config file")?;

    settings
      .try_deserialize()
      .context("failed to deserialise ServerConfig")
  }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

// ─── Engine ──────────────────────────────────────────────────────────────────

pub type AppEngine = Engine<SqliteStore>;

pub async fn build_engine(config: &ServerConfig) -> anyhow::Result<AppEngine> {
  let store_path = expand_tilde(&config.store_path);
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;
  let pseudonymizer =
    Pseudonymizer::new(&config.pseudonym_secret).context("invalid pseudonym_secret")?;

  if !config.policy.has_hierarchy() {
    tracing::warn!("no [[policy.hierarchy]] rules configured; KPI rounds will have no assignments");
  }

  Ok(Engine::new(
    store,
    pseudonymizer,
    config.policy.clone(),
    config.planner.clone(),
    config.scoring.clone(),
  ))
}

/// The HTTP application: the API nested under `/api`.
pub fn app(engine: Arc<AppEngine>) -> Router {
  Router::new().nest("/api", appraisal_api::api_router(engine))
}

// ─── Reference data import ───────────────────────────────────────────────────

/// Roster and reference data owned by the surrounding HR system, as a JSON
/// document.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ImportData {
  pub people:        Vec<Person>,
  pub relationships: Vec<RelationshipFact>,
  pub questions:     Vec<FeedbackQuestion>,
  pub kpis:          Vec<KpiDefinition>,
}

#[derive(Debug, Default, PartialEq, Eq, Serialize)]
pub struct ImportCounts {
  pub people:        usize,
  pub relationships: usize,
  pub questions:     usize,
  pub kpis:          usize,
}

/// Upsert everything in `data`. Existing rows with the same key are replaced.
pub async fn import<S: EvaluationStore>(store: &S, data: ImportData) -> anyhow::Result<ImportCounts> {
  let counts = ImportCounts {
    people:        data.people.len(),
    relationships: data.relationships.len(),
    questions:     data.questions.len(),
    kpis:          data.kpis.len(),
  };

  for person in data.people {
    store.upsert_person(person).await.context("failed to import person")?;
  }
  store
    .put_relationships(data.relationships)
    .await
    .context("failed to import relationships")?;
  for question in data.questions {
    store.upsert_question(question).await.context("failed to import question")?;
  }
  for kpi in data.kpis {
    store.upsert_kpi(kpi).await.context("failed to import KPI")?;
  }

  Ok(counts)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn parse(toml: &str) -> ServerConfig {
    config::Config::builder()
      .add_source(config::File::from_str(toml, config::FileFormat::Toml))
      .build()
      .unwrap()
      .try_deserialize()
      .unwrap()
  }

  #[test]
  fn minimal_config_uses_defaults() {
    let cfg = parse(
      r#"
        store_path = "appraisal.db"
        pseudonym_secret = "s3cret"
      "#,
    );
    assert_eq!(cfg.host, "127.0.0.1");
    assert_eq!(cfg.port, 8080);
    assert_eq!(cfg.planner.max_per_person, 10);
    assert_eq!(cfg.scoring.kpi_weight, 0.6);
    assert!(!cfg.policy.has_hierarchy());
  }

  #[test]
  fn policy_tables_deserialize() {
    let cfg = parse(
      r#"
        store_path = "appraisal.db"
        pseudonym_secret = "s3cret"

        [planner]
        seed = 42

        [policy.evaluator_aliases]
        "Operations Manager" = "Ops Manager"

        [[policy.hierarchy]]
        manager = "Ops Manager"
        subordinates = [{ match = "prefix", role = "Ops", except = ["Ops Manager"] }]

        [[policy.authority]]
        ratee = "QA Officer"
        rater = "DP Supervisor"
      "#,
    );
    assert_eq!(cfg.planner.seed, Some(42));
    assert!(cfg.policy.may_rate("Operations Manager", "Ops Lebanon"));
    assert_eq!(cfg.policy.authoritative_rater("qa officer"), Some("dp supervisor"));
  }

  #[test]
  fn expand_tilde_leaves_plain_paths() {
    assert_eq!(expand_tilde(Path::new("/var/lib/a.db")), PathBuf::from("/var/lib/a.db"));
  }

  #[tokio::test]
  async fn import_upserts_reference_data() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let data: ImportData = serde_json::from_value(serde_json::json!({
      "people": [{
        "person_id": "6f1c1f0e-7a43-4c55-9d1e-3f3e2b8f4a10",
        "name": "Ada", "role": "Ops 1", "department": "Ops",
        "manager_id": null, "active": true
      }],
      "relationships": [
        { "rater_role": "Ops 1", "ratee_role": "Ops 2", "relationship": "direct" }
      ]
    }))
    .unwrap();

    let counts = import(&store, data).await.unwrap();
    assert_eq!(counts.people, 1);
    assert_eq!(counts.relationships, 1);
    assert_eq!(store.list_people(true).await.unwrap().len(), 1);
    assert_eq!(store.list_relationships().await.unwrap().len(), 1);
  }
}
