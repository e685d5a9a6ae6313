//! appraisal binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), opens the
//! SQLite store and either serves the JSON API or runs a one-off command.
//!
//! ```text
//! appraisal serve
//! appraisal import reference.json
//! appraisal create-round "2026 H1"
//! appraisal activate <round-id> --seed 7
//! appraisal sync-kpi <round-id>
//! appraisal report <round-id>
//! ```

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use appraisal_core::{round::NewRound, store::EvaluationStore};
use appraisal_server::{AppEngine, ImportData, ServerConfig, app, build_engine, import};
use clap::{Parser, Subcommand};
use rand::{SeedableRng, rngs::StdRng};
use serde_json::json;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Parser)]
#[command(author, version, about = "Evaluation assignment and scoring service")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml", env = "APPRAISAL_CONFIG")]
  config: PathBuf,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
  /// Serve the JSON API (the default).
  Serve,
  /// Upsert people, relationships, questions and KPIs from a JSON file.
  Import { path: PathBuf },
  /// Create a draft round.
  CreateRound {
    name:     String,
    /// Leave KPI ratings out of this round.
    #[arg(long)]
    no_kpi:   bool,
    /// Leave 360 feedback out of this round.
    #[arg(long)]
    no_360:   bool,
  },
  /// Plan assignments for a round and mark it active.
  Activate {
    round: Uuid,
    /// Planner seed; overrides `planner.seed` from the config.
    #[arg(long)]
    seed:  Option<u64>,
  },
  /// Add KPI assignments for people who joined a manager's team after
  /// activation.
  SyncKpi { round: Uuid },
  /// Close an active round.
  Close { round: Uuid },
  /// Print performance results for one person, or every active person.
  Report {
    round:  Uuid,
    #[arg(long)]
    person: Option<Uuid>,
  },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();
  let config = ServerConfig::load(&cli.config)?;
  let engine = build_engine(&config).await?;

  match cli.command.unwrap_or(Command::Serve) {
    Command::Serve => serve(&config, engine).await,
    Command::Import { path } => {
      let raw = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {path:?}"))?;
      let data: ImportData = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse {path:?}"))?;
      let counts = import(engine.store(), data).await?;
      print_json(&counts)
    }
    Command::CreateRound { name, no_kpi, no_360 } => {
      let input = NewRound { include_kpi: !no_kpi, include_360: !no_360, ..NewRound::new(name) };
      let round = engine.create_round(input).await.context("failed to create round")?;
      print_json(&round)
    }
    Command::Activate { round, seed } => {
      let activation = match seed {
        Some(seed) => {
          let mut rng = StdRng::seed_from_u64(seed);
          engine.activate_round_with(round, &mut rng).await
        }
        None => engine.activate_round(round).await,
      }
      .context("failed to activate round")?;
      if activation.budget_exhausted {
        tracing::warn!(iterations = activation.peer_iterations, "peer planning hit its iteration budget");
      }
      print_json(&activation)
    }
    Command::SyncKpi { round } => {
      let added = engine
        .sync_kpi_assignments(round)
        .await
        .context("failed to sync KPI assignments")?;
      print_json(&json!({ "round_id": round, "added": added }))
    }
    Command::Close { round } => {
      let round = engine.close_round(round).await.context("failed to close round")?;
      print_json(&round)
    }
    Command::Report { round, person } => report(&engine, round, person).await,
  }
}

async fn serve(config: &ServerConfig, engine: AppEngine) -> anyhow::Result<()> {
  let app = app(Arc::new(engine));
  let address = format!("{}:{}", config.host, config.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;
  Ok(())
}

async fn report(engine: &AppEngine, round: Uuid, person: Option<Uuid>) -> anyhow::Result<()> {
  let people = match person {
    Some(id) => vec![
      engine
        .store()
        .get_person(id)
        .await?
        .with_context(|| format!("person {id} not found"))?,
    ],
    None => engine.store().list_people(true).await?,
  };

  for person in people {
    let performance = engine
      .compute_performance(person.person_id, round)
      .await
      .with_context(|| format!("failed to score {}", person.name))?;
    println!(
      "{}",
      json!({
        "person_id": person.person_id,
        "name": person.name,
        "performance": performance,
      })
    );
  }
  Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn sync_kpi_takes_a_round_id() {
    let round = Uuid::new_v4();
    let cli = Cli::try_parse_from(["appraisal", "sync-kpi", &round.to_string()]).unwrap();
    assert!(matches!(cli.command, Some(Command::SyncKpi { round: r }) if r == round));
    assert!(Cli::try_parse_from(["appraisal", "sync-kpi", "not-a-uuid"]).is_err());
  }
}
