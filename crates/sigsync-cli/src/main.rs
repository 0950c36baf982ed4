//! sigsync binary.
//!
//! Reads `sigsync.toml` (or the path given with `--config`), opens the SQLite
//! signature store, and ingests the configured rule sources and/or exports the
//! live signature set.
//!
//! ```text
//! sigsync ingest --source et-open
//! sigsync export --format dionis
//! sigsync run
//! ```

use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use sigsync_cli::{Config, ExportTarget, SourceConfig, export_all, ingest_all};
use sigsync_core::store::SignatureStore;
use sigsync_rules::{ExportFormat, GrammarRegistry};
use sigsync_store_sqlite::SqliteStore;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Intrusion-detection signature reconciler")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "sigsync.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Extract signatures from the configured sources into the store.
  Ingest {
    /// Only ingest the named source. Repeatable.
    #[arg(long = "source", value_name = "NAME")]
    sources: Vec<String>,
  },
  /// Render the live signature set into the configured artifacts.
  Export {
    /// Only export the named format. Repeatable.
    #[arg(long = "format", value_name = "NAME")]
    formats: Vec<String>,
  },
  /// Print the live signature set.
  List {
    /// One JSON object per line.
    #[arg(long)]
    json: bool,
  },
  /// Mark signatures as retired so they are no longer exported.
  Retire {
    #[arg(required = true, value_name = "SID")]
    sids: Vec<String>,
  },
  /// Ingest every source, then export every target.
  Run,
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

  let config = Config::load(&cli.config)
    .with_context(|| format!("failed to load configuration from {:?}", cli.config))?;

  let registry = config
    .grammar_registry()
    .context("failed to compile grammars")?;
  config
    .check_sources(&registry)
    .context("invalid source configuration")?;

  let store_path = config.store_path();
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?
    .with_policy(config.policy);

  match cli.command {
    Command::Ingest { sources } => {
      let sources = select_sources(&config, &sources)?;
      ingest(&store, &registry, sources).await;
    }
    Command::Export { formats } => export(&store, &select_targets(&config, &formats)).await?,
    Command::List { json } => list(&store, json).await?,
    Command::Retire { sids } => retire(&store, &sids).await?,
    Command::Run => {
      ingest(&store, &registry, config.sources.iter().collect()).await;
      export(&store, &config.exports).await?;
    }
  }

  Ok(())
}

// ─── Commands ────────────────────────────────────────────────────────────────

async fn ingest(store: &SqliteStore, registry: &GrammarRegistry, sources: Vec<&SourceConfig>) {
  if sources.is_empty() {
    tracing::warn!("no sources configured");
    return;
  }

  let report = ingest_all(store, registry, sources).await;
  tracing::info!(
    files = report.files,
    unreadable = report.unreadable,
    created = report.created,
    updated = report.updated,
    unchanged = report.unchanged,
    mismatched = report.mismatched,
    failed = report.failed,
    "ingestion finished"
  );
}

async fn export(store: &SqliteStore, targets: &[ExportTarget]) -> anyhow::Result<()> {
  let results = export_all(store, targets).await;
  let failed = results.iter().filter(|r| r.result.is_err()).count();
  if failed > 0 {
    anyhow::bail!("{failed} of {} exports failed", results.len());
  }
  Ok(())
}

async fn list(store: &SqliteStore, json: bool) -> anyhow::Result<()> {
  let mut live = store
    .live_signatures()
    .await
    .context("failed to read signatures")?;
  live.sort_by(|a, b| a.identity.cmp(&b.identity));

  let mut out = String::new();
  for sig in &live {
    if json {
      out.push_str(&serde_json::to_string(sig)?);
      out.push('\n');
    } else {
      ExportFormat::Suricata.render_line(sig, &mut out);
    }
  }
  print!("{out}");
  Ok(())
}

async fn retire(store: &SqliteStore, sids: &[String]) -> anyhow::Result<()> {
  for sid in sids {
    let retired = store
      .retire(sid)
      .await
      .with_context(|| format!("failed to retire {sid}"))?;
    if retired {
      tracing::info!(sid = %sid, "retired");
    } else {
      tracing::warn!(sid = %sid, "no live signature with this sid");
    }
  }
  Ok(())
}

// ─── Selection ───────────────────────────────────────────────────────────────

/// Sources named on the command line, or all of them when none are.
fn select_sources<'a>(config: &'a Config, names: &[String]) -> anyhow::Result<Vec<&'a SourceConfig>> {
  if names.is_empty() {
    return Ok(config.sources.iter().collect());
  }
  names
    .iter()
    .map(|name| {
      config
        .sources
        .iter()
        .find(|s| &s.name == name)
        .with_context(|| format!("no source named {name:?} in configuration"))
    })
    .collect()
}

/// Targets for the formats named on the command line, or all of them when
/// none are. A format without a configured target goes to
/// `export_<format>.txt`.
fn select_targets(config: &Config, formats: &[String]) -> Vec<ExportTarget> {
  if formats.is_empty() {
    return config.exports.clone();
  }

  let mut targets = Vec::new();
  for format in formats {
    let configured: Vec<_> = config
      .exports
      .iter()
      .filter(|t| &t.format == format)
      .cloned()
      .collect();
    if configured.is_empty() {
      targets.push(ExportTarget {
        format: format.clone(),
        path:   PathBuf::from(format!("export_{format}.txt")),
      });
    } else {
      targets.extend(configured);
    }
  }
  targets
}
