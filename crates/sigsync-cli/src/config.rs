//! Runtime configuration, deserialised once at startup.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use sigsync_core::reconcile::ReconcilePolicy;
use sigsync_rules::{GrammarRegistry, GrammarSpec};

// ─── Configuration ────────────────────────────────────────────────────────────

/// Everything the driver needs, from `sigsync.toml` and `SIGSYNC_*`
/// environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  #[serde(default = "default_store_path")]
  pub store_path: PathBuf,
  #[serde(default)]
  pub policy:     ReconcilePolicy,
  #[serde(default)]
  pub sources:    Vec<SourceConfig>,
  /// Grammars registered on top of the built-in `suricata` and `snort`.
  #[serde(default)]
  pub grammars:   Vec<GrammarSpec>,
  #[serde(default = "default_exports")]
  pub exports:    Vec<ExportTarget>,
}

/// One rule archive, already unpacked to `path`.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
  pub name:    String,
  pub grammar: String,
  pub path:    PathBuf,
}

/// One artifact to produce. `format` is checked when the export runs.
#[derive(Debug, Clone, Deserialize)]
pub struct ExportTarget {
  pub format: String,
  pub path:   PathBuf,
}

fn default_store_path() -> PathBuf { PathBuf::from("signatures.db") }

fn default_exports() -> Vec<ExportTarget> {
  vec![
    ExportTarget { format: "suricata".into(), path: "export_suricata.txt".into() },
    ExportTarget { format: "dionis".into(), path: "export_dionis.txt".into() },
  ]
}

impl Default for Config {
  fn default() -> Self {
    Self {
      store_path: default_store_path(),
      policy:     ReconcilePolicy::default(),
      sources:    Vec::new(),
      grammars:   Vec::new(),
      exports:    default_exports(),
    }
  }
}

impl Config {
  /// Layer the optional file at `path` under `SIGSYNC_`-prefixed environment
  /// variables (`__` separates nested keys).
  pub fn load(path: &Path) -> Result<Self, config::ConfigError> {
    config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(
        config::Environment::with_prefix("SIGSYNC")
          .prefix_separator("_")
          .separator("__"),
      )
      .build()?
      .try_deserialize()
  }

  /// Built-in grammars plus every configured one.
  pub fn grammar_registry(&self) -> sigsync_rules::Result<GrammarRegistry> {
    let mut registry = GrammarRegistry::with_builtins()?;
    for spec in &self.grammars {
      registry.register(spec)?;
    }
    Ok(registry)
  }

  /// Fail on the first source whose grammar is not registered.
  pub fn check_sources(&self, registry: &GrammarRegistry) -> sigsync_rules::Result<()> {
    for source in &self.sources {
      registry.get(&source.grammar)?;
    }
    Ok(())
  }

  pub fn store_path(&self) -> PathBuf { expand_tilde(&self.store_path) }
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

#[cfg(test)]
mod tests {
  use std::fs;

  use sigsync_core::signature::Field;

  use super::*;

  #[test]
  fn missing_file_yields_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = Config::load(&dir.path().join("absent.toml")).unwrap();

    assert_eq!(cfg.store_path, PathBuf::from("signatures.db"));
    assert_eq!(cfg.policy, ReconcilePolicy::Replace);
    assert!(cfg.sources.is_empty());
    let formats: Vec<_> = cfg.exports.iter().map(|e| e.format.as_str()).collect();
    assert_eq!(formats, ["suricata", "dionis"]);
  }

  #[test]
  fn reads_sources_grammars_and_exports() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sigsync.toml");
    fs::write(
      &path,
      r#"
store_path = "/var/lib/sigsync/signatures.db"
policy     = "prefer_non_empty"

[[sources]]
name    = "et-open"
grammar = "suricata"
path    = "archives/et-open"

[[grammars]]
name     = "custom"
pattern  = 'alert (?P<protocol>\w+) .*?sid:(?P<identity>\d+);'
required = ["protocol"]

[[exports]]
format = "dionis"
path   = "out/dionis.txt"
"#,
    )
    .unwrap();

    let cfg = Config::load(&path).unwrap();
    assert_eq!(cfg.policy, ReconcilePolicy::PreferNonEmpty);
    assert_eq!(cfg.sources.len(), 1);
    assert_eq!(cfg.sources[0].grammar, "suricata");
    assert_eq!(cfg.grammars[0].required, [Field::Protocol]);
    assert_eq!(cfg.exports.len(), 1);
    assert_eq!(cfg.exports[0].path, PathBuf::from("out/dionis.txt"));

    let registry = cfg.grammar_registry().unwrap();
    assert!(registry.get("custom").is_ok());
    cfg.check_sources(&registry).unwrap();
  }

  #[test]
  fn unknown_source_grammar_is_reported() {
    let cfg = Config {
      sources: vec![SourceConfig {
        name:    "mystery".into(),
        grammar: "yara".into(),
        path:    "rules".into(),
      }],
      ..Config::default()
    };
    let registry = cfg.grammar_registry().unwrap();
    assert!(matches!(
      cfg.check_sources(&registry),
      Err(sigsync_rules::Error::UnknownGrammar(name)) if name == "yara"
    ));
  }

  #[test]
  fn tilde_expands_to_home() {
    let Ok(home) = std::env::var("HOME") else { return };
    assert_eq!(expand_tilde(Path::new("~/db.sqlite")), PathBuf::from(home).join("db.sqlite"));
    assert_eq!(expand_tilde(Path::new("db.sqlite")), PathBuf::from("db.sqlite"));
  }
}
