//! Ingestion driver: source members → extractor → store upsert.

use std::ops::AddAssign;

use serde::Serialize;
use sigsync_core::store::{SignatureStore, UpsertOutcome};
use sigsync_rules::{Grammar, GrammarRegistry, RuleText, extract};

use crate::{
  config::SourceConfig,
  error::Result,
  members::discover,
};

/// Tally of what ingestion did. Added together across files and sources.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
  pub files:      usize,
  pub unreadable: usize,
  pub matched:    usize,
  pub created:    usize,
  pub updated:    usize,
  pub unchanged:  usize,
  pub mismatched: usize,
  /// Upserts the store rejected, including drafts it refused as malformed.
  pub failed:     usize,
}

impl IngestReport {
  fn record(&mut self, outcome: UpsertOutcome) {
    match outcome {
      UpsertOutcome::Created => self.created += 1,
      UpsertOutcome::Updated => self.updated += 1,
      UpsertOutcome::Unchanged => self.unchanged += 1,
    }
  }
}

impl AddAssign for IngestReport {
  fn add_assign(&mut self, rhs: Self) {
    self.files += rhs.files;
    self.unreadable += rhs.unreadable;
    self.matched += rhs.matched;
    self.created += rhs.created;
    self.updated += rhs.updated;
    self.unchanged += rhs.unchanged;
    self.mismatched += rhs.mismatched;
    self.failed += rhs.failed;
  }
}

// ─── Per member ──────────────────────────────────────────────────────────────

/// Extract every record from one member file and upsert it.
///
/// Nothing here aborts the file: mismatches and rejected upserts are counted
/// and logged, and extraction carries on with the next record.
pub async fn ingest_member<S: SignatureStore>(
  store: &S,
  grammar: &Grammar,
  name: &str,
  bytes: &[u8],
) -> IngestReport {
  let mut report = IngestReport { files: 1, ..Default::default() };
  let text = RuleText::from_bytes(bytes);

  for item in extract(grammar, &text, name) {
    let draft = match item {
      Ok(draft) => draft,
      Err(err) => {
        report.mismatched += 1;
        tracing::warn!(member = name, "skipping match: {err}");
        continue;
      }
    };
    report.matched += 1;

    let identity = draft.identity.clone();
    match store.upsert(draft).await {
      Ok(outcome) => {
        tracing::debug!(member = name, sid = %identity, %outcome);
        report.record(outcome);
      }
      Err(err) => {
        report.failed += 1;
        tracing::error!(member = name, sid = %identity, "upsert failed: {err}");
      }
    }
  }

  report
}

// ─── Per source ──────────────────────────────────────────────────────────────

/// Ingest every member of `source` with its configured grammar.
///
/// Fails only if the grammar is unknown or the source root cannot be read.
pub async fn ingest_source<S: SignatureStore>(
  store: &S,
  registry: &GrammarRegistry,
  source: &SourceConfig,
) -> Result<IngestReport> {
  let grammar = registry.get(&source.grammar)?;
  let mut report = IngestReport::default();

  for member in discover(&source.path)? {
    let member = match member {
      Ok(member) => member,
      Err(err) => {
        report.unreadable += 1;
        tracing::warn!(source = %source.name, "{err}");
        continue;
      }
    };

    let bytes = match tokio::fs::read(&member.path).await {
      Ok(bytes) => bytes,
      Err(err) => {
        report.unreadable += 1;
        tracing::warn!(source = %source.name, member = %member.name, "unreadable: {err}");
        continue;
      }
    };

    let file = ingest_member(store, grammar, &member.name, &bytes).await;
    tracing::info!(
      source = %source.name,
      member = %member.name,
      matched = file.matched,
      created = file.created,
      updated = file.updated,
      mismatched = file.mismatched,
      "member ingested"
    );
    report += file;
  }

  Ok(report)
}

/// Ingest `sources` one after another. A source that cannot be read is logged
/// and skipped; the returned report covers the others.
pub async fn ingest_all<'a, S, I>(store: &S, registry: &GrammarRegistry, sources: I) -> IngestReport
where
  S: SignatureStore,
  I: IntoIterator<Item = &'a SourceConfig>,
{
  let mut total = IngestReport::default();

  for source in sources {
    match ingest_source(store, registry, source).await {
      Ok(report) => {
        tracing::info!(
          source = %source.name,
          files = report.files,
          created = report.created,
          updated = report.updated,
          unchanged = report.unchanged,
          mismatched = report.mismatched,
          failed = report.failed,
          "source ingested"
        );
        total += report;
      }
      Err(err) => tracing::error!(source = %source.name, "skipping source: {err}"),
    }
  }

  total
}

#[cfg(test)]
mod tests {
  use std::fs;

  use sigsync_core::reconcile::ReconcilePolicy;
  use sigsync_rules::Error as RulesError;
  use sigsync_store_sqlite::SqliteStore;

  use super::*;
  use crate::{error::Error, scripted::ScriptedStore};

  const HTTP_RULES: &str = concat!(
    "# emerging-scan.rules\n",
    "alert tcp $EXTERNAL_NET any -> $HOME_NET any (msg:\"ET SCAN Nmap\"; sid:2009358; rev:5;)\n",
    "alert udp [10.0.0.0/8,192.168.0.0/16] any -> any any (msg:\"ET POLICY DNS\";\n",
    "  classtype:policy; sid:2027863;)\n",
  );

  const FTP_RULES: &str =
    "alert tcp $EXTERNAL_NET any -> $HOME_NET $HTTP_PORTS (content:\"nmap\"; sid:2009358;)\n";

  fn registry() -> GrammarRegistry { GrammarRegistry::with_builtins().unwrap() }

  #[tokio::test]
  async fn member_records_are_upserted() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let registry = registry();
    let grammar = registry.get("suricata").unwrap();

    let report = ingest_member(&store, grammar, "emerging-scan.rules", HTTP_RULES.as_bytes()).await;
    assert_eq!(report.matched, 2);
    assert_eq!(report.created, 2);

    let sig = store.get("2027863").await.unwrap().unwrap();
    assert_eq!(sig.attrs.src_addr, "[10.0.0.0/8,192.168.0.0/16]");
    assert_eq!(sig.attrs.message, "ET POLICY DNS");
    assert_eq!(sig.attrs.origin_file, "emerging-scan.rules");

    let again = ingest_member(&store, grammar, "emerging-scan.rules", HTTP_RULES.as_bytes()).await;
    assert_eq!(again.unchanged, 2);
    assert_eq!(again.created + again.updated, 0);
  }

  #[tokio::test]
  async fn second_grammar_overwrites_under_replace() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let registry = registry();

    ingest_member(&store, registry.get("suricata").unwrap(), "http.rules", HTTP_RULES.as_bytes())
      .await;
    let report =
      ingest_member(&store, registry.get("snort").unwrap(), "ftp.rules", FTP_RULES.as_bytes())
        .await;
    assert_eq!(report.updated, 1);

    let sig = store.get("2009358").await.unwrap().unwrap();
    assert_eq!(sig.attrs.dst_port, "$HTTP_PORTS");
    assert_eq!(sig.attrs.message, "");
    assert_eq!(sig.attrs.origin_file, "ftp.rules");
  }

  #[tokio::test]
  async fn second_grammar_fills_gaps_under_prefer_non_empty() {
    let store = SqliteStore::open_in_memory()
      .await
      .unwrap()
      .with_policy(ReconcilePolicy::PreferNonEmpty);
    let registry = registry();

    ingest_member(&store, registry.get("suricata").unwrap(), "http.rules", HTTP_RULES.as_bytes())
      .await;
    ingest_member(&store, registry.get("snort").unwrap(), "ftp.rules", FTP_RULES.as_bytes()).await;

    let sig = store.get("2009358").await.unwrap().unwrap();
    assert_eq!(sig.attrs.dst_port, "$HTTP_PORTS");
    assert_eq!(sig.attrs.message, "ET SCAN Nmap");
  }

  #[tokio::test]
  async fn rules_without_sid_are_ignored() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let registry = registry();
    let text = b"alert tcp any any -> any any (msg:\"no sid here\";)\n";

    let report = ingest_member(&store, registry.get("suricata").unwrap(), "x.rules", text).await;
    assert_eq!(report, IngestReport { files: 1, ..Default::default() });
    assert_eq!(store.count().await.unwrap(), 0);
  }

  #[tokio::test]
  async fn storage_failure_skips_only_that_record() {
    let store = ScriptedStore { reject: Some("2"), ..Default::default() };
    let registry = registry();
    let text = concat!(
      "alert tcp a 1 -> b 2 (sid:1;)\n",
      "alert tcp c 3 -> d 4 (sid:2;)\n",
      "alert tcp e 5 -> f 6 (sid:3;)\n",
    );

    let report =
      ingest_member(&store, registry.get("snort").unwrap(), "local.rules", text.as_bytes()).await;
    assert_eq!(report.matched, 3);
    assert_eq!(report.failed, 1);
    assert_eq!(report.created, 2);
    assert_eq!(store.written(), ["1", "3"]);
  }

  #[tokio::test]
  async fn source_directory_is_walked() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("rules")).unwrap();
    fs::write(dir.path().join("rules/scan.rules"), HTTP_RULES).unwrap();
    fs::write(dir.path().join("rules/other.rules"), "not a rule\n").unwrap();
    fs::write(dir.path().join("rules/binary.rules"), [0xff, 0xfe, 0x00]).unwrap();

    let store = SqliteStore::open_in_memory().await.unwrap();
    let source = SourceConfig {
      name:    "et-open".into(),
      grammar: "suricata".into(),
      path:    dir.path().to_path_buf(),
    };

    let report = ingest_source(&store, &registry(), &source).await.unwrap();
    assert_eq!(report.files, 3);
    assert_eq!(report.created, 2);

    let sig = store.get("2009358").await.unwrap().unwrap();
    assert_eq!(sig.attrs.origin_file, "rules/scan.rules");
  }

  #[tokio::test]
  async fn missing_source_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("local.rules"), FTP_RULES).unwrap();

    let store = SqliteStore::open_in_memory().await.unwrap();
    let registry = registry();
    let sources = [
      SourceConfig {
        name:    "gone".into(),
        grammar: "snort".into(),
        path:    dir.path().join("gone"),
      },
      SourceConfig {
        name:    "local".into(),
        grammar: "snort".into(),
        path:    dir.path().join("local.rules"),
      },
    ];

    assert!(matches!(
      ingest_source(&store, &registry, &sources[0]).await,
      Err(Error::Io { .. })
    ));

    let total = ingest_all(&store, &registry, &sources).await;
    assert_eq!(total.files, 1);
    assert_eq!(total.created, 1);
  }

  #[tokio::test]
  async fn unknown_grammar_fails_the_source() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let source = SourceConfig {
      name:    "x".into(),
      grammar: "yara".into(),
      path:    ".".into(),
    };
    let err = ingest_source(&store, &registry(), &source).await.unwrap_err();
    assert!(matches!(err, Error::Rules(RulesError::UnknownGrammar(_))));
  }
}
