//! Export driver: live store view → one artifact per configured target.

use std::path::PathBuf;

use sigsync_core::store::SignatureStore;
use sigsync_rules::{Artifact, ExportFormat, artifact::export_to};

use crate::{
  config::ExportTarget,
  error::{Error, Result},
};

/// Produce the artifact for one target.
///
/// The format name is checked before the store is read, so an unsupported
/// format never touches the filesystem. A row the store cannot decode aborts
/// this artifact and leaves the previous one in place.
pub async fn export_target<S: SignatureStore>(store: &S, target: &ExportTarget) -> Result<Artifact> {
  let format = ExportFormat::parse(&target.format)?;

  let rows = store
    .live_rows()
    .await
    .map_err(|err| Error::Store(Box::new(err)))?;

  Ok(export_to(&target.path, format, rows)?)
}

/// Outcome of one target within [`export_all`].
#[derive(Debug)]
pub struct ExportResult {
  pub format: String,
  pub path:   PathBuf,
  pub result: Result<usize>,
}

/// Run every target. A failing target is logged and does not stop the rest.
pub async fn export_all<'a, S, I>(store: &S, targets: I) -> Vec<ExportResult>
where
  S: SignatureStore,
  I: IntoIterator<Item = &'a ExportTarget>,
{
  let mut results = Vec::new();

  for target in targets {
    let result = export_target(store, target).await.map(|artifact| artifact.records);
    match &result {
      Ok(records) => tracing::info!(
        format = %target.format,
        path = %target.path.display(),
        records,
        "artifact written"
      ),
      Err(err) => tracing::error!(
        format = %target.format,
        path = %target.path.display(),
        "export failed: {err}"
      ),
    }
    results.push(ExportResult {
      format: target.format.clone(),
      path:   target.path.clone(),
      result,
    });
  }

  results
}
