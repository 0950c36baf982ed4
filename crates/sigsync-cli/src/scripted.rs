//! An in-memory [`SignatureStore`] with scripted failures, for driver tests.

use std::sync::Mutex;

use sigsync_core::{
  signature::{Signature, SignatureDraft},
  store::{SignatureStore, UpsertOutcome},
};

#[derive(Default)]
pub struct ScriptedStore {
  /// `upsert` fails for this identity.
  pub reject:  Option<&'static str>,
  /// What `live_rows` returns; `Err` entries become per-row decode failures.
  pub rows:    Vec<Result<Signature, &'static str>>,
  /// Identities upserted successfully, in call order.
  pub written: Mutex<Vec<String>>,
}

impl ScriptedStore {
  pub fn written(&self) -> Vec<String> {
    self.written.lock().map(|w| w.clone()).unwrap_or_default()
  }
}

impl SignatureStore for ScriptedStore {
  type Error = std::io::Error;

  async fn upsert(&self, draft: SignatureDraft) -> Result<UpsertOutcome, Self::Error> {
    let draft = draft.validate().map_err(std::io::Error::other)?;
    if self.reject == Some(draft.identity.as_str()) {
      return Err(std::io::Error::other("database is locked"));
    }
    if let Ok(mut written) = self.written.lock() {
      written.push(draft.identity);
    }
    Ok(UpsertOutcome::Created)
  }

  async fn get(&self, _identity: &str) -> Result<Option<Signature>, Self::Error> { Ok(None) }

  async fn live_signatures(&self) -> Result<Vec<Signature>, Self::Error> {
    self.live_rows().await?.into_iter().collect()
  }

  async fn live_rows(&self) -> Result<Vec<Result<Signature, Self::Error>>, Self::Error> {
    Ok(
      self
        .rows
        .iter()
        .map(|row| row.clone().map_err(std::io::Error::other))
        .collect(),
    )
  }

  async fn retire(&self, _identity: &str) -> Result<bool, Self::Error> { Ok(false) }
}
