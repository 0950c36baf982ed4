//! The `SignatureStore` trait.
//!
//! Implemented by storage backends (e.g. `sigsync-store-sqlite`). The
//! ingestion and export drivers depend on this abstraction, not on any
//! concrete backend.

use std::future::Future;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::signature::{Signature, SignatureDraft};

/// What an upsert did to the store.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum UpsertOutcome {
  /// No row existed for the identity; one was inserted.
  Created,
  /// The row existed and at least one tracked attribute changed.
  Updated,
  /// The row existed and nothing changed; no write was issued.
  Unchanged,
}

/// Abstraction over a signature store backend.
///
/// Implementations must make [`upsert`](SignatureStore::upsert) atomic per
/// identity: the lookup, the change decision and the write happen as one unit,
/// and concurrent upserts to the same identity are serialized.
pub trait SignatureStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Insert or update the record keyed by `draft.identity`.
  ///
  /// Drafts without an identity are rejected before storage is touched.
  fn upsert(
    &self,
    draft: SignatureDraft,
  ) -> impl Future<Output = Result<UpsertOutcome, Self::Error>> + Send + '_;

  /// Fetch a record by identity, retired or not.
  fn get<'a>(
    &'a self,
    identity: &'a str,
  ) -> impl Future<Output = Result<Option<Signature>, Self::Error>> + Send + 'a;

  /// All records without a `deleted_at` marker, in no particular order.
  fn live_signatures(
    &self,
  ) -> impl Future<Output = Result<Vec<Signature>, Self::Error>> + Send + '_;

  /// The same view as [`live_signatures`](SignatureStore::live_signatures),
  /// decoded row by row. A row that cannot be decoded is an `Err` in place;
  /// the outer error means the read itself failed.
  fn live_rows(
    &self,
  ) -> impl Future<Output = Result<Vec<Result<Signature, Self::Error>>, Self::Error>> + Send + '_;

  /// Soft-delete a record. Returns `false` if the identity is unknown or
  /// already retired.
  fn retire<'a>(
    &'a self,
    identity: &'a str,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;
}
