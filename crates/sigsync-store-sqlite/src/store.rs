//! [`SqliteStore`], the SQLite implementation of [`SignatureStore`].

use std::path::Path;

use chrono::Utc;
use rusqlite::{OptionalExtension as _, TransactionBehavior};

use sigsync_core::{
  reconcile::{ReconcilePolicy, reconcile},
  signature::{Signature, SignatureDraft},
  store::{SignatureStore, UpsertOutcome},
};

use crate::{
  Result,
  encode::{ATTR_COLUMNS, RawSignature, SIGNATURE_COLUMNS, attrs_from_row, encode_dt},
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A signature store backed by a single SQLite file.
///
/// Clones share the inner connection.
#[derive(Clone)]
pub struct SqliteStore {
  conn:   tokio_rusqlite::Connection,
  policy: ReconcilePolicy,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn, policy: ReconcilePolicy::default() };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn, policy: ReconcilePolicy::default() };
    store.init_schema().await?;
    Ok(store)
  }

  /// Use `policy` when an upsert changes an existing row.
  pub fn with_policy(mut self, policy: ReconcilePolicy) -> Self {
    self.policy = policy;
    self
  }

  pub fn policy(&self) -> ReconcilePolicy { self.policy }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Number of stored rows, retired ones included.
  pub async fn count(&self) -> Result<usize> {
    let n: i64 = self
      .conn
      .call(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM signatures", [], |r| r.get(0))?))
      .await?;
    Ok(usize::try_from(n).unwrap_or_default())
  }
}

// ─── SignatureStore impl ─────────────────────────────────────────────────────

impl SignatureStore for SqliteStore {
  type Error = crate::Error;

  async fn upsert(&self, draft: SignatureDraft) -> Result<UpsertOutcome> {
    let draft  = draft.validate()?;
    let now    = encode_dt(Utc::now());
    let policy = self.policy;

    let outcome = self
      .conn
      .call(move |conn| {
        // IMMEDIATE: the write lock is held from the lookup onwards.
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let stored = tx
          .query_row(
            &format!("SELECT {ATTR_COLUMNS} FROM signatures WHERE sid = ?1"),
            rusqlite::params![draft.identity],
            |row| attrs_from_row(row, 0),
          )
          .optional()?;

        let outcome = match stored {
          None => {
            let a = &draft.attrs;
            tx.execute(
              &format!(
                "INSERT INTO signatures (sid, {ATTR_COLUMNS}, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"
              ),
              rusqlite::params![
                draft.identity,
                a.rule_type,
                a.protocol,
                a.src_addr,
                a.src_port,
                a.dst_addr,
                a.dst_port,
                a.message,
                a.origin_file,
                now,
              ],
            )?;
            UpsertOutcome::Created
          }
          Some(stored) => match reconcile(&stored, draft.attrs, policy) {
            None => UpsertOutcome::Unchanged,
            Some(next) => {
              tx.execute(
                "UPDATE signatures SET
                   rule_type = ?2, proto = ?3, src_addr = ?4, src_port = ?5,
                   dst_addr = ?6, dst_port = ?7, msg = ?8, filename = ?9,
                   updated_at = ?10
                 WHERE sid = ?1",
                rusqlite::params![
                  draft.identity,
                  next.rule_type,
                  next.protocol,
                  next.src_addr,
                  next.src_port,
                  next.dst_addr,
                  next.dst_port,
                  next.message,
                  next.origin_file,
                  now,
                ],
              )?;
              UpsertOutcome::Updated
            }
          },
        };

        tx.commit()?;
        Ok(outcome)
      })
      .await?;

    Ok(outcome)
  }

  async fn get(&self, identity: &str) -> Result<Option<Signature>> {
    let sid = identity.to_owned();

    let raw: Option<RawSignature> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {SIGNATURE_COLUMNS} FROM signatures WHERE sid = ?1"),
              rusqlite::params![sid],
              RawSignature::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawSignature::into_signature).transpose()
  }

  async fn live_signatures(&self) -> Result<Vec<Signature>> {
    self.live_rows().await?.into_iter().collect()
  }

  async fn live_rows(&self) -> Result<Vec<Result<Signature>>> {
    let raws: Vec<RawSignature> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {SIGNATURE_COLUMNS} FROM signatures WHERE deleted_at IS NULL"
        ))?;
        let rows = stmt
          .query_map([], RawSignature::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    Ok(raws.into_iter().map(RawSignature::into_signature).collect())
  }

  async fn retire(&self, identity: &str) -> Result<bool> {
    let sid = identity.to_owned();
    let at  = encode_dt(Utc::now());

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE signatures SET deleted_at = ?2 WHERE sid = ?1 AND deleted_at IS NULL",
          rusqlite::params![sid, at],
        )?)
      })
      .await?;

    Ok(changed > 0)
  }
}
