//! Driver for sigsync: configuration, source ingestion and artifact export.
//!
//! The `sigsync` binary in this crate wires these pieces to a
//! [`SqliteStore`](sigsync_store_sqlite::SqliteStore); everything here is
//! generic over [`SignatureStore`](sigsync_core::store::SignatureStore).

pub mod config;
pub mod error;
pub mod export;
pub mod ingest;
pub mod members;

#[cfg(test)]
mod scripted;

pub use config::{Config, ExportTarget, SourceConfig};
pub use error::{Error, Result};
pub use export::{ExportResult, export_all, export_target};
pub use ingest::{IngestReport, ingest_all, ingest_member, ingest_source};
