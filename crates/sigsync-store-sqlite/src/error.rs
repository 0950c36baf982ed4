//! Error type for `sigsync-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// Record-level rejection raised before storage is touched.
  #[error("core error: {0}")]
  Core(#[from] sigsync_core::Error),

  /// Connectivity loss, constraint violation or any other SQLite failure.
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),
}

impl Error {
  /// Whether the error came from the record itself rather than the database.
  pub fn is_malformed_record(&self) -> bool {
    matches!(self, Error::Core(sigsync_core::Error::MalformedRecord { .. }))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
