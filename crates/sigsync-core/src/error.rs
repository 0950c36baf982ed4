//! Error types for `sigsync-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// The record carries no identity and cannot be keyed.
  #[error("malformed record from {origin:?}: missing identity")]
  MalformedRecord { origin: String },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
