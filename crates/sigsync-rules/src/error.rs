//! Error types for the sigsync-rules codec.

use sigsync_core::signature::Field;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// A match did not bind a slot its grammar requires. Skippable.
  #[error("grammar {grammar:?} matched at byte {offset} without required slot {slot}")]
  GrammarMismatch { grammar: String, slot: Field, offset: usize },

  #[error("invalid grammar {grammar:?}: {reason}")]
  InvalidGrammar { grammar: String, reason: String },

  #[error("grammar {grammar:?} has an invalid pattern: {source}")]
  Regex {
    grammar: String,
    #[source]
    source:  regex::Error,
  },

  #[error("grammar {0:?} is defined more than once")]
  DuplicateGrammar(String),

  #[error("unknown grammar: {0:?}")]
  UnknownGrammar(String),

  #[error("unsupported export format: {0:?}")]
  UnsupportedFormat(String),

  /// A row could not be produced while rendering; nothing was written.
  #[error("rendering {format} failed after {rendered} records: {source}")]
  Render {
    format:   String,
    rendered: usize,
    #[source]
    source:   Box<dyn std::error::Error + Send + Sync>,
  },

  #[error("i/o error: {0}")]
  Io(#[from] std::io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
