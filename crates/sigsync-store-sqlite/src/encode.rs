//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings. Absent attributes are stored
//! as empty strings, never NULL.

use chrono::{DateTime, Utc};
use sigsync_core::signature::{Signature, SignatureAttrs};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Columns ─────────────────────────────────────────────────────────────────

/// Tracked attribute columns, in `SignatureAttrs` field order.
pub const ATTR_COLUMNS: &str =
  "rule_type, proto, src_addr, src_port, dst_addr, dst_port, msg, filename";

/// Every column read back into a [`RawSignature`].
pub const SIGNATURE_COLUMNS: &str = "sid, rule_type, proto, src_addr, src_port, dst_addr, \
                                     dst_port, msg, filename, created_at, updated_at, deleted_at";

/// Read the eight attribute columns starting at column index `first`.
pub fn attrs_from_row(row: &rusqlite::Row<'_>, first: usize) -> rusqlite::Result<SignatureAttrs> {
  Ok(SignatureAttrs {
    rule_type:   row.get(first)?,
    protocol:    row.get(first + 1)?,
    src_addr:    row.get(first + 2)?,
    src_port:    row.get(first + 3)?,
    dst_addr:    row.get(first + 4)?,
    dst_port:    row.get(first + 5)?,
    message:     row.get(first + 6)?,
    origin_file: row.get(first + 7)?,
  })
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// A `signatures` row with its timestamps still in text form.
pub struct RawSignature {
  pub sid:        String,
  pub attrs:      SignatureAttrs,
  pub created_at: String,
  pub updated_at: Option<String>,
  pub deleted_at: Option<String>,
}

impl RawSignature {
  /// Map a row selected with [`SIGNATURE_COLUMNS`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(RawSignature {
      sid:        row.get(0)?,
      attrs:      attrs_from_row(row, 1)?,
      created_at: row.get(9)?,
      updated_at: row.get(10)?,
      deleted_at: row.get(11)?,
    })
  }

  pub fn into_signature(self) -> Result<Signature> {
    Ok(Signature {
      identity:   self.sid,
      attrs:      self.attrs,
      created_at: decode_dt(&self.created_at)?,
      updated_at: self.updated_at.as_deref().map(decode_dt).transpose()?,
      deleted_at: self.deleted_at.as_deref().map(decode_dt).transpose()?,
    })
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  #[test]
  fn datetime_round_trips_through_rfc3339() {
    let dt = Utc.with_ymd_and_hms(2024, 11, 5, 8, 30, 0).unwrap();
    assert_eq!(decode_dt(&encode_dt(dt)).unwrap(), dt);
  }

  #[test]
  fn garbage_timestamp_is_a_date_error() {
    assert!(matches!(decode_dt("yesterday"), Err(Error::DateParse(_))));
  }
}
