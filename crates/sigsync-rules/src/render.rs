//! Export renderers.
//!
//! Each format turns one [`Signature`] into exactly one `\n`-terminated line.
//! The whole artifact is rendered into memory before anything is written.

use std::{fmt::Write as _, str::FromStr};

use sigsync_core::signature::Signature;
use strum::{Display, EnumString};

use crate::error::{Error, Result};

/// Placeholder for attributes that were never extracted.
pub const SENTINEL: &str = "N/A";

/// Target syntaxes understood by downstream rule engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum ExportFormat {
  /// Declarative rule syntax: header, message clause, identifier clause.
  Suricata,
  /// Flat `key:value;` syntax carrying every attribute and its provenance.
  Dionis,
}

impl ExportFormat {
  /// Resolve a format name, failing with [`Error::UnsupportedFormat`].
  pub fn parse(name: &str) -> Result<Self> {
    Self::from_str(name).map_err(|_| Error::UnsupportedFormat(name.to_owned()))
  }

  /// Append the line for `sig` to `out`.
  pub fn render_line(self, sig: &Signature, out: &mut String) {
    let a = &sig.attrs;
    // Writing into a String cannot fail.
    let _ = match self {
      ExportFormat::Suricata => writeln!(
        out,
        "{} {} {} {} -> {} {} (msg:\"{}\"; sid:{};)",
        or_sentinel(&a.rule_type),
        or_sentinel(&a.protocol),
        or_any(&a.src_addr),
        or_any(&a.src_port),
        or_any(&a.dst_addr),
        or_any(&a.dst_port),
        or_sentinel(&a.message),
        sig.identity,
      ),
      ExportFormat::Dionis => writeln!(
        out,
        "type:{};proto:{};src_ip:{};src_port:{};dst_ip:{};dst_port:{};sid:{};msg:{};filename:{};",
        or_sentinel(&a.rule_type),
        or_sentinel(&a.protocol),
        or_sentinel(&a.src_addr),
        or_sentinel(&a.src_port),
        or_sentinel(&a.dst_addr),
        or_sentinel(&a.dst_port),
        sig.identity,
        or_sentinel(&a.message),
        or_sentinel(&a.origin_file),
      ),
    };
  }
}

fn or_sentinel(value: &str) -> &str {
  if value.is_empty() { SENTINEL } else { value }
}

/// Suricata's wildcard for an unbound address or port.
fn or_any(value: &str) -> &str {
  if value.is_empty() { "any" } else { value }
}

/// A fully rendered export, not yet written anywhere.
#[derive(Debug, Clone)]
pub struct Artifact {
  pub format:  ExportFormat,
  pub text:    String,
  pub records: usize,
}

/// Render every row, stopping at the first row error.
///
/// On error nothing is returned, so no partial artifact can escape.
pub fn render<I, E>(format: ExportFormat, rows: I) -> Result<Artifact>
where
  I: IntoIterator<Item = Result<Signature, E>>,
  E: std::error::Error + Send + Sync + 'static,
{
  let mut text = String::new();
  let mut records = 0usize;

  for row in rows {
    let sig = row.map_err(|e| Error::Render {
      format:   format.to_string(),
      rendered: records,
      source:   Box::new(e),
    })?;
    format.render_line(&sig, &mut text);
    records += 1;
  }

  Ok(Artifact { format, text, records })
}
