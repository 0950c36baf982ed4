//! Atomic artifact output.
//!
//! Artifacts are written to a temporary file in the destination directory and
//! renamed over the final path, so readers see either the previous artifact
//! or the complete new one.

use std::{io::Write as _, path::Path};

use tempfile::NamedTempFile;

use crate::{
  error::Result,
  render::{Artifact, ExportFormat, render},
};

/// Replace the file at `path` with `contents` in one rename.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
  let dir = match path.parent() {
    Some(parent) if !parent.as_os_str().is_empty() => parent,
    _ => Path::new("."),
  };

  let mut temp = NamedTempFile::new_in(dir)?;
  temp.write_all(contents)?;
  temp.as_file().sync_all()?;
  temp.persist(path).map_err(|e| e.error)?;
  Ok(())
}

/// Render `rows` in `format` and write the result to `path`.
///
/// The file is only touched after every row rendered.
pub fn export_to<I, E>(path: &Path, format: ExportFormat, rows: I) -> Result<Artifact>
where
  I: IntoIterator<Item = Result<sigsync_core::signature::Signature, E>>,
  E: std::error::Error + Send + Sync + 'static,
{
  let artifact = render(format, rows)?;
  write_atomic(path, artifact.text.as_bytes())?;
  Ok(artifact)
}
