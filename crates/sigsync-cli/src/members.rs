//! Discovery of the member files of an unpacked rule archive.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{Error, Result};

/// One file of a source, named relative to the source root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
  /// `/`-separated path below the root; the file name for a single-file root.
  pub name: String,
  pub path: PathBuf,
}

/// List every regular file below `root`, sorted by name.
///
/// A `root` that is itself a file yields one member. Entries that cannot be
/// visited are returned as errors in place, so one bad directory never hides
/// its siblings.
pub fn discover(root: &Path) -> Result<Vec<Result<Member>>> {
  let meta = std::fs::metadata(root).map_err(|source| Error::Io {
    path: root.to_path_buf(),
    source,
  })?;

  if meta.is_file() {
    let name = root
      .file_name()
      .map(|n| n.to_string_lossy().into_owned())
      .unwrap_or_else(|| root.to_string_lossy().into_owned());
    return Ok(vec![Ok(Member { name, path: root.to_path_buf() })]);
  }

  let members = WalkDir::new(root)
    .min_depth(1)
    .sort_by_file_name()
    .into_iter()
    .filter_map(|entry| match entry {
      Ok(entry) if entry.file_type().is_file() => Some(Ok(Member {
        name: relative_name(root, entry.path()),
        path: entry.into_path(),
      })),
      Ok(_) => None,
      Err(err) => {
        let path = err.path().unwrap_or(root).to_path_buf();
        Some(Err(Error::Io { path, source: err.into() }))
      }
    })
    .collect();

  Ok(members)
}

fn relative_name(root: &Path, path: &Path) -> String {
  let rel = path.strip_prefix(root).unwrap_or(path);
  rel
    .components()
    .map(|c| c.as_os_str().to_string_lossy())
    .collect::<Vec<_>>()
    .join("/")
}
