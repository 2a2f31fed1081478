//! Source archive extraction.

use std::collections::BTreeSet;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::path::{Component, Path, PathBuf};

use flate2::read::GzDecoder;
use tar::Archive;
use thiserror::Error;
use tracing::{debug, info, warn};
use xz2::read::XzDecoder;

#[derive(Debug, Error)]
pub enum ArchiveError {
  #[error("unsupported archive format: {0}")]
  Unsupported(PathBuf),

  #[error("failed to reset extraction directory '{path}': {source}")]
  Reset {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to unpack '{archive}': {source}")]
  Unpack {
    archive: PathBuf,
    #[source]
    source: std::io::Error,
  },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Compression {
  None,
  Gzip,
  Xz,
}

impl Compression {
  fn detect(archive: &Path) -> Option<Self> {
    let name = archive.file_name()?.to_str()?;
    if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
      Some(Self::Gzip)
    } else if name.ends_with(".tar.xz") || name.ends_with(".txz") {
      Some(Self::Xz)
    } else if name.ends_with(".tar") {
      Some(Self::None)
    } else {
      None
    }
  }
}

/// Extract `archive` into `target` and return the effective source root.
///
/// `target` is removed first if it exists. When every member lives under a
/// single top-level directory that directory is returned, otherwise `target`
/// itself.
pub fn extract(archive: &Path, target: &Path) -> Result<PathBuf, ArchiveError> {
  let compression = Compression::detect(archive).ok_or_else(|| ArchiveError::Unsupported(archive.to_path_buf()))?;

  reset_dir(target)?;

  info!(archive = ?archive, target = ?target, "extracting archive");

  let unpack_err = |source| ArchiveError::Unpack {
    archive: archive.to_path_buf(),
    source,
  };
  let file = File::open(archive).map_err(unpack_err)?;
  let reader = BufReader::new(file);
  let tops = match compression {
    Compression::None => unpack_entries(reader, target),
    Compression::Gzip => unpack_entries(GzDecoder::new(reader), target),
    Compression::Xz => unpack_entries(XzDecoder::new(reader), target),
  }
  .map_err(unpack_err)?;

  Ok(source_root(target, &tops))
}

/// Remove `dir` if present and create it empty.
pub(crate) fn reset_dir(dir: &Path) -> Result<(), ArchiveError> {
  let reset_err = |source| ArchiveError::Reset {
    path: dir.to_path_buf(),
    source,
  };
  if dir.exists() {
    debug!(path = ?dir, "removing previous contents");
    fs::remove_dir_all(dir).map_err(reset_err)?;
  }
  fs::create_dir_all(dir).map_err(reset_err)
}

/// Unpack every member and collect the distinct first path components.
///
/// Extension headers (pax, GNU long names) describe other members and are
/// not members themselves.
fn unpack_entries<R: Read>(reader: R, target: &Path) -> std::io::Result<BTreeSet<OsString>> {
  let mut archive = Archive::new(reader);
  let mut tops = BTreeSet::new();

  for entry in archive.entries()? {
    let mut entry = entry?;
    let path = entry.path()?.into_owned();

    let kind = entry.header().entry_type();
    if kind.is_pax_global_extensions()
      || kind.is_pax_local_extensions()
      || kind.is_gnu_longname()
      || kind.is_gnu_longlink()
    {
      debug!(path = ?path, "skipping archive metadata header");
      continue;
    }

    if let Some(Component::Normal(first)) = path.components().find(|c| !matches!(c, Component::CurDir)) {
      tops.insert(first.to_os_string());
    }

    // unpack_in refuses members that would land outside `target`
    if !entry.unpack_in(target)? {
      warn!(path = ?path, "skipping archive member outside extraction directory");
    }
  }

  Ok(tops)
}

fn source_root(target: &Path, tops: &BTreeSet<OsString>) -> PathBuf {
  let mut roots = tops.iter().map(|name| target.join(name)).filter(|path| path.is_dir());
  match (roots.next(), roots.next(), tops.len()) {
    (Some(root), None, 1) => {
      debug!(root = ?root, "archive has a single top-level directory");
      root
    }
    _ => target.to_path_buf(),
  }
}
