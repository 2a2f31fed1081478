//! Payload staging.
//!
//! Copies an install prefix into the package payload, records version
//! metadata next to it and reports which files the packaging layer must ship.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::consts::METADATA_FILENAME;
use crate::util::perms;

#[derive(Debug, Error)]
pub enum StageError {
  #[error("install prefix does not exist: {0}")]
  MissingPrefix(PathBuf),

  #[error("failed to reset payload directory '{path}': {source}")]
  Reset {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to copy '{from}' to '{to}': {source}")]
  Copy {
    from: PathBuf,
    to: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to traverse directory {path}: {source}")]
  WalkDir {
    path: PathBuf,
    #[source]
    source: walkdir::Error,
  },

  #[error("failed to write metadata '{path}': {source}")]
  WriteMetadata {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to read metadata '{path}': {source}")]
  ReadMetadata {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("invalid metadata: {0}")]
  Json(#[from] serde_json::Error),

  #[error("failed to set permissions on {path}: {source}")]
  SetPermissions {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
}

/// How the payload is handed to the packaging layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageMode {
  /// Ship the payload only; shims locate the binaries inside it.
  #[default]
  Payload,
  /// Also install the raw executables into the installation's `bin` directory.
  Scripts,
}

impl fmt::Display for PackageMode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Self::Payload => "payload",
      Self::Scripts => "scripts",
    })
  }
}

impl FromStr for PackageMode {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_ascii_lowercase().as_str() {
      "payload" => Ok(Self::Payload),
      "scripts" => Ok(Self::Scripts),
      other => Err(format!("unknown package mode '{other}' (expected 'payload' or 'scripts')")),
    }
  }
}

/// Contents of `version.json` in the payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionMetadata {
  pub package_version: String,
  pub bison_version: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub m4_version: Option<String>,
}

impl VersionMetadata {
  /// Read the metadata file from a payload root.
  pub fn read(payload: &Path) -> Result<Self, StageError> {
    let path = payload.join(METADATA_FILENAME);
    let content = fs::read_to_string(&path).map_err(|source| StageError::ReadMetadata { path, source })?;
    Ok(serde_json::from_str(&content)?)
  }

  fn write(&self, payload: &Path) -> Result<PathBuf, StageError> {
    let path = payload.join(METADATA_FILENAME);
    let json = serde_json::to_string_pretty(self)?;
    fs::write(&path, json + "\n").map_err(|source| StageError::WriteMetadata {
      path: path.clone(),
      source,
    })?;
    Ok(path)
  }
}

/// What staging produced.
#[derive(Debug, Clone, Serialize)]
pub struct StageReport {
  pub payload: PathBuf,
  pub metadata: PathBuf,
  /// Every regular file in the payload, metadata included.
  pub generated_outputs: Vec<PathBuf>,
  /// Regular files directly under `<payload>/bin`.
  pub executables: Vec<PathBuf>,
  /// Files to install into the installation's `bin` (only in [`PackageMode::Scripts`]).
  pub data_files: Vec<PathBuf>,
}

/// Copy `prefix` into `payload` (replacing it), write metadata and mark executables.
pub fn stage_payload(
  prefix: &Path,
  payload: &Path,
  metadata: &VersionMetadata,
  mode: PackageMode,
) -> Result<StageReport, StageError> {
  if !prefix.is_dir() {
    return Err(StageError::MissingPrefix(prefix.to_path_buf()));
  }

  info!(prefix = ?prefix, payload = ?payload, "staging payload");
  reset_dir(payload)?;
  let (metadata_path, executables, generated_outputs) = match fill_payload(prefix, payload, metadata) {
    Ok(filled) => filled,
    Err(e) => {
      discard_payload(payload);
      return Err(e);
    }
  };

  let data_files = match mode {
    PackageMode::Payload => Vec::new(),
    PackageMode::Scripts => executables.clone(),
  };

  info!(
    files = generated_outputs.len(),
    executables = executables.len(),
    mode = %mode,
    "payload staged"
  );

  Ok(StageReport {
    payload: payload.to_path_buf(),
    metadata: metadata_path,
    generated_outputs,
    executables,
    data_files,
  })
}

type Filled = (PathBuf, Vec<PathBuf>, Vec<PathBuf>);

fn fill_payload(prefix: &Path, payload: &Path, metadata: &VersionMetadata) -> Result<Filled, StageError> {
  copy_tree(prefix, payload)?;
  let metadata_path = metadata.write(payload)?;
  let executables = mark_executables(&payload.join("bin"))?;
  let generated_outputs = regular_files(payload)?;
  Ok((metadata_path, executables, generated_outputs))
}

/// Remove a partially staged payload so consumers never see it.
fn discard_payload(payload: &Path) {
  match fs::remove_dir_all(payload) {
    Ok(()) => debug!(path = ?payload, "removed partial payload"),
    Err(e) => warn!(path = ?payload, error = %e, "failed to remove partial payload"),
  }
}

fn reset_dir(dir: &Path) -> Result<(), StageError> {
  let reset_err = |source| StageError::Reset {
    path: dir.to_path_buf(),
    source,
  };
  if dir.exists() {
    fs::remove_dir_all(dir).map_err(reset_err)?;
  }
  fs::create_dir_all(dir).map_err(reset_err)
}

/// Recursively copy `src` into the existing directory `dest`, keeping symlinks as symlinks.
fn copy_tree(src: &Path, dest: &Path) -> Result<(), StageError> {
  for entry in WalkDir::new(src).min_depth(1).follow_links(false) {
    let entry = entry.map_err(|source| StageError::WalkDir {
      path: src.to_path_buf(),
      source,
    })?;
    let from = entry.path();
    let Ok(relative) = from.strip_prefix(src) else {
      continue;
    };
    let to = dest.join(relative);
    let copy_err = |source| StageError::Copy {
      from: from.to_path_buf(),
      to: to.clone(),
      source,
    };

    let file_type = entry.file_type();
    if file_type.is_dir() {
      fs::create_dir_all(&to).map_err(copy_err)?;
    } else if file_type.is_symlink() {
      copy_symlink(from, &to).map_err(copy_err)?;
    } else {
      fs::copy(from, &to).map_err(copy_err)?;
    }
  }
  Ok(())
}

#[cfg(unix)]
fn copy_symlink(from: &Path, to: &Path) -> std::io::Result<()> {
  let target = fs::read_link(from)?;
  std::os::unix::fs::symlink(target, to)
}

#[cfg(not(unix))]
fn copy_symlink(from: &Path, to: &Path) -> std::io::Result<()> {
  fs::copy(from, to).map(|_| ())
}

/// Ensure every regular file directly in `bin_dir` is executable.
///
/// Returns the files, sorted. A missing `bin_dir` yields an empty list.
pub fn mark_executables(bin_dir: &Path) -> Result<Vec<PathBuf>, StageError> {
  if !bin_dir.is_dir() {
    warn!(path = ?bin_dir, "payload has no bin directory");
    return Ok(Vec::new());
  }

  let mut executables = Vec::new();
  for entry in WalkDir::new(bin_dir).min_depth(1).max_depth(1).sort_by_file_name() {
    let entry = entry.map_err(|source| StageError::WalkDir {
      path: bin_dir.to_path_buf(),
      source,
    })?;
    if !entry.file_type().is_file() {
      continue;
    }

    let path = entry.into_path();
    let changed = perms::ensure_executable(&path).map_err(|source| StageError::SetPermissions {
      path: path.clone(),
      source,
    })?;
    if changed {
      debug!(path = ?path, "marked executable");
    }
    executables.push(path);
  }
  Ok(executables)
}

fn regular_files(root: &Path) -> Result<Vec<PathBuf>, StageError> {
  let mut files = Vec::new();
  for entry in WalkDir::new(root).sort_by_file_name() {
    let entry = entry.map_err(|source| StageError::WalkDir {
      path: root.to_path_buf(),
      source,
    })?;
    if entry.file_type().is_file() {
      files.push(entry.into_path());
    }
  }
  Ok(files)
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::TempDir;

  #[test]
  fn failed_staging_leaves_no_payload() {
    let temp = TempDir::new().unwrap();
    let prefix = temp.path().join("install");
    fs::create_dir_all(prefix.join("bin")).unwrap();
    fs::write(prefix.join("bin/bison"), "elf").unwrap();
    // a directory where the metadata file must go makes the write fail after the copy
    fs::create_dir_all(prefix.join(METADATA_FILENAME)).unwrap();
    let payload = temp.path().join("out/_bison");
    fs::create_dir_all(&payload).unwrap();
    fs::write(payload.join("old.txt"), "previous build").unwrap();

    let err = stage_payload(&prefix, &payload, &metadata(), PackageMode::Payload).unwrap_err();

    assert!(matches!(err, StageError::WriteMetadata { .. }));
    assert!(!payload.exists());
  }

  fn metadata() -> VersionMetadata {
    VersionMetadata {
      package_version: "3.8.2".to_string(),
      bison_version: "3.8.2".to_string(),
      m4_version: Some("1.4.19".to_string()),
    }
  }

  fn fake_prefix(root: &Path) -> PathBuf {
    let prefix = root.join("install");
    fs::create_dir_all(prefix.join("bin")).unwrap();
    fs::create_dir_all(prefix.join("share/bison/skeletons")).unwrap();
    fs::write(prefix.join("bin/bison"), "elf").unwrap();
    fs::write(prefix.join("bin/yacc"), "#!/bin/sh\nexec bison -y \"$@\"\n").unwrap();
    fs::write(prefix.join("share/bison/skeletons/c.m4"), "m4").unwrap();
    prefix
  }

  #[test]
  fn copies_prefix_and_writes_metadata() {
    let temp = TempDir::new().unwrap();
    let prefix = fake_prefix(temp.path());
    let payload = temp.path().join("bison_bin/_bison");

    let report = stage_payload(&prefix, &payload, &metadata(), PackageMode::Payload).unwrap();

    assert!(payload.join("bin/bison").is_file());
    assert!(payload.join("share/bison/skeletons/c.m4").is_file());
    assert_eq!(VersionMetadata::read(&payload).unwrap(), metadata());
    assert!(report.generated_outputs.contains(&payload.join(METADATA_FILENAME)));
    assert!(report.generated_outputs.contains(&payload.join("share/bison/skeletons/c.m4")));
    assert_eq!(report.generated_outputs.len(), 4);
    assert!(report.data_files.is_empty());
  }

  #[test]
  fn metadata_omits_missing_m4_version() {
    let temp = TempDir::new().unwrap();
    let prefix = fake_prefix(temp.path());
    let payload = temp.path().join("payload");
    let metadata = VersionMetadata {
      m4_version: None,
      ..metadata()
    };

    stage_payload(&prefix, &payload, &metadata, PackageMode::Payload).unwrap();

    let raw = fs::read_to_string(payload.join(METADATA_FILENAME)).unwrap();
    assert!(!raw.contains("m4_version"));
    assert!(raw.contains("\"bison_version\": \"3.8.2\""));
  }

  #[test]
  fn restaging_removes_previous_payload() {
    let temp = TempDir::new().unwrap();
    let prefix = fake_prefix(temp.path());
    let payload = temp.path().join("payload");
    fs::create_dir_all(&payload).unwrap();
    fs::write(payload.join("a.txt"), "stale").unwrap();

    stage_payload(&prefix, &payload, &metadata(), PackageMode::Payload).unwrap();

    assert!(!payload.join("a.txt").exists());
  }

  #[test]
  fn scripts_mode_reports_bin_files_as_data_files() {
    let temp = TempDir::new().unwrap();
    let prefix = fake_prefix(temp.path());
    let payload = temp.path().join("payload");

    let report = stage_payload(&prefix, &payload, &metadata(), PackageMode::Scripts).unwrap();

    assert_eq!(report.data_files, vec![payload.join("bin/bison"), payload.join("bin/yacc")]);
  }

  #[test]
  fn missing_prefix_is_an_error() {
    let temp = TempDir::new().unwrap();
    let err = stage_payload(
      &temp.path().join("nope"),
      &temp.path().join("payload"),
      &metadata(),
      PackageMode::Payload,
    )
    .unwrap_err();
    assert!(matches!(err, StageError::MissingPrefix(_)));
  }

  #[cfg(unix)]
  #[test]
  fn bin_files_become_executable() {
    use std::os::unix::fs::PermissionsExt;

    let temp = TempDir::new().unwrap();
    let prefix = fake_prefix(temp.path());
    let payload = temp.path().join("payload");

    let report = stage_payload(&prefix, &payload, &metadata(), PackageMode::Payload).unwrap();

    assert_eq!(report.executables.len(), 2);
    for exe in &report.executables {
      let mode = fs::metadata(exe).unwrap().permissions().mode();
      assert_eq!(mode & 0o111, 0o111, "{} not executable", exe.display());
    }
    let skeleton = fs::metadata(payload.join("share/bison/skeletons/c.m4")).unwrap();
    assert_eq!(skeleton.permissions().mode() & 0o111, 0);
  }

  #[cfg(unix)]
  #[test]
  fn symlinks_are_preserved() {
    let temp = TempDir::new().unwrap();
    let prefix = fake_prefix(temp.path());
    std::os::unix::fs::symlink("bison", prefix.join("bin/bison-alias")).unwrap();
    let payload = temp.path().join("payload");

    let report = stage_payload(&prefix, &payload, &metadata(), PackageMode::Payload).unwrap();

    let link = payload.join("bin/bison-alias");
    assert!(link.symlink_metadata().unwrap().file_type().is_symlink());
    assert_eq!(fs::read_link(&link).unwrap(), PathBuf::from("bison"));
    assert!(!report.executables.contains(&link));
  }

  #[test]
  fn mark_executables_without_bin_dir() {
    let temp = TempDir::new().unwrap();
    assert!(mark_executables(&temp.path().join("bin")).unwrap().is_empty());
  }
}
