//! Executable-bit helpers.

use std::path::Path;

/// Whether `path` carries any execute permission bit.
#[cfg(unix)]
pub fn is_executable(path: &Path) -> std::io::Result<bool> {
  use std::os::unix::fs::PermissionsExt;
  Ok(std::fs::metadata(path)?.permissions().mode() & 0o111 != 0)
}

/// Everything is executable as far as the filesystem is concerned.
#[cfg(not(unix))]
pub fn is_executable(path: &Path) -> std::io::Result<bool> {
  std::fs::metadata(path).map(|_| true)
}

/// Add `u+x,g+x,o+x` unless all three are already set. Returns whether the mode changed.
#[cfg(unix)]
pub fn ensure_executable(path: &Path) -> std::io::Result<bool> {
  use std::os::unix::fs::PermissionsExt;
  let mut perms = std::fs::metadata(path)?.permissions();
  let mode = perms.mode();
  if mode & 0o111 == 0o111 {
    return Ok(false);
  }
  perms.set_mode(mode | 0o111);
  std::fs::set_permissions(path, perms)?;
  Ok(true)
}

#[cfg(not(unix))]
pub fn ensure_executable(path: &Path) -> std::io::Result<bool> {
  std::fs::metadata(path).map(|_| false)
}

#[cfg(all(test, unix))]
mod tests {
  use super::*;
  use std::os::unix::fs::PermissionsExt;
  use tempfile::TempDir;

  #[test]
  fn adds_missing_exec_bits_once() {
    let temp = TempDir::new().unwrap();
    let file = temp.path().join("tool");
    std::fs::write(&file, "#!/bin/sh\n").unwrap();
    std::fs::set_permissions(&file, std::fs::Permissions::from_mode(0o644)).unwrap();

    assert!(!is_executable(&file).unwrap());
    assert!(ensure_executable(&file).unwrap());
    assert!(!ensure_executable(&file).unwrap());

    let mode = std::fs::metadata(&file).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o755);
  }
}
