//! Locating and invoking the bundled executables at runtime.
//!
//! The payload sits next to the installed shims as `_bison/`. Two environment
//! variables relocate it: `BISON_BIN_ROOT` replaces the payload root and
//! `BISON_BIN_PATH` points straight at a `bison` executable.

use std::convert::Infallible;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

use thiserror::Error;
use tracing::debug;

use crate::consts::{ENV_BINARY_PATH, ENV_DATA_ROOT, PAYLOAD_DIRNAME};
use crate::util::perms;

#[derive(Debug, Error)]
pub enum RuntimeError {
  #[error("bundled binary not found at {}; reinstall bison-bin", .0.display())]
  MissingBinary(PathBuf),

  #[error("bundled binary at {} is not executable", .0.display())]
  NotExecutable(PathBuf),

  #[error("cannot determine the install location of the running executable")]
  NoPackageRoot,

  #[error("failed to execute {path:?}: {source}")]
  Exec {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("{path:?} --version failed: {message}")]
  Version { path: PathBuf, message: String },
}

/// The executables a payload provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
  Bison,
  Yacc,
}

impl Tool {
  pub fn name(&self) -> &'static str {
    match self {
      Self::Bison => "bison",
      Self::Yacc => "yacc",
    }
  }
}

/// Resolves payload paths from overrides or the install location.
#[derive(Debug, Clone, Default)]
pub struct Locator {
  package_root: Option<PathBuf>,
  data_root_override: Option<PathBuf>,
  binary_override: Option<PathBuf>,
}

impl Locator {
  /// Locator rooted at `package_root`, without overrides.
  pub fn new(package_root: impl Into<PathBuf>) -> Self {
    Self {
      package_root: Some(package_root.into()),
      ..Self::default()
    }
  }

  /// Locator for the running executable, honoring `BISON_BIN_ROOT` and `BISON_BIN_PATH`.
  pub fn from_env() -> Self {
    let package_root = std::env::current_exe()
      .ok()
      .and_then(|exe| dunce::canonicalize(exe).ok())
      .and_then(|exe| exe.parent().map(Path::to_path_buf));
    Self {
      package_root,
      data_root_override: non_empty_var(ENV_DATA_ROOT),
      binary_override: non_empty_var(ENV_BINARY_PATH),
    }
  }

  pub fn with_data_root(mut self, root: impl Into<PathBuf>) -> Self {
    self.data_root_override = Some(root.into());
    self
  }

  pub fn with_binary(mut self, path: impl Into<PathBuf>) -> Self {
    self.binary_override = Some(path.into());
    self
  }

  /// Root directory of the bundled payload.
  pub fn data_root(&self) -> Result<PathBuf, RuntimeError> {
    if let Some(root) = &self.data_root_override {
      return Ok(root.clone());
    }
    self
      .package_root
      .as_ref()
      .map(|root| root.join(PAYLOAD_DIRNAME))
      .ok_or(RuntimeError::NoPackageRoot)
  }

  /// Path of `tool`, without checking that it exists.
  ///
  /// The binary override applies to `bison` only and is returned as given.
  pub fn binary_path(&self, tool: Tool) -> Result<PathBuf, RuntimeError> {
    if let (Tool::Bison, Some(path)) = (tool, &self.binary_override) {
      return Ok(path.clone());
    }
    Ok(self.data_root()?.join("bin").join(tool.name()))
  }

  /// The `yacc` compatibility script, if the payload has one.
  pub fn find_yacc_link(&self) -> Option<PathBuf> {
    self
      .binary_path(Tool::Yacc)
      .ok()
      .filter(|path| path.exists())
  }

  /// Resolve `tool` and make sure it can be executed.
  ///
  /// A missing executable bit is added once; if that does not help the
  /// binary is reported as not executable.
  pub fn ensure_runtime(&self, tool: Tool) -> Result<PathBuf, RuntimeError> {
    let path = self.binary_path(tool)?;
    if !path.is_file() {
      return Err(RuntimeError::MissingBinary(path));
    }

    if !perms::is_executable(&path).unwrap_or(false) {
      debug!(path = ?path, "adding missing executable bit");
      let fixed = perms::ensure_executable(&path).is_ok() && perms::is_executable(&path).unwrap_or(false);
      if !fixed {
        return Err(RuntimeError::NotExecutable(path));
      }
    }
    Ok(path)
  }

  /// Run `bison --version` and return its trimmed stdout.
  pub fn run_version(&self) -> Result<String, RuntimeError> {
    let path = self.ensure_runtime(Tool::Bison)?;
    let output = Command::new(&path)
      .arg("--version")
      .output()
      .map_err(|source| RuntimeError::Exec {
        path: path.clone(),
        source,
      })?;
    if !output.status.success() {
      return Err(RuntimeError::Version {
        path,
        message: format!("exit status {}", output.status),
      });
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
  }
}

fn non_empty_var(key: &str) -> Option<PathBuf> {
  std::env::var_os(key).filter(|v| !v.is_empty()).map(PathBuf::from)
}

/// Become `tool`, forwarding `args` and the inherited environment.
///
/// On Unix the current process image is replaced, so on success this never
/// returns. Elsewhere the tool runs as a child and this process exits with
/// its exit code.
pub fn exec_tool<I>(locator: &Locator, tool: Tool, args: I) -> Result<Infallible, RuntimeError>
where
  I: IntoIterator<Item = OsString>,
{
  let path = locator.ensure_runtime(tool)?;
  debug!(path = ?path, "exec");
  exec_path(&path, args)
}

#[cfg(unix)]
fn exec_path<I>(path: &Path, args: I) -> Result<Infallible, RuntimeError>
where
  I: IntoIterator<Item = OsString>,
{
  use std::os::unix::process::CommandExt;

  let mut command = Command::new(path);
  if let Some(name) = path.file_name() {
    command.arg0(name);
  }
  let source = command.args(args).exec();
  Err(RuntimeError::Exec {
    path: path.to_path_buf(),
    source,
  })
}

#[cfg(not(unix))]
fn exec_path<I>(path: &Path, args: I) -> Result<Infallible, RuntimeError>
where
  I: IntoIterator<Item = OsString>,
{
  let status = Command::new(path)
    .args(args)
    .status()
    .map_err(|source| RuntimeError::Exec {
      path: path.to_path_buf(),
      source,
    })?;
  std::process::exit(status.code().unwrap_or(1))
}

#[cfg(test)]
mod tests {
  use super::*;
  use serial_test::serial;
  use std::fs;
  use tempfile::TempDir;

  fn payload_with(root: &Path, tools: &[&str]) {
    let bin = root.join(PAYLOAD_DIRNAME).join("bin");
    fs::create_dir_all(&bin).unwrap();
    for tool in tools {
      fs::write(bin.join(tool), "#!/bin/sh\necho 'bison (GNU Bison) 3.8.2'\n").unwrap();
    }
  }

  #[test]
  fn default_lookup_is_relative_to_package_root() {
    let temp = TempDir::new().unwrap();
    let locator = Locator::new(temp.path());

    assert_eq!(locator.data_root().unwrap(), temp.path().join("_bison"));
    assert_eq!(
      locator.binary_path(Tool::Bison).unwrap(),
      temp.path().join("_bison/bin/bison")
    );
  }

  #[test]
  fn data_root_override_relocates_payload() {
    let locator = Locator::new("/pkg").with_data_root("/opt/bison");
    assert_eq!(locator.binary_path(Tool::Yacc).unwrap(), PathBuf::from("/opt/bison/bin/yacc"));
  }

  #[test]
  fn missing_override_names_that_path_without_fallback() {
    let temp = TempDir::new().unwrap();
    payload_with(temp.path(), &["bison"]);
    let missing = temp.path().join("nowhere/bison");
    let locator = Locator::new(temp.path()).with_binary(&missing);

    let err = locator.ensure_runtime(Tool::Bison).unwrap_err();

    assert!(matches!(err, RuntimeError::MissingBinary(ref p) if *p == missing));
    assert!(err.to_string().contains(&missing.display().to_string()));
  }

  #[test]
  fn binary_override_does_not_apply_to_yacc() {
    let locator = Locator::new("/pkg").with_binary("/custom/bison");
    assert_eq!(locator.binary_path(Tool::Yacc).unwrap(), PathBuf::from("/pkg/_bison/bin/yacc"));
  }

  #[test]
  fn missing_payload_is_reported() {
    let temp = TempDir::new().unwrap();
    let locator = Locator::new(temp.path());

    let err = locator.ensure_runtime(Tool::Bison).unwrap_err();

    assert!(matches!(err, RuntimeError::MissingBinary(_)));
  }

  #[test]
  fn no_package_root_without_override() {
    let locator = Locator::default();
    assert!(matches!(locator.data_root(), Err(RuntimeError::NoPackageRoot)));
  }

  #[test]
  fn find_yacc_link_only_when_present() {
    let temp = TempDir::new().unwrap();
    let locator = Locator::new(temp.path());
    assert_eq!(locator.find_yacc_link(), None);

    payload_with(temp.path(), &["yacc"]);
    assert_eq!(locator.find_yacc_link(), Some(temp.path().join("_bison/bin/yacc")));
  }

  #[cfg(unix)]
  #[test]
  fn ensure_runtime_repairs_exec_bit() {
    let temp = TempDir::new().unwrap();
    payload_with(temp.path(), &["bison"]);
    let locator = Locator::new(temp.path());

    let path = locator.ensure_runtime(Tool::Bison).unwrap();

    assert!(perms::is_executable(&path).unwrap());
  }

  #[cfg(unix)]
  #[test]
  fn run_version_reads_stdout() {
    let temp = TempDir::new().unwrap();
    payload_with(temp.path(), &["bison"]);

    let version = Locator::new(temp.path()).run_version().unwrap();

    assert_eq!(version, "bison (GNU Bison) 3.8.2");
  }

  #[test]
  #[serial]
  fn from_env_reads_overrides() {
    temp_env::with_vars(
      [(ENV_DATA_ROOT, Some("/relocated")), (ENV_BINARY_PATH, Some("/explicit/bison"))],
      || {
        let locator = Locator::from_env();
        assert_eq!(locator.data_root().unwrap(), PathBuf::from("/relocated"));
        assert_eq!(locator.binary_path(Tool::Bison).unwrap(), PathBuf::from("/explicit/bison"));
      },
    );
  }

  #[test]
  #[serial]
  fn from_env_ignores_empty_overrides() {
    temp_env::with_vars([(ENV_DATA_ROOT, Some("")), (ENV_BINARY_PATH, None::<&str>)], || {
      let locator = Locator::from_env();
      let root = locator.data_root().unwrap();
      assert!(root.ends_with(PAYLOAD_DIRNAME));
    });
  }
}
