//! Child-process execution.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Command;

use tracing::{debug, info};

use super::BuildError;

/// One synchronous child-process call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
  pub program: String,
  pub args: Vec<String>,
  pub cwd: PathBuf,
  /// Complete environment of the child; nothing else is inherited.
  pub env: BTreeMap<OsString, OsString>,
}

impl Invocation {
  pub fn new(program: impl Into<String>, cwd: impl Into<PathBuf>, env: BTreeMap<OsString, OsString>) -> Self {
    Self {
      program: program.into(),
      args: Vec::new(),
      cwd: cwd.into(),
      env,
    }
  }

  pub fn arg(mut self, arg: impl Into<String>) -> Self {
    self.args.push(arg.into());
    self
  }

  pub fn args<I, S>(mut self, args: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.args.extend(args.into_iter().map(Into::into));
    self
  }

  /// Render the command for logs and error messages, quoting arguments with spaces.
  pub fn command_line(&self) -> String {
    std::iter::once(&self.program)
      .chain(&self.args)
      .map(|part| {
        if part.is_empty() || part.contains(char::is_whitespace) {
          format!("'{}'", part.replace('\'', r"'\''"))
        } else {
          part.clone()
        }
      })
      .collect::<Vec<_>>()
      .join(" ")
  }
}

/// Executes invocations. Implementations must block until the child exits.
pub trait CommandRunner {
  fn run(&mut self, invocation: &Invocation) -> Result<(), BuildError>;
}

/// Runs invocations as real child processes, inheriting stdout and stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
  fn run(&mut self, invocation: &Invocation) -> Result<(), BuildError> {
    let cmd = invocation.command_line();
    info!(cmd = %cmd, cwd = ?invocation.cwd, "run");

    let status = Command::new(&invocation.program)
      .args(&invocation.args)
      .current_dir(&invocation.cwd)
      .env_clear()
      .envs(&invocation.env)
      .status()
      .map_err(|source| BuildError::Spawn {
        cmd: cmd.clone(),
        source,
      })?;

    if !status.success() {
      return Err(BuildError::CommandFailed {
        cmd,
        code: status.code(),
      });
    }

    debug!(cmd = %cmd, "command finished");
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::native::BuildEnv;
  use tempfile::TempDir;

  #[test]
  fn command_line_quotes_arguments_with_spaces() {
    let invocation = Invocation::new("bash", "/tmp", BTreeMap::new()).args(["./configure", "--prefix=/opt/my tools"]);
    assert_eq!(invocation.command_line(), "bash ./configure '--prefix=/opt/my tools'");
  }

  #[cfg(unix)]
  #[test]
  fn system_runner_uses_cwd_and_env() {
    let temp = TempDir::new().unwrap();
    let mut env = BuildEnv::inherit();
    env.set("MARKER_NAME", "marker.txt");

    let invocation = Invocation::new("/bin/sh", temp.path(), env.to_map()).args(["-c", "echo ok > \"$MARKER_NAME\""]);
    SystemRunner.run(&invocation).unwrap();

    assert_eq!(std::fs::read_to_string(temp.path().join("marker.txt")).unwrap(), "ok\n");
  }

  #[cfg(unix)]
  #[test]
  fn system_runner_reports_exit_code() {
    let temp = TempDir::new().unwrap();
    let invocation = Invocation::new("/bin/sh", temp.path(), BuildEnv::inherit().to_map()).args(["-c", "exit 3"]);

    let err = SystemRunner.run(&invocation).unwrap_err();

    assert!(matches!(err, BuildError::CommandFailed { code: Some(3), .. }));
  }

  #[cfg(unix)]
  #[test]
  fn system_runner_passes_non_utf8_values_through() {
    use std::os::unix::ffi::OsStrExt;

    let temp = TempDir::new().unwrap();
    let mut env = BuildEnv::inherit();
    env.set("RAW_VALUE", std::ffi::OsStr::from_bytes(b"a\xffb"));

    let invocation = Invocation::new("/bin/sh", temp.path(), env.to_map()).args(["-c", "printf %s \"$RAW_VALUE\" > raw.txt"]);
    SystemRunner.run(&invocation).unwrap();

    assert_eq!(std::fs::read(temp.path().join("raw.txt")).unwrap(), b"a\xffb");
  }

  #[test]
  fn system_runner_reports_spawn_failure() {
    let temp = TempDir::new().unwrap();
    let invocation = Invocation::new("definitely-not-a-real-program-4242", temp.path(), BTreeMap::new());

    let err = SystemRunner.run(&invocation).unwrap_err();

    assert!(matches!(err, BuildError::Spawn { .. }));
  }
}
