//! Native build driver.
//!
//! Runs a release's own `configure` / `make` / `make install` sequence with an
//! explicit build environment. Every child process goes through a
//! [`CommandRunner`] so the sequence can be observed without spawning.

pub mod driver;
pub mod env;
pub mod runner;
pub mod toolchain;

use std::path::PathBuf;

use thiserror::Error;

pub use driver::{NativeBuild, strip_binaries};
pub use env::BuildEnv;
pub use runner::{CommandRunner, Invocation, SystemRunner};
pub use toolchain::{Toolchain, ToolchainKind};

/// Errors that can occur while building a release from source.
#[derive(Debug, Error)]
pub enum BuildError {
  /// The extracted source tree has no `configure` script.
  #[error("missing configure script for {project} (looked in {source_root:?})")]
  MissingConfigure { project: String, source_root: PathBuf },

  /// The install prefix could not be created or resolved.
  #[error("failed to prepare install prefix '{path}': {source}")]
  Prefix {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  /// The child process could not be started.
  #[error("failed to spawn `{cmd}`: {source}")]
  Spawn {
    cmd: String,
    #[source]
    source: std::io::Error,
  },

  /// Command exited unsuccessfully.
  #[error("command failed with exit code {code:?}: {cmd}")]
  CommandFailed { cmd: String, code: Option<i32> },
}
