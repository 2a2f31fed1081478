//! configure / make / make install.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::{BuildEnv, BuildError, CommandRunner, Invocation};

/// One autotools build of an extracted release.
#[derive(Debug, Clone)]
pub struct NativeBuild<'a> {
  pub project: &'a str,
  pub source_root: &'a Path,
  pub prefix: &'a Path,
  pub env: &'a BuildEnv,
  /// Passed to `make` as `-j<N>`.
  pub parallelism: usize,
  pub extra_config: &'a [String],
}

impl NativeBuild<'_> {
  /// Configure, compile and install into the prefix.
  ///
  /// Fails before spawning anything when the source root has no `configure`
  /// script. The first failing step aborts the rest; nothing is cleaned up.
  pub fn run(&self, runner: &mut impl CommandRunner) -> Result<(), BuildError> {
    if !self.source_root.join("configure").is_file() {
      return Err(BuildError::MissingConfigure {
        project: self.project.to_string(),
        source_root: self.source_root.to_path_buf(),
      });
    }

    let prefix = absolute_prefix(self.prefix)?;
    info!(project = self.project, prefix = ?prefix, "building from source");

    let env = self.env.to_map();
    let configure = Invocation::new("bash", self.source_root, env.clone())
      .arg("./configure")
      .arg(format!("--prefix={}", prefix.display()))
      .args(self.extra_config.iter().cloned());
    let make = Invocation::new("make", self.source_root, env.clone()).arg(format!("-j{}", self.parallelism.max(1)));
    let install = Invocation::new("make", self.source_root, env).arg("install");

    for step in [&configure, &make, &install] {
      runner.run(step)?;
    }

    info!(project = self.project, "install complete");
    Ok(())
  }
}

fn absolute_prefix(prefix: &Path) -> Result<PathBuf, BuildError> {
  let prefix_err = |source| BuildError::Prefix {
    path: prefix.to_path_buf(),
    source,
  };
  fs::create_dir_all(prefix).map_err(prefix_err)?;
  dunce::canonicalize(prefix).map_err(prefix_err)
}

/// Strip every regular file in `<prefix>/bin` with `strip`.
///
/// Failures are logged and ignored; an unstripped binary is still usable.
/// Returns how many files were stripped.
pub fn strip_binaries(runner: &mut impl CommandRunner, strip: &Path, prefix: &Path, env: &BuildEnv) -> usize {
  let bin_dir = prefix.join("bin");
  let entries = match fs::read_dir(&bin_dir) {
    Ok(entries) => entries,
    Err(e) => {
      warn!(path = ?bin_dir, error = %e, "cannot list binaries to strip");
      return 0;
    }
  };

  let mut files: Vec<PathBuf> = entries
    .filter_map(Result::ok)
    .map(|entry| entry.path())
    .filter(|path| path.symlink_metadata().map(|m| m.is_file()).unwrap_or(false))
    .collect();
  files.sort();

  let mut stripped = 0;
  for file in files {
    let invocation = Invocation::new(strip.display().to_string(), &bin_dir, env.to_map()).arg(file.display().to_string());
    match runner.run(&invocation) {
      Ok(()) => {
        debug!(path = ?file, "stripped");
        stripped += 1;
      }
      Err(e) => warn!(path = ?file, error = %e, "strip failed, keeping unstripped binary"),
    }
  }
  stripped
}
