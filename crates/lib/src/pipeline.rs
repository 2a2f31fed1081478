//! The fetch → build → stage pipeline.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::archive::{self, ArchiveError};
use crate::config::{BuildConfig, BuildLayout};
use crate::consts::{CACHE_TARBALL_DIRNAME, PAYLOAD_ROOT_DIRNAME, STAGE_DIRNAME};
use crate::fetch::{self, FetchError};
use crate::native::{BuildEnv, BuildError, CommandRunner, NativeBuild, strip_binaries};
use crate::platform::PlatformError;
use crate::release::Release;
use crate::stage::{self, StageError, StageReport, VersionMetadata};

/// Any failure that aborts a build.
#[derive(Debug, Error)]
pub enum PipelineError {
  #[error(transparent)]
  Platform(#[from] PlatformError),

  #[error(transparent)]
  Fetch(#[from] FetchError),

  #[error(transparent)]
  Archive(#[from] ArchiveError),

  #[error(transparent)]
  Build(#[from] BuildError),

  #[error(transparent)]
  Stage(#[from] StageError),

  #[error("failed to prepare scratch directory '{path}': {source}")]
  Scratch {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
}

/// Result of a successful build.
#[derive(Debug, Clone, Serialize)]
pub struct BuildOutcome {
  pub bison: Release,
  pub m4: Option<Release>,
  pub package_version: String,
  pub stripped: usize,
  pub stage: StageReport,
}

/// Removes scratch directories when dropped, so cleanup also runs on early returns.
struct ScratchGuard {
  dirs: Vec<PathBuf>,
  keep: bool,
}

impl Drop for ScratchGuard {
  fn drop(&mut self) {
    if self.keep {
      info!(dirs = ?self.dirs, "keeping scratch directories");
      return;
    }
    for dir in &self.dirs {
      if !dir.exists() {
        continue;
      }
      match fs::remove_dir_all(dir) {
        Ok(()) => debug!(path = ?dir, "removed scratch directory"),
        Err(e) => warn!(path = ?dir, error = %e, "failed to remove scratch directory"),
      }
    }
  }
}

/// Run one complete build described by `config`.
///
/// Scratch directories (and a per-build source cache) are removed before
/// returning, whether the build succeeded or not.
pub fn run_build(config: &BuildConfig, runner: &mut impl CommandRunner) -> Result<BuildOutcome, PipelineError> {
  let layout = &config.layout;

  let mut scratch = vec![layout.stage_root.clone()];
  if config.ephemeral_cache {
    scratch.push(config.sources.cache_dir.clone());
  }
  let _guard = ScratchGuard {
    dirs: scratch,
    keep: config.keep_scratch,
  };

  prepare_stage_root(layout)?;

  let mut env = BuildEnv::inherit();
  config.toolchain.apply(&mut env);

  if let Some(m4) = &config.m4 {
    build_release(config, runner, m4, &layout.m4_prefix, &env, &config.m4_flags)?;
    let m4_bin = dunce::canonicalize(layout.m4_prefix.join("bin")).map_err(|source| PipelineError::Scratch {
      path: layout.m4_prefix.join("bin"),
      source,
    })?;
    env.prepend_path(&m4_bin);
    env.set("M4", m4_bin.join("m4"));
  }

  build_release(
    config,
    runner,
    &config.bison,
    &layout.install_prefix,
    &env,
    &config.bison_flags,
  )?;

  let stripped = if config.strip {
    match which::which_in("strip", env.get_os("PATH"), &layout.work_dir) {
      Ok(strip) => strip_binaries(runner, &strip, &layout.install_prefix, &env),
      Err(e) => {
        info!(error = %e, "strip not found, leaving binaries unstripped");
        0
      }
    }
  } else {
    0
  };

  let metadata = VersionMetadata {
    package_version: config.package_version.clone(),
    bison_version: config.bison.version.clone(),
    m4_version: config.m4.as_ref().map(|r| r.version.clone()),
  };
  let report = stage::stage_payload(&layout.install_prefix, &layout.payload, &metadata, config.mode)?;

  Ok(BuildOutcome {
    bison: config.bison.clone(),
    m4: config.m4.clone(),
    package_version: config.package_version.clone(),
    stripped,
    stage: report,
  })
}

fn prepare_stage_root(layout: &BuildLayout) -> Result<(), PipelineError> {
  let scratch_err = |source| PipelineError::Scratch {
    path: layout.stage_root.clone(),
    source,
  };
  if layout.stage_root.exists() {
    fs::remove_dir_all(&layout.stage_root).map_err(scratch_err)?;
  }
  fs::create_dir_all(&layout.work_dir).map_err(scratch_err)
}

fn build_release(
  config: &BuildConfig,
  runner: &mut impl CommandRunner,
  release: &Release,
  prefix: &Path,
  env: &BuildEnv,
  flags: &[String],
) -> Result<(), PipelineError> {
  info!(release = %release, "building release");
  let tarball = fetch::acquire(release, &config.mirror, &config.sources)?;
  let source_root = archive::extract(&tarball, &config.layout.work_dir)?;

  NativeBuild {
    project: &release.project,
    source_root: &source_root,
    prefix,
    env,
    parallelism: config.parallelism,
    extra_config: flags,
  }
  .run(runner)?;
  Ok(())
}

/// Remove everything a build left in `build_dir`: payload root, stage root and per-build cache.
///
/// Intended to run after the packaging layer has consumed the payload. Returns the removed paths.
pub fn clean_build_dir(build_dir: &Path) -> Vec<PathBuf> {
  let mut removed = Vec::new();
  for name in [PAYLOAD_ROOT_DIRNAME, STAGE_DIRNAME, CACHE_TARBALL_DIRNAME] {
    let path = build_dir.join(name);
    if !path.exists() {
      continue;
    }
    match fs::remove_dir_all(&path) {
      Ok(()) => removed.push(path),
      Err(e) => warn!(path = ?path, error = %e, "failed to remove build directory"),
    }
  }
  removed
}
