//! Build configuration.
//!
//! [`BuildSettings`] holds the raw knobs (CLI flags and environment
//! overrides). [`BuildConfig::resolve`] turns them into the immutable value
//! every pipeline stage receives: versions are resolved and the toolchain is
//! selected exactly once, up front.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

use crate::consts::{
  BISON, CACHE_TARBALL_DIRNAME, DEFAULT_BISON_FALLBACK, DEFAULT_M4_VERSION, DEFAULT_MIRROR, DEFAULT_PARALLELISM, M4,
  PAYLOAD_DIRNAME, PAYLOAD_ROOT_DIRNAME, STAGE_DIRNAME,
};
use crate::fetch::SourceLocations;
use crate::native::{Toolchain, ToolchainKind};
use crate::platform::PlatformError;
use crate::release::{Release, resolve_version};
use crate::stage::PackageMode;

/// Raw build options before resolution.
#[derive(Debug, Clone)]
pub struct BuildSettings {
  /// Root of all per-build directories. Should be absolute.
  pub build_dir: PathBuf,
  /// Payload location; defaults to `<build_dir>/bison_bin/_bison`.
  pub payload_dir: Option<PathBuf>,
  pub vendor_dir: PathBuf,
  /// Persistent source cache. `None` uses a per-build cache that is removed afterwards.
  pub cache_dir: Option<PathBuf>,
  pub mirror: String,
  pub bison_version: Option<String>,
  pub m4_version: Option<String>,
  pub package_version: Option<String>,
  /// Build GNU m4 first and put it on the Bison build's `PATH`.
  pub with_m4: bool,
  pub relocatable: bool,
  pub parallelism: usize,
  pub strip: bool,
  pub toolchain: ToolchainKind,
  pub mode: PackageMode,
  /// Leave scratch directories behind for inspection.
  pub keep_scratch: bool,
}

impl Default for BuildSettings {
  fn default() -> Self {
    Self {
      build_dir: PathBuf::from("build"),
      payload_dir: None,
      vendor_dir: PathBuf::from("vendor"),
      cache_dir: None,
      mirror: DEFAULT_MIRROR.to_string(),
      bison_version: None,
      m4_version: None,
      package_version: None,
      with_m4: true,
      relocatable: true,
      parallelism: DEFAULT_PARALLELISM,
      strip: false,
      toolchain: ToolchainKind::Native,
      mode: PackageMode::Payload,
      keep_scratch: false,
    }
  }
}

/// Directory layout of one build below the build dir.
#[derive(Debug, Clone, Serialize)]
pub struct BuildLayout {
  pub build_dir: PathBuf,
  /// Scratch root; everything below is removed after the build.
  pub stage_root: PathBuf,
  pub work_dir: PathBuf,
  pub install_prefix: PathBuf,
  pub m4_prefix: PathBuf,
  pub payload: PathBuf,
}

impl BuildLayout {
  pub fn new(build_dir: &Path, payload: Option<&Path>) -> Self {
    let stage_root = build_dir.join(STAGE_DIRNAME);
    Self {
      build_dir: build_dir.to_path_buf(),
      work_dir: stage_root.join("work"),
      install_prefix: stage_root.join("install"),
      m4_prefix: stage_root.join("m4"),
      stage_root,
      payload: payload
        .map(Path::to_path_buf)
        .unwrap_or_else(|| build_dir.join(PAYLOAD_ROOT_DIRNAME).join(PAYLOAD_DIRNAME)),
    }
  }

  /// Source cache used when no persistent cache is configured.
  pub fn ephemeral_cache(&self) -> PathBuf {
    self.build_dir.join(CACHE_TARBALL_DIRNAME)
  }
}

/// Fully resolved, immutable configuration of one build.
#[derive(Debug, Clone)]
pub struct BuildConfig {
  pub bison: Release,
  pub m4: Option<Release>,
  pub package_version: String,
  pub mirror: String,
  pub layout: BuildLayout,
  pub sources: SourceLocations,
  /// True when `sources.cache_dir` exists only for this build.
  pub ephemeral_cache: bool,
  pub parallelism: usize,
  pub strip: bool,
  pub toolchain: Toolchain,
  pub mode: PackageMode,
  pub keep_scratch: bool,
  pub bison_flags: Vec<String>,
  pub m4_flags: Vec<String>,
}

impl BuildConfig {
  /// Resolve versions and the toolchain. May hit the network for version discovery.
  pub fn resolve(settings: BuildSettings) -> Result<Self, PlatformError> {
    let toolchain = Toolchain::for_host(settings.toolchain)?;

    let bison_version = resolve_version(
      settings.bison_version.as_deref(),
      &settings.mirror,
      BISON,
      DEFAULT_BISON_FALLBACK,
    );
    let m4 = settings.with_m4.then(|| {
      let version = settings
        .m4_version
        .clone()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| DEFAULT_M4_VERSION.to_string());
      Release::new(M4, version)
    });
    let package_version = settings
      .package_version
      .clone()
      .filter(|v| !v.is_empty())
      .unwrap_or_else(|| bison_version.clone());

    let layout = BuildLayout::new(&settings.build_dir, settings.payload_dir.as_deref());
    let ephemeral_cache = settings.cache_dir.is_none();
    let sources = SourceLocations {
      vendor_dir: settings.vendor_dir.clone(),
      cache_dir: settings.cache_dir.clone().unwrap_or_else(|| layout.ephemeral_cache()),
    };

    let mut bison_flags = vec!["--disable-nls".to_string()];
    if settings.relocatable {
      bison_flags.push("--enable-relocatable".to_string());
    }
    let m4_flags = ["--disable-dependency-tracking", "--enable-static", "--enable-shared"]
      .map(String::from)
      .to_vec();

    let config = Self {
      bison: Release::new(BISON, bison_version),
      m4,
      package_version,
      mirror: settings.mirror,
      layout,
      sources,
      ephemeral_cache,
      parallelism: settings.parallelism.max(1),
      strip: settings.strip,
      toolchain,
      mode: settings.mode,
      keep_scratch: settings.keep_scratch,
      bison_flags,
      m4_flags,
    };

    info!(
      bison = %config.bison.version,
      m4 = config.m4.as_ref().map(|r| r.version.as_str()).unwrap_or("-"),
      package = %config.package_version,
      toolchain = config.toolchain.cc().unwrap_or("native"),
      "build configuration resolved"
    );
    Ok(config)
  }
}
