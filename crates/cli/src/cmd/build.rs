//! Implementation of the `bison-bin build` command.
//!
//! Fetches the Bison release (and GNU m4 unless disabled), compiles both with
//! the host or musl toolchain and stages the result as a relocatable payload.

use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Args;
use clap::builder::FalseyValueParser;
use tracing::{debug, info};

use bison_bin_lib::config::{BuildConfig, BuildSettings};
use bison_bin_lib::consts::{
  DEFAULT_MIRROR, DEFAULT_PARALLELISM, ENV_BISON_VERSION, ENV_M4_VERSION, ENV_MIRROR, ENV_PACKAGE_VERSION,
  ENV_PARALLEL, ENV_STRIP, ENV_TOOLCHAIN,
};
use bison_bin_lib::native::{SystemRunner, ToolchainKind};
use bison_bin_lib::pipeline::{BuildOutcome, run_build};
use bison_bin_lib::platform::paths;
use bison_bin_lib::stage::PackageMode;

use crate::output::{OutputFormat, Status, emit_json, field, human_size, item, status};

#[derive(Debug, Args)]
pub struct BuildArgs {
  /// Directory holding scratch files, the per-build cache and the default payload
  #[arg(long, default_value = "build")]
  pub build_dir: PathBuf,

  /// Where to stage the payload (default: <build-dir>/bison_bin/_bison)
  #[arg(long)]
  pub payload: Option<PathBuf>,

  /// Directory checked for pre-downloaded release tarballs
  #[arg(long, default_value = "vendor")]
  pub vendor_dir: PathBuf,

  /// Persistent download cache; without it downloads are discarded after the build
  #[arg(long, conflicts_with = "user_cache")]
  pub cache_dir: Option<PathBuf>,

  /// Use the per-user source cache ($XDG_CACHE_HOME/bison-bin/sources)
  #[arg(long)]
  pub user_cache: bool,

  /// GNU mirror base URL
  #[arg(long, env = ENV_MIRROR, default_value = DEFAULT_MIRROR)]
  pub mirror: String,

  /// Bison release to build (default: newest on the mirror)
  #[arg(long, env = ENV_BISON_VERSION)]
  pub bison_version: Option<String>,

  /// GNU m4 release built alongside Bison
  #[arg(long, env = ENV_M4_VERSION)]
  pub m4_version: Option<String>,

  /// Version recorded in the payload metadata (default: the Bison version)
  #[arg(long, env = ENV_PACKAGE_VERSION)]
  pub package_version: Option<String>,

  /// Use the m4 already on PATH instead of building one
  #[arg(long)]
  pub no_m4: bool,

  /// Configure Bison without --enable-relocatable
  #[arg(long)]
  pub no_relocatable: bool,

  /// Parallel make jobs
  #[arg(short = 'j', long, env = ENV_PARALLEL, default_value_t = DEFAULT_PARALLELISM)]
  pub parallel: usize,

  /// Strip the installed binaries
  #[arg(long, env = ENV_STRIP, value_parser = FalseyValueParser::new())]
  pub strip: bool,

  /// Compiler selection: native or musl (zig cc)
  #[arg(long, env = ENV_TOOLCHAIN, default_value_t = ToolchainKind::Native)]
  pub toolchain: ToolchainKind,

  /// Packaging mode: payload or scripts
  #[arg(long, default_value_t = PackageMode::Payload)]
  pub mode: PackageMode,

  /// Keep the scratch directories after the build
  #[arg(long)]
  pub keep_scratch: bool,

  /// Output format
  #[arg(long, value_enum, default_value_t)]
  pub format: OutputFormat,
}

impl BuildArgs {
  fn into_settings(self, build_dir: PathBuf) -> BuildSettings {
    BuildSettings {
      build_dir,
      payload_dir: self.payload,
      vendor_dir: self.vendor_dir,
      cache_dir: self.cache_dir.or_else(|| self.user_cache.then(paths::source_cache_dir)),
      mirror: self.mirror,
      bison_version: self.bison_version,
      m4_version: self.m4_version,
      package_version: self.package_version,
      with_m4: !self.no_m4,
      relocatable: !self.no_relocatable,
      parallelism: self.parallel,
      strip: self.strip,
      toolchain: self.toolchain,
      mode: self.mode,
      keep_scratch: self.keep_scratch,
    }
  }
}

/// Execute the build command.
pub fn cmd_build(args: BuildArgs) -> Result<()> {
  let started = Instant::now();
  let format = args.format;

  fs::create_dir_all(&args.build_dir)
    .with_context(|| format!("Failed to create build directory {}", args.build_dir.display()))?;
  let build_dir = dunce::canonicalize(&args.build_dir)
    .with_context(|| format!("Failed to resolve build directory {}", args.build_dir.display()))?;

  info!(build_dir = ?build_dir, "starting build");

  let config = BuildConfig::resolve(args.into_settings(build_dir)).context("Failed to resolve build configuration")?;
  let outcome = run_build(&config, &mut SystemRunner).context("Build failed")?;
  debug!(elapsed = ?started.elapsed(), files = outcome.stage.generated_outputs.len(), "build finished");

  if format.is_json() {
    return emit_json(&outcome);
  }
  print_summary(&outcome, started.elapsed());
  Ok(())
}

fn print_summary(outcome: &BuildOutcome, elapsed: Duration) {
  let stage = &outcome.stage;
  let size: u64 = stage
    .generated_outputs
    .iter()
    .filter_map(|path| fs::symlink_metadata(path).ok())
    .filter(|meta| meta.is_file())
    .map(|meta| meta.len())
    .sum();

  let took = humantime::format_duration(Duration::from_secs(elapsed.as_secs()));
  status(Status::Done, format!("Bison {} staged in {}", outcome.bison.version, took));
  field("Payload", stage.payload.display());
  field("Package version", &outcome.package_version);
  if let Some(m4) = &outcome.m4 {
    field("m4", &m4.version);
  }
  field("Files", format!("{} ({})", stage.generated_outputs.len(), human_size(size)));
  if outcome.stripped > 0 {
    field("Stripped", outcome.stripped);
  }

  if !stage.executables.is_empty() {
    status(Status::Note, "Executables:");
    for exe in &stage.executables {
      item(exe);
    }
  }
  if !stage.data_files.is_empty() {
    status(Status::Note, format!("Data files: {}", stage.data_files.len()));
  }
}
