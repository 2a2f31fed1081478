//! Implementation of the `bison-bin version` command.

use anyhow::Result;
use clap::Args;

use bison_bin_lib::consts::{BISON, DEFAULT_BISON_FALLBACK, DEFAULT_MIRROR, ENV_BISON_VERSION, ENV_MIRROR};
use bison_bin_lib::release::resolve_version;

#[derive(Debug, Args)]
pub struct VersionArgs {
  /// GNU mirror base URL
  #[arg(long, env = ENV_MIRROR, default_value = DEFAULT_MIRROR)]
  pub mirror: String,

  /// Explicit version; printed as-is when set
  #[arg(long, env = ENV_BISON_VERSION)]
  pub bison_version: Option<String>,
}

/// Print the Bison version a build would use.
///
/// Never fails: an unreachable mirror yields the built-in fallback.
pub fn cmd_version(args: VersionArgs) -> Result<()> {
  let version = resolve_version(args.bison_version.as_deref(), &args.mirror, BISON, DEFAULT_BISON_FALLBACK);
  println!("{}", version);
  Ok(())
}
