//! Implementation of the `bison-bin vendor` command.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use bison_bin_lib::consts::{
  BISON, DEFAULT_BISON_FALLBACK, DEFAULT_M4_VERSION, DEFAULT_MIRROR, ENV_BISON_VERSION, ENV_M4_VERSION, ENV_MIRROR,
  M4,
};
use bison_bin_lib::fetch::ensure_vendored;
use bison_bin_lib::release::{Release, resolve_version};

use crate::output::{Status, field, status};

#[derive(Debug, Args)]
pub struct VendorArgs {
  /// Directory the tarballs are written to
  #[arg(long, default_value = "vendor")]
  pub vendor_dir: PathBuf,

  /// GNU mirror base URL
  #[arg(long, env = ENV_MIRROR, default_value = DEFAULT_MIRROR)]
  pub mirror: String,

  /// Bison release to vendor (default: newest on the mirror)
  #[arg(long, env = ENV_BISON_VERSION)]
  pub bison_version: Option<String>,

  /// Also vendor the GNU m4 release
  #[arg(long)]
  pub with_m4: bool,

  #[arg(long, env = ENV_M4_VERSION, default_value = DEFAULT_M4_VERSION)]
  pub m4_version: String,
}

/// Execute the vendor command.
///
/// Existing tarballs are left alone, so running this twice downloads nothing.
pub fn cmd_vendor(args: VendorArgs) -> Result<()> {
  let version = resolve_version(args.bison_version.as_deref(), &args.mirror, BISON, DEFAULT_BISON_FALLBACK);
  let mut releases = vec![Release::new(BISON, version)];
  if args.with_m4 {
    releases.push(Release::new(M4, args.m4_version.clone()));
  }

  for release in &releases {
    let path = ensure_vendored(release, &args.mirror, &args.vendor_dir)
      .with_context(|| format!("Failed to vendor {}", release.tarball_name()))?;
    status(Status::Done, format!("Vendored {} {}", release.project, release.version));
    field("Path", path.display());
  }
  Ok(())
}
