//! Implementation of the `bison-bin clean` command.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use tracing::debug;

use bison_bin_lib::pipeline::clean_build_dir;

use crate::output::{Status, item, status};

#[derive(Debug, Args)]
pub struct CleanArgs {
  /// Build directory to clean
  #[arg(long, default_value = "build")]
  pub build_dir: PathBuf,
}

pub fn cmd_clean(args: CleanArgs) -> Result<()> {
  debug!(build_dir = ?args.build_dir, "cleaning build directory");
  let removed = clean_build_dir(&args.build_dir);
  if removed.is_empty() {
    status(Status::Note, "Nothing to clean");
    return Ok(());
  }

  for path in &removed {
    item(path);
  }
  let noun = if removed.len() == 1 { "directory" } else { "directories" };
  status(Status::Done, format!("Removed {} {}", removed.len(), noun));
  Ok(())
}
