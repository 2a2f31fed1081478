//! Implementation of the `bison-bin info` command.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use bison_bin_lib::platform::{paths, platform_triple};
use bison_bin_lib::runtime::{Locator, Tool};
use bison_bin_lib::stage::VersionMetadata;

use crate::output::{OutputFormat, Status, emit_json, field, status};

#[derive(Debug, Args)]
pub struct InfoArgs {
  /// Payload root to inspect instead of the installed one
  #[arg(long)]
  pub root: Option<PathBuf>,

  /// Output format
  #[arg(long, value_enum, default_value_t)]
  pub format: OutputFormat,
}

#[derive(Debug, Serialize)]
struct Info {
  platform: Option<String>,
  data_root: Option<PathBuf>,
  bison: Option<PathBuf>,
  bison_present: bool,
  bison_reports: Option<String>,
  yacc: Option<PathBuf>,
  metadata: Option<VersionMetadata>,
  source_cache: PathBuf,
}

pub fn cmd_info(args: InfoArgs) -> Result<()> {
  let mut locator = Locator::from_env();
  if let Some(root) = args.root {
    locator = locator.with_data_root(root);
  }

  let data_root = locator.data_root().ok();
  let bison = locator.binary_path(Tool::Bison).ok();
  let info = Info {
    platform: platform_triple(),
    bison_present: bison.as_deref().is_some_and(|p| p.is_file()),
    metadata: data_root.as_deref().and_then(|root| VersionMetadata::read(root).ok()),
    bison_reports: locator
      .run_version()
      .ok()
      .and_then(|out| out.lines().next().map(str::to_string)),
    yacc: locator.find_yacc_link(),
    source_cache: paths::source_cache_dir(),
    data_root,
    bison,
  };

  if args.format.is_json() {
    return emit_json(&info);
  }

  println!("System:");
  field("Platform", info.platform.as_deref().unwrap_or("unknown"));
  field("Source cache", info.source_cache.display());
  println!("Payload:");
  field("Root", &display_opt(&info.data_root));
  field("bison", &display_opt(&info.bison));
  field("yacc", &display_opt(&info.yacc));
  if let Some(reported) = &info.bison_reports {
    field("Reports", reported);
  }
  match &info.metadata {
    Some(meta) => {
      field("Package version", &meta.package_version);
      field("Bison version", &meta.bison_version);
      if let Some(m4) = &meta.m4_version {
        field("m4 version", m4);
      }
    }
    None => status(Status::Warn, "No version metadata found"),
  }
  if !info.bison_present {
    status(Status::Warn, "bison binary is missing; run `bison-bin build` or set BISON_BIN_ROOT");
  }
  Ok(())
}

fn display_opt(path: &Option<PathBuf>) -> String {
  path
    .as_ref()
    .map(|p| p.display().to_string())
    .unwrap_or_else(|| "-".to_string())
}
