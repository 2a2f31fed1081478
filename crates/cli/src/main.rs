use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod cmd;
mod output;

use output::Status;

use cmd::{BuildArgs, CleanArgs, InfoArgs, VendorArgs, VersionArgs};

/// bison-bin - build and ship a self-contained GNU Bison
#[derive(Parser)]
#[command(name = "bison-bin")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Fetch, compile and stage Bison into a payload directory
  Build(BuildArgs),

  /// Download the release tarball into the vendor directory
  Vendor(VendorArgs),

  /// Print the Bison version a build would use
  Version(VersionArgs),

  /// Show where the bundled binaries are and what they contain
  Info(InfoArgs),

  /// Remove payload, scratch and per-build cache directories
  Clean(CleanArgs),
}

fn main() -> ExitCode {
  let cli = Cli::parse();

  let default_level = if cli.verbose { "debug" } else { "info" };
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  let result = match cli.command {
    Commands::Build(args) => cmd::cmd_build(args),
    Commands::Vendor(args) => cmd::cmd_vendor(args),
    Commands::Version(args) => cmd::cmd_version(args),
    Commands::Info(args) => cmd::cmd_info(args),
    Commands::Clean(args) => cmd::cmd_clean(args),
  };

  match result {
    Ok(()) => ExitCode::SUCCESS,
    Err(e) => {
      output::status(Status::Failed, format!("{:#}", e));
      ExitCode::FAILURE
    }
  }
}
