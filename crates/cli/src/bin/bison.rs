//! `bison` shim: replaces itself with the bundled GNU Bison.

use std::process::ExitCode;

use bison_bin_lib::runtime::{Locator, Tool, exec_tool};

fn main() -> ExitCode {
  match exec_tool(&Locator::from_env(), Tool::Bison, std::env::args_os().skip(1)) {
    Ok(never) => match never {},
    Err(e) => {
      eprintln!("bison: {}", e);
      ExitCode::FAILURE
    }
  }
}
