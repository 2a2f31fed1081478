//! `yacc` shim: runs the POSIX compatibility wrapper from the bundled payload.

use std::process::ExitCode;

use bison_bin_lib::runtime::{Locator, Tool, exec_tool};

fn main() -> ExitCode {
  match exec_tool(&Locator::from_env(), Tool::Yacc, std::env::args_os().skip(1)) {
    Ok(never) => match never {},
    Err(e) => {
      eprintln!("yacc: {}", e);
      ExitCode::FAILURE
    }
  }
}
