//! Compiler toolchain selection.
//!
//! The same pipeline builds natively or against a statically-linked musl libc.
//! The musl variant only overrides `CC`, and only on Linux hosts.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::BuildEnv;
use crate::platform::PlatformError;
use crate::platform::arch::Arch;
use crate::platform::os::Os;

/// Which compiler setup a build uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolchainKind {
  /// Whatever `CC` the environment already provides.
  #[default]
  Native,
  /// `zig cc` targeting `<arch>-linux-musl`.
  Musl,
}

impl ToolchainKind {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Native => "native",
      Self::Musl => "musl",
    }
  }
}

impl fmt::Display for ToolchainKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for ToolchainKind {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_ascii_lowercase().as_str() {
      "native" | "" => Ok(Self::Native),
      "musl" => Ok(Self::Musl),
      other => Err(format!("unknown toolchain '{other}' (expected 'native' or 'musl')")),
    }
  }
}

/// The compiler override selected once for a build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toolchain {
  cc: Option<String>,
}

impl Toolchain {
  /// No overrides.
  pub fn native() -> Self {
    Self { cc: None }
  }

  /// Select the toolchain for a host described by its machine name and OS.
  ///
  /// For [`ToolchainKind::Musl`] the machine name must normalize to a
  /// supported [`Arch`]; on non-Linux hosts the result carries no override.
  pub fn select(kind: ToolchainKind, machine: &str, os: Os) -> Result<Self, PlatformError> {
    match kind {
      ToolchainKind::Native => Ok(Self::native()),
      ToolchainKind::Musl => {
        let arch = Arch::normalize(machine)?;
        if os != Os::Linux {
          debug!(os = %os, "musl toolchain only applies on linux, passing environment through");
          return Ok(Self::native());
        }
        Ok(Self {
          cc: Some(format!("zig cc -target {}", musl_target(arch))),
        })
      }
    }
  }

  /// Select for the running host.
  pub fn for_host(kind: ToolchainKind) -> Result<Self, PlatformError> {
    Self::select(kind, std::env::consts::ARCH, Os::current())
  }

  pub fn cc(&self) -> Option<&str> {
    self.cc.as_deref()
  }

  /// Overlay the compiler override, if any, onto `env`.
  pub fn apply(&self, env: &mut BuildEnv) {
    if let Some(cc) = &self.cc {
      info!(cc = %cc, "using cross compiler");
      env.set("CC", cc.clone());
    }
  }
}

fn musl_target(arch: Arch) -> String {
  format!("{}-linux-musl", arch.as_str())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn musl_on_linux_overrides_cc_per_arch() {
    let cases = [
      ("x86_64", "zig cc -target x86_64-linux-musl"),
      ("amd64", "zig cc -target x86_64-linux-musl"),
      ("arm64", "zig cc -target aarch64-linux-musl"),
      ("i686", "zig cc -target x86-linux-musl"),
    ];
    for (machine, expected) in cases {
      let toolchain = Toolchain::select(ToolchainKind::Musl, machine, Os::Linux).unwrap();
      assert_eq!(toolchain.cc(), Some(expected), "machine {machine}");
    }
  }

  #[test]
  fn musl_elsewhere_passes_environment_through() {
    let toolchain = Toolchain::select(ToolchainKind::Musl, "arm64", Os::MacOs).unwrap();
    let mut env = BuildEnv::from_vars([("CC", "cc")]);

    toolchain.apply(&mut env);

    assert_eq!(env.get("CC"), Some("cc"));
  }

  #[test]
  fn musl_rejects_unsupported_arch() {
    let err = Toolchain::select(ToolchainKind::Musl, "sparc64", Os::Linux).unwrap_err();
    assert!(matches!(err, PlatformError::UnsupportedArch(_)));
  }

  #[test]
  fn native_never_touches_cc() {
    let toolchain = Toolchain::select(ToolchainKind::Native, "sparc64", Os::Linux).unwrap();
    let mut env = BuildEnv::default();

    toolchain.apply(&mut env);

    assert_eq!(env.get("CC"), None);
  }

  #[test]
  fn apply_sets_cc() {
    let toolchain = Toolchain::select(ToolchainKind::Musl, "x86_64", Os::Linux).unwrap();
    let mut env = BuildEnv::default();

    toolchain.apply(&mut env);

    assert_eq!(env.get("CC"), Some("zig cc -target x86_64-linux-musl"));
  }

  #[test]
  fn parses_kind() {
    assert_eq!("musl".parse::<ToolchainKind>().unwrap(), ToolchainKind::Musl);
    assert_eq!("Native".parse::<ToolchainKind>().unwrap(), ToolchainKind::Native);
    assert!("gnu".parse::<ToolchainKind>().is_err());
  }
}
