use std::fmt;

use super::PlatformError;

/// CPU architecture variants a bundled build can target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arch {
  X86_64,
  Aarch64,
  X86,
}

impl Arch {
  /// Detect the current CPU architecture at runtime
  pub fn current() -> Result<Self, PlatformError> {
    Self::normalize(std::env::consts::ARCH)
  }

  /// Normalize a machine name (as reported by `uname -m` or the Rust target) to an `Arch`
  pub fn normalize(machine: &str) -> Result<Self, PlatformError> {
    match machine.to_ascii_lowercase().as_str() {
      "x86_64" | "amd64" => Ok(Self::X86_64),
      "aarch64" | "arm64" => Ok(Self::Aarch64),
      "x86" | "i386" | "i486" | "i586" | "i686" => Ok(Self::X86),
      _ => Err(PlatformError::UnsupportedArch(machine.to_string())),
    }
  }

  /// Returns the lowercase string identifier for this architecture
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::X86_64 => "x86_64",
      Self::Aarch64 => "aarch64",
      Self::X86 => "x86",
    }
  }
}

impl fmt::Display for Arch {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}
