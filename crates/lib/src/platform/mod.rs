//! Host platform detection and per-user directories.

pub mod arch;
pub mod os;
pub mod paths;

use arch::Arch;
use os::Os;
use std::fmt;
use thiserror::Error;

/// Errors raised while identifying the host platform.
#[derive(Debug, Error)]
pub enum PlatformError {
  #[error("unsupported architecture: {0}")]
  UnsupportedArch(String),
}

/// Platform identifier combining architecture and OS (e.g., "aarch64-linux")
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Platform {
  pub arch: Arch,
  pub os: Os,
}

impl Platform {
  /// Create a new platform identifier
  pub fn new(arch: Arch, os: Os) -> Self {
    Self { arch, os }
  }

  /// Detect the current platform at runtime
  pub fn current() -> Result<Self, PlatformError> {
    Ok(Self {
      arch: Arch::current()?,
      os: Os::current(),
    })
  }

  /// Returns the platform triple string (e.g., "aarch64-darwin")
  pub fn triple(&self) -> String {
    format!("{}-{}", self.arch, self.os)
  }
}

impl fmt::Display for Platform {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.triple())
  }
}

/// Returns the platform triple for the current system (e.g., "x86_64-linux")
///
/// Returns `None` if the current architecture is not supported
pub fn platform_triple() -> Option<String> {
  Platform::current().ok().map(|p| p.triple())
}
