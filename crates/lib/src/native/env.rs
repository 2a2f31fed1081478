//! Build environment construction.

use std::collections::BTreeMap;
use std::ffi::{OsStr, OsString};
use std::path::Path;

/// Environment passed to every child process of one build.
///
/// Starts from the inherited process environment, byte for byte; overlays
/// such as a cross-compiler `CC` or a companion tool on `PATH` are applied
/// on top.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildEnv {
  vars: BTreeMap<OsString, OsString>,
}

impl BuildEnv {
  /// Snapshot the current process environment, including non-UTF-8 entries.
  pub fn inherit() -> Self {
    Self {
      vars: std::env::vars_os().collect(),
    }
  }

  pub fn from_vars<I, K, V>(vars: I) -> Self
  where
    I: IntoIterator<Item = (K, V)>,
    K: Into<OsString>,
    V: Into<OsString>,
  {
    Self {
      vars: vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
    }
  }

  /// Value of `key` as UTF-8; `None` when unset or not valid UTF-8.
  pub fn get(&self, key: &str) -> Option<&str> {
    self.get_os(key).and_then(OsStr::to_str)
  }

  /// Raw value of `key`.
  pub fn get_os(&self, key: &str) -> Option<&OsStr> {
    self.vars.get(OsStr::new(key)).map(OsString::as_os_str)
  }

  pub fn set(&mut self, key: impl Into<OsString>, value: impl Into<OsString>) {
    self.vars.insert(key.into(), value.into());
  }

  /// Put `dir` in front of `PATH`.
  pub fn prepend_path(&mut self, dir: &Path) {
    let mut path = dir.as_os_str().to_os_string();
    if let Some(existing) = self.get_os("PATH").filter(|p| !p.is_empty()) {
      path.push(path_separator());
      path.push(existing);
    }
    self.set("PATH", path);
  }

  pub fn to_map(&self) -> BTreeMap<OsString, OsString> {
    self.vars.clone()
  }
}

fn path_separator() -> &'static str {
  if cfg!(windows) { ";" } else { ":" }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serial_test::serial;

  #[cfg(unix)]
  #[test]
  fn prepend_path_keeps_existing_entries() {
    let mut env = BuildEnv::from_vars([("PATH", "/usr/bin:/bin")]);
    env.prepend_path(Path::new("/stage/m4/bin"));
    assert_eq!(env.get("PATH"), Some("/stage/m4/bin:/usr/bin:/bin"));
  }

  #[test]
  fn prepend_path_without_existing_path() {
    let mut env = BuildEnv::default();
    env.prepend_path(Path::new("/stage/m4/bin"));
    assert_eq!(env.get("PATH"), Some("/stage/m4/bin"));
  }

  #[test]
  fn set_overrides_inherited_value() {
    let mut env = BuildEnv::from_vars([("CC", "gcc")]);
    env.set("CC", "clang");
    assert_eq!(env.get("CC"), Some("clang"));
  }

  #[cfg(unix)]
  #[test]
  #[serial]
  fn inherit_keeps_non_utf8_values() {
    use std::os::unix::ffi::OsStrExt;

    let raw = OsStr::from_bytes(b"lib\xffdir");
    temp_env::with_var("BISON_BIN_RAW_BYTES", Some(raw), || {
      let env = BuildEnv::inherit();

      assert_eq!(env.get("BISON_BIN_RAW_BYTES"), None);
      assert_eq!(
        env.to_map().get(OsStr::new("BISON_BIN_RAW_BYTES")).map(OsString::as_os_str),
        Some(raw)
      );
    });
  }
}
