//! Test utilities for bison-bin-lib.
//!
//! Helpers for writing small source archives and recording child-process
//! invocations without spawning anything.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use flate2::Compression;
use flate2::write::GzEncoder;
use xz2::write::XzEncoder;

use crate::native::{BuildError, CommandRunner, Invocation};

fn append_members<W: Write>(builder: &mut tar::Builder<W>, members: &[(&str, &str)]) {
  for (path, content) in members {
    let mut header = tar::Header::new_gnu();
    header.set_size(content.len() as u64);
    header.set_mode(0o755);
    header.set_cksum();
    builder.append_data(&mut header, path, content.as_bytes()).unwrap();
  }
}

/// Write an uncompressed tarball containing `(path, content)` members.
pub fn write_tar(dest: &Path, members: &[(&str, &str)]) {
  let mut builder = tar::Builder::new(File::create(dest).unwrap());
  append_members(&mut builder, members);
  builder.finish().unwrap();
}

/// Write a gzip-compressed tarball containing `(path, content)` members.
pub fn write_tar_gz(dest: &Path, members: &[(&str, &str)]) {
  let encoder = GzEncoder::new(File::create(dest).unwrap(), Compression::default());
  let mut builder = tar::Builder::new(encoder);
  append_members(&mut builder, members);
  builder.into_inner().unwrap().finish().unwrap();
}

/// Write a gzip-compressed tarball that starts with a pax global header,
/// the way `git archive` produces release tarballs.
pub fn write_pax_tar_gz(dest: &Path, members: &[(&str, &str)]) {
  let encoder = GzEncoder::new(File::create(dest).unwrap(), Compression::default());
  let mut builder = tar::Builder::new(encoder);

  let record = b"52 comment=3fbe1b5d6c2a1e5e0ab8bb71f0c3d95ffa0a2b7c\n";
  let mut header = tar::Header::new_ustar();
  header.set_entry_type(tar::EntryType::XGlobalHeader);
  header.set_size(record.len() as u64);
  header.set_mode(0o644);
  header.set_cksum();
  builder.append_data(&mut header, "pax_global_header", &record[..]).unwrap();

  append_members(&mut builder, members);
  builder.into_inner().unwrap().finish().unwrap();
}

/// Write an xz-compressed tarball containing `(path, content)` members.
pub fn write_tar_xz(dest: &Path, members: &[(&str, &str)]) {
  let encoder = XzEncoder::new(File::create(dest).unwrap(), 6);
  let mut builder = tar::Builder::new(encoder);
  append_members(&mut builder, members);
  builder.into_inner().unwrap().finish().unwrap();
}

/// A `CommandRunner` that records invocations and emulates `make install`.
///
/// On `make install` it creates `<prefix>/bin/<tool>` for every name in
/// `installs`, where the prefix is taken from the last `--prefix=` seen.
#[derive(Debug, Default)]
pub struct RecordingRunner {
  pub calls: Vec<Invocation>,
  pub installs: Vec<String>,
  pub fail_on: Option<String>,
  prefix: Option<PathBuf>,
}

impl RecordingRunner {
  pub fn installing(tools: &[&str]) -> Self {
    Self {
      installs: tools.iter().map(|t| t.to_string()).collect(),
      ..Self::default()
    }
  }

  /// Runner that fails every invocation whose command line contains `needle`.
  pub fn failing_on(needle: &str) -> Self {
    Self {
      fail_on: Some(needle.to_string()),
      ..Self::default()
    }
  }

  /// Rendered command lines, in call order.
  pub fn command_lines(&self) -> Vec<String> {
    self.calls.iter().map(Invocation::command_line).collect()
  }
}

impl CommandRunner for RecordingRunner {
  fn run(&mut self, invocation: &Invocation) -> Result<(), BuildError> {
    self.calls.push(invocation.clone());
    let line = invocation.command_line();

    if self.fail_on.as_deref().is_some_and(|needle| line.contains(needle)) {
      return Err(BuildError::CommandFailed { cmd: line, code: Some(2) });
    }

    if let Some(prefix) = invocation.args.iter().find_map(|arg| arg.strip_prefix("--prefix=")) {
      self.prefix = Some(PathBuf::from(prefix));
    }

    if invocation.program == "make" && invocation.args.first().map(String::as_str) == Some("install") {
      if let Some(prefix) = &self.prefix {
        let bin = prefix.join("bin");
        std::fs::create_dir_all(&bin).unwrap();
        for tool in &self.installs {
          std::fs::write(bin.join(tool), "#!/bin/sh\n").unwrap();
        }
      }
    }

    Ok(())
  }
}
