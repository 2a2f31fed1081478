//! Terminal output for bison-bin.
//!
//! Status lines go to stdout, warnings and failures to stderr. Colors are
//! applied only when the target stream supports them.

use std::fmt::Display;
use std::path::Path;

use anyhow::Context;
use clap::ValueEnum;
use owo_colors::{OwoColorize, Stream};

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
  #[default]
  Text,
  Json,
}

impl OutputFormat {
  pub fn is_json(self) -> bool {
    matches!(self, OutputFormat::Json)
  }
}

/// Kind of a one-line status message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
  Done,
  Failed,
  Warn,
  Note,
}

impl Status {
  fn glyph(self) -> &'static str {
    match self {
      Status::Done => "✓",
      Status::Failed => "✗",
      Status::Warn => "⚠",
      Status::Note => "•",
    }
  }
}

/// Print a status line prefixed with its glyph.
pub fn status(kind: Status, message: impl Display) {
  let glyph = kind.glyph();
  match kind {
    Status::Done => println!("{} {}", glyph.if_supports_color(Stream::Stdout, |g| g.green()), message),
    Status::Note => println!("{} {}", glyph.if_supports_color(Stream::Stdout, |g| g.blue()), message),
    Status::Warn => eprintln!("{} {}", glyph.if_supports_color(Stream::Stderr, |g| g.yellow()), message),
    Status::Failed => eprintln!("{} {}", glyph.if_supports_color(Stream::Stderr, |g| g.red()), message),
  }
}

/// Indented `label: value` line.
pub fn field(label: &str, value: impl Display) {
  println!("  {}: {}", label.if_supports_color(Stream::Stdout, |l| l.dimmed()), value);
}

/// Indented path entry of a list.
pub fn item(path: &Path) {
  println!("  → {}", path.display());
}

pub fn emit_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
  let json = serde_json::to_string_pretty(value).context("Failed to serialize to JSON")?;
  println!("{json}");
  Ok(())
}

/// Binary (1024-based) size with one decimal, e.g. `1.5 MB`.
pub fn human_size(bytes: u64) -> String {
  const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];
  if bytes < 1024 {
    return format!("{bytes} B");
  }
  let mut value = bytes as f64 / 1024.0;
  let mut unit = 0;
  while value >= 1024.0 && unit < UNITS.len() - 1 {
    value /= 1024.0;
    unit += 1;
  }
  format!("{value:.1} {}", UNITS[unit])
}
