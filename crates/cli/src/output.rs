//! Terminal output for `omd-ci`.
//!
//! Job stdout owns stdout; status lines about the job itself go to stderr.
//! `plan`, `list` and `verify` print their reports on stdout. Colors are
//! applied only when the stream supports them.

use std::fmt::Display;
use std::time::Duration;

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

#[derive(Debug, Clone, Copy)]
enum Status {
  Done,
  Failed,
  Info,
}

impl Status {
  fn symbol(self) -> &'static str {
    match self {
      Status::Done => "✓",
      Status::Failed => "✗",
      Status::Info => "•",
    }
  }
}

/// Job finished; goes to stderr so job stdout stays clean.
pub fn print_success(message: &str) {
  let symbol = Status::Done.symbol();
  eprintln!("{} {}", symbol.if_supports_color(Stream::Stderr, |s| s.green()), message);
}

pub fn print_error(message: &str) {
  let symbol = Status::Failed.symbol();
  eprintln!(
    "{} {}",
    symbol.if_supports_color(Stream::Stderr, |s| s.red()),
    message.if_supports_color(Stream::Stderr, |s| s.red())
  );
}

pub fn print_info(message: &str) {
  let symbol = Status::Info.symbol();
  println!("{} {}", symbol.if_supports_color(Stream::Stdout, |s| s.blue()), message);
}

pub fn print_stat(label: &str, value: &str) {
  println!("  {}: {}", label.if_supports_color(Stream::Stdout, |s| s.dimmed()), value);
}

/// One numbered line of a job plan.
pub fn print_step(index: usize, step: impl Display) {
  println!("  {}", step_line(index, step));
}

/// One path packaged in a release archive.
pub fn print_entry(entry: &str) {
  println!("    → {}", entry);
}

pub fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
  let json = serde_json::to_string_pretty(value).context("Failed to serialize to JSON")?;
  println!("{}", json);
  Ok(())
}

fn step_line(index: usize, step: impl Display) -> String {
  format!("{:>2}. {}", index, step)
}

/// First 12 hex digits of a SHA-256 digest.
pub fn short_digest(digest: &str) -> &str {
  digest.get(..12).unwrap_or(digest)
}

/// Archive size in binary units.
pub fn format_bytes(bytes: u64) -> String {
  const KIB: u64 = 1024;
  const MIB: u64 = KIB * 1024;

  match bytes {
    b if b >= MIB => format!("{:.1} MiB", b as f64 / MIB as f64),
    b if b >= KIB => format!("{:.1} KiB", b as f64 / KIB as f64),
    b => format!("{} B", b),
  }
}

/// Wall-clock time of a job. Builds run for minutes, tests for seconds.
pub fn format_duration(duration: Duration) -> String {
  let secs = duration.as_secs();
  match secs {
    0 => format!("{}ms", duration.subsec_millis()),
    1..60 => format!("{:.1}s", duration.as_secs_f64()),
    _ => format!("{}m {:02}s", secs / 60, secs % 60),
  }
}
