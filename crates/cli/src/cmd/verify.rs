//! Implementation of the `omd-ci verify` command.
//!
//! Checks an exported release archive against its `.sha256` file and makes
//! sure the binary, README and license are packaged.

use std::path::PathBuf;

use anyhow::{Context, Result};

use omd_ci_lib::artifact::{ArtifactPaths, verify};

use super::resolve_config;
use crate::output::{OutputFormat, format_bytes, print_entry, print_json, print_stat, print_success, short_digest};

pub fn cmd_verify(dir: PathBuf, target: Option<String>, tag: Option<String>, format: OutputFormat) -> Result<()> {
  let config = resolve_config(&dir, target, tag, Some(dir.clone()));
  let paths = ArtifactPaths::new(&config);

  let verified = verify(&paths).with_context(|| format!("Failed to verify {}", paths.archive.display()))?;

  if format.is_json() {
    return print_json(&verified);
  }

  let size = std::fs::metadata(&verified.archive).map(|m| m.len()).unwrap_or(0);
  print_success(&format!("{} verified", config.artifact_name()));
  print_stat("SHA-256", short_digest(&verified.sha256));
  print_stat("Size", &format_bytes(size));
  for entry in &verified.entries {
    print_entry(entry);
  }

  Ok(())
}
