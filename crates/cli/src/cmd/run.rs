//! Implementation of the `omd-ci run` command.
//!
//! Resolves configuration once, runs exactly one job against the docker
//! engine, and prints the job's stdout.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use tracing::debug;

use omd_ci_lib::{DockerEngine, Job};

use super::resolve_config;
use crate::output::{format_duration, print_stat, print_success};

pub fn cmd_run(
  job: Job,
  src: &Path,
  target: Option<String>,
  tag: Option<String>,
  output_dir: Option<PathBuf>,
  options: &[String],
) -> Result<()> {
  let config = resolve_config(src, target, tag, output_dir);
  debug!(?config, "resolved configuration");

  let engine = DockerEngine::new(&config.engine);
  let started = Instant::now();

  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  let stdout = rt
    .block_on(job.run(&engine, &config, options))
    .with_context(|| format!("Job '{}' failed", job))?;

  print!("{}", stdout);
  print_success(&format!("{} finished in {}", job, format_duration(started.elapsed())));

  if job == Job::Build {
    print_stat("Archive", &config.artifact_path().display().to_string());
    print_stat("Checksum", &config.checksum_path().display().to_string());
  }

  Ok(())
}
