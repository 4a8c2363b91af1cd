//! Implementation of the `omd-ci plan` command.
//!
//! Prints the steps a job would run without contacting a container engine.

use std::path::Path;

use anyhow::{Context, Result};

use omd_ci_lib::Job;

use super::resolve_config;
use crate::output::{OutputFormat, print_info, print_json, print_stat, print_step};

pub fn cmd_plan(
  job: Job,
  src: &Path,
  target: Option<String>,
  tag: Option<String>,
  options: &[String],
  output: OutputFormat,
) -> Result<()> {
  let config = resolve_config(src, target, tag, None);
  let plan = job
    .pipeline(&config, options)
    .with_context(|| format!("Failed to plan job '{}'", job))?;

  if output.is_json() {
    let json = serde_json::json!({
      "job": job,
      "config": config,
      "steps": plan.steps(),
    });
    return print_json(&json);
  }

  print_info(&format!("Plan for '{}': {} step(s)", job, plan.steps().len()));
  print_stat("Target", &config.target);
  print_stat("Tag", &config.tag);
  if job == Job::Build {
    print_stat("Archive", &config.artifact_name());
  }
  println!();
  for (index, step) in plan.steps().iter().enumerate() {
    print_step(index, step);
  }

  Ok(())
}
