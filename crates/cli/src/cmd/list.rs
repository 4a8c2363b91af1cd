//! Implementation of the `omd-ci list` command.

use anyhow::Result;
use serde::Serialize;

use omd_ci_lib::Job;

use crate::output::{OutputFormat, print_json};

#[derive(Serialize)]
struct JobEntry {
  name: Job,
  description: &'static str,
}

pub fn cmd_list(output: OutputFormat) -> Result<()> {
  if output.is_json() {
    let jobs: Vec<JobEntry> = Job::ALL
      .iter()
      .map(|job| JobEntry {
        name: *job,
        description: job.description(),
      })
      .collect();
    return print_json(&jobs);
  }

  println!("Jobs:");
  for job in Job::ALL {
    println!("  {:<8} {}", job.as_str(), job.description());
  }
  Ok(())
}
