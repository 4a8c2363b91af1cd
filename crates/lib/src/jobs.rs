//! Job registry.
//!
//! The set of jobs is closed: every lookup is an exhaustive match, so adding a
//! job means the compiler points at each place that must learn about it.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use crate::config::PipelineConfig;
use crate::container::Container;
use crate::context::ExecutionContext;
use crate::engine::ContainerEngine;
use crate::stages::{PipelineError, build_pipeline, run_build, run_test, test_pipeline};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Job {
  Test,
  Build,
}

#[derive(Debug, Error)]
#[error("unknown job '{0}' (expected one of: test, build)")]
pub struct UnknownJob(pub String);

impl Job {
  pub const ALL: [Job; 2] = [Job::Test, Job::Build];

  pub fn as_str(&self) -> &'static str {
    match self {
      Job::Test => "test",
      Job::Build => "build",
    }
  }

  pub fn description(&self) -> &'static str {
    match self {
      Job::Test => "Run tests",
      Job::Build => "Build the project",
    }
  }

  /// Whether the job forwards extra command-line options.
  pub fn accepts_options(&self) -> bool {
    matches!(self, Job::Test)
  }

  /// The container plan this job would run, without touching an engine.
  pub fn pipeline(&self, config: &PipelineConfig, options: &[String]) -> Result<Container, PipelineError> {
    self.check_options(options)?;
    let context = Arc::new(ExecutionContext::load(config.source())?);
    Ok(match self {
      Job::Test => test_pipeline(context, options),
      Job::Build => build_pipeline(context, config),
    })
  }

  /// Run the job and return the stdout of its last step.
  pub async fn run(
    &self,
    engine: &dyn ContainerEngine,
    config: &PipelineConfig,
    options: &[String],
  ) -> Result<String, PipelineError> {
    self.check_options(options)?;
    match self {
      Job::Test => run_test(engine, config, options).await,
      Job::Build => run_build(engine, config).await,
    }
  }

  fn check_options(&self, options: &[String]) -> Result<(), PipelineError> {
    if !self.accepts_options() && !options.is_empty() {
      return Err(PipelineError::UnexpectedOptions {
        job: self.as_str().to_string(),
        options: options.to_vec(),
      });
    }
    Ok(())
  }
}

impl fmt::Display for Job {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

impl FromStr for Job {
  type Err = UnknownJob;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "test" => Ok(Job::Test),
      "build" => Ok(Job::Build),
      other => Err(UnknownJob(other.to_string())),
    }
  }
}
