//! Typed container plans.
//!
//! A [`Container`] is an ordered list of [`Step`]s describing how to turn a
//! base image into the final container state. Building a plan performs no
//! I/O; the [`crate::execute::Runner`] applies it against an engine.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::context::ExecutionContext;

/// A single operation on the container under construction.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
  /// Start from a base image.
  From { image: String },
  /// Run an argument vector.
  Exec { args: Vec<String> },
  /// Upload the execution context at `path`.
  Directory {
    path: String,
    #[serde(skip)]
    context: Arc<ExecutionContext>,
  },
  /// Change the working directory for later execs.
  Workdir { path: String },
  /// Mount a named, persistent cache volume at `path`.
  MountCache { path: String, volume: String },
  /// Set an environment variable for later execs.
  Env { key: String, value: String },
}

impl Step {
  /// One-line human description.
  pub fn describe(&self) -> String {
    match self {
      Step::From { image } => format!("from {}", image),
      Step::Exec { args } => format!("exec {}", args.join(" ")),
      Step::Directory { path, context } => {
        format!("upload {} -> {} ({} entries)", context.root().display(), path, context.entries().len())
      }
      Step::Workdir { path } => format!("workdir {}", path),
      Step::MountCache { path, volume } => format!("cache {} -> {}", volume, path),
      Step::Env { key, value } => format!("env {}={}", key, value),
    }
  }
}

impl fmt::Display for Step {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.describe())
  }
}

/// Builder for an ordered container plan.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Container {
  steps: Vec<Step>,
}

impl Container {
  pub fn new() -> Self {
    Self::default()
  }

  #[allow(clippy::should_implement_trait)]
  pub fn from(mut self, image: impl Into<String>) -> Self {
    self.steps.push(Step::From { image: image.into() });
    self
  }

  pub fn with_exec<I, S>(mut self, args: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.steps.push(Step::Exec {
      args: args.into_iter().map(Into::into).collect(),
    });
    self
  }

  /// Shorthand for `sh -c <script>`, so `$VARS` expand inside the container.
  pub fn with_shell(self, script: impl Into<String>) -> Self {
    self.with_exec(["sh".to_string(), "-c".to_string(), script.into()])
  }

  pub fn with_directory(mut self, path: impl Into<String>, context: Arc<ExecutionContext>) -> Self {
    self.steps.push(Step::Directory {
      path: path.into(),
      context,
    });
    self
  }

  pub fn with_workdir(mut self, path: impl Into<String>) -> Self {
    self.steps.push(Step::Workdir { path: path.into() });
    self
  }

  pub fn with_mounted_cache(mut self, path: impl Into<String>, volume: impl Into<String>) -> Self {
    self.steps.push(Step::MountCache {
      path: path.into(),
      volume: volume.into(),
    });
    self
  }

  pub fn with_env_variable(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
    self.steps.push(Step::Env {
      key: key.into(),
      value: value.into(),
    });
    self
  }

  pub fn steps(&self) -> &[Step] {
    &self.steps
  }

  /// Base image of the first `From` step.
  pub fn image(&self) -> Option<&str> {
    self.steps.iter().find_map(|s| match s {
      Step::From { image } => Some(image.as_str()),
      _ => None,
    })
  }

  /// Argument vectors of every exec step, in order.
  pub fn exec_args(&self) -> Vec<&[String]> {
    self
      .steps
      .iter()
      .filter_map(|s| match s {
        Step::Exec { args } => Some(args.as_slice()),
        _ => None,
      })
      .collect()
  }

  /// `(volume, path)` pairs of every cache mount, in order.
  pub fn caches(&self) -> Vec<(&str, &str)> {
    self
      .steps
      .iter()
      .filter_map(|s| match s {
        Step::MountCache { path, volume } => Some((volume.as_str(), path.as_str())),
        _ => None,
      })
      .collect()
  }

  /// Index of the first step matching `pred`.
  pub fn position<P>(&self, pred: P) -> Option<usize>
  where
    P: Fn(&Step) -> bool,
  {
    self.steps.iter().position(pred)
  }
}
