//! Error types for the step runner.

use thiserror::Error;

use crate::context::ContextError;
use crate::engine::EngineError;

/// What went wrong inside a failing step.
#[derive(Debug, Error)]
pub enum StepFailure {
  #[error(transparent)]
  Engine(#[from] EngineError),

  #[error(transparent)]
  Context(#[from] ContextError),

  /// The plan has no `From` step.
  #[error("container plan has no base image")]
  MissingImage,

  /// A second `From` step appeared after the container was created.
  #[error("container plan declares more than one base image")]
  MultipleImages,

  #[error("background task failed: {0}")]
  Join(String),
}

/// A step failed; nothing after it ran.
#[derive(Debug, Error)]
#[error("step {index} ({step}) failed")]
pub struct StepError {
  /// Zero-based position of the step in the plan.
  pub index: usize,
  /// Human description of the step.
  pub step: String,
  #[source]
  pub source: StepFailure,
}

impl StepError {
  pub fn new(index: usize, step: impl Into<String>, source: impl Into<StepFailure>) -> Self {
    Self {
      index,
      step: step.into(),
      source: source.into(),
    }
  }
}
