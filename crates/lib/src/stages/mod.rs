//! Pipeline stages.
//!
//! Each stage is split in two: a pure `*_pipeline` function that builds the
//! [`crate::container::Container`] plan, and an async runner that resolves the
//! execution context, applies the plan and exports results.

pub mod build;

use thiserror::Error;

use crate::context::ContextError;
use crate::engine::EngineError;
use crate::execute::StepError;

pub use build::{build_pipeline, run_build};
pub use test::{run_test, test_pipeline};

/// Errors surfaced by a stage invocation.
#[derive(Debug, Error)]
pub enum PipelineError {
  #[error("failed to load execution context")]
  Context(#[from] ContextError),

  #[error(transparent)]
  Step(#[from] StepError),

  #[error("failed to export {src}")]
  Export {
    src: String,
    #[source]
    source: EngineError,
  },

  #[error("failed to remove container")]
  Cleanup(#[source] EngineError),

  /// Extra options were supplied to a job that does not take any.
  #[error("job '{job}' does not accept extra options: {options:?}")]
  UnexpectedOptions { job: String, options: Vec<String> },
}
