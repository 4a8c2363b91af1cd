//! omd-ci-lib: container pipeline for the `oh-my-droid` release
//!
//! This crate provides the pieces the `omd-ci` CLI is built from:
//! - `PipelineConfig`: invocation settings resolved once from the environment
//! - `ExecutionContext`: the filtered source snapshot uploaded into containers
//! - `Container`: a typed, ordered plan of container steps
//! - `Runner`: applies a plan to a `ContainerEngine`, stopping at the first failure
//! - `Job`: the closed registry of pipeline stages (`test`, `build`)

pub mod artifact;
pub mod config;
pub mod consts;
pub mod container;
pub mod context;
pub mod engine;
pub mod execute;
pub mod jobs;
pub mod rustflags;
pub mod stages;
pub mod util;

pub use config::PipelineConfig;
pub use container::{Container, Step};
pub use context::ExecutionContext;
pub use engine::{ContainerEngine, DockerEngine};
pub use execute::{Runner, Session, StepError};
pub use jobs::Job;
pub use stages::PipelineError;
