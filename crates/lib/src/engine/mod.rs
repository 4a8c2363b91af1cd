//! Container-execution engine seam.
//!
//! The pipeline only needs a handful of primitives from a container runtime.
//! [`ContainerEngine`] names them; [`DockerEngine`] implements them over the
//! `docker` CLI (or any CLI with the same surface, such as `podman`).

mod docker;

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

pub use docker::DockerEngine;

#[derive(Debug, Error)]
pub enum EngineError {
  /// The engine binary could not be started.
  #[error("failed to spawn {program}")]
  Spawn {
    program: String,
    #[source]
    source: std::io::Error,
  },

  /// An engine command exited unsuccessfully.
  #[error("command failed with exit code {:?}: {}{}", .code, .cmd, format_stderr(.stderr))]
  CommandFailed {
    cmd: String,
    code: Option<i32>,
    stderr: String,
  },

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),
}

fn format_stderr(stderr: &str) -> String {
  let trimmed = stderr.trim();
  if trimmed.is_empty() {
    String::new()
  } else {
    format!("\n{}", trimmed)
  }
}

/// Opaque identifier of a running container.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ContainerId(pub String);

impl fmt::Display for ContainerId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

/// A named cache volume attached at container creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Mount {
  pub volume: String,
  pub path: String,
}

/// A command to run inside a container.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecRequest {
  pub args: Vec<String>,
  pub env: BTreeMap<String, String>,
  pub workdir: Option<String>,
}

/// Captured output of a successful command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecOutput {
  pub stdout: String,
  pub stderr: String,
}

#[async_trait]
pub trait ContainerEngine: Send + Sync {
  /// Create and start a container from `image` with `mounts` attached.
  async fn create(&self, image: &str, mounts: &[Mount]) -> Result<ContainerId, EngineError>;

  /// Extract an uncompressed tar stream into `dest` inside the container.
  async fn copy_in(&self, id: &ContainerId, dest: &str, tar: Vec<u8>) -> Result<(), EngineError>;

  /// Run a command; a non-zero exit is an error.
  async fn exec(&self, id: &ContainerId, request: &ExecRequest) -> Result<ExecOutput, EngineError>;

  /// Copy the file at `src` inside the container to `dest` on the host.
  async fn copy_out(&self, id: &ContainerId, src: &str, dest: &Path) -> Result<(), EngineError>;

  /// Stop and delete the container. Cache volumes are left in place.
  async fn remove(&self, id: &ContainerId) -> Result<(), EngineError>;
}
