//! Step runner.
//!
//! Applies a [`Container`] plan to a [`ContainerEngine`], one step at a time:
//! - The container is created from the plan's base image with every cache
//!   volume attached (engines attach mounts at creation)
//! - `Env` and `Workdir` steps update the state seen by later execs
//! - `Directory` steps upload the execution context as a tar stream
//! - `Exec` steps run with the current env and working directory
//!
//! The first failing step stops the run and the container is removed. No
//! step is retried.

pub mod types;

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::container::{Container, Step};
use crate::engine::{ContainerEngine, ContainerId, EngineError, ExecRequest, Mount};

pub use types::{StepError, StepFailure};

/// Runs container plans against an engine.
pub struct Runner<'a> {
  engine: &'a dyn ContainerEngine,
}

impl<'a> Runner<'a> {
  pub fn new(engine: &'a dyn ContainerEngine) -> Self {
    Self { engine }
  }

  /// Apply every step of `container` in order.
  ///
  /// On success the container is left running so files can be exported from
  /// the returned [`Session`]; call [`Session::close`] when done.
  pub async fn run(&self, container: &Container) -> Result<Session<'a>, StepError> {
    let steps = container.steps();
    let image = container
      .image()
      .ok_or_else(|| StepError::new(0, "from", StepFailure::MissingImage))?;
    let from_index = container.position(|s| matches!(s, Step::From { .. })).unwrap_or(0);

    let mounts: Vec<Mount> = container
      .caches()
      .into_iter()
      .map(|(volume, path)| Mount {
        volume: volume.to_string(),
        path: path.to_string(),
      })
      .collect();

    info!(image = %image, caches = mounts.len(), steps = steps.len(), "creating container");
    let id = self
      .engine
      .create(image, &mounts)
      .await
      .map_err(|e| StepError::new(from_index, steps[from_index].describe(), e))?;

    let mut state = ExecState::default();
    for (index, step) in steps.iter().enumerate() {
      if let Err(source) = self.apply(&id, index, from_index, step, &mut state).await {
        self.discard(&id).await;
        return Err(StepError::new(index, step.describe(), source));
      }
    }

    info!(id = %id, "all steps completed");
    Ok(Session {
      engine: self.engine,
      id,
      stdout: state.last_stdout,
    })
  }

  async fn apply(
    &self,
    id: &ContainerId,
    index: usize,
    from_index: usize,
    step: &Step,
    state: &mut ExecState,
  ) -> Result<(), StepFailure> {
    match step {
      Step::From { .. } if index == from_index => {}
      Step::From { .. } => return Err(StepFailure::MultipleImages),
      Step::MountCache { volume, path } => {
        debug!(index, volume = %volume, path = %path, "cache attached at creation");
      }
      Step::Workdir { path } => {
        state.workdir = Some(path.clone());
      }
      Step::Env { key, value } => {
        state.env.insert(key.clone(), value.clone());
      }
      Step::Directory { path, context } => {
        info!(index, path = %path, entries = context.entries().len(), "uploading context");
        let context = Arc::clone(context);
        let tar = tokio::task::spawn_blocking(move || context.to_tar())
          .await
          .map_err(|e| StepFailure::Join(e.to_string()))??;
        self.engine.copy_in(id, path, tar).await?;
      }
      Step::Exec { args } => {
        info!(index, cmd = %args.join(" "), "exec");
        let request = ExecRequest {
          args: args.clone(),
          env: state.env.clone(),
          workdir: state.workdir.clone(),
        };
        let output = self.engine.exec(id, &request).await?;
        if !output.stdout.is_empty() {
          debug!(stdout = %output.stdout, "step output");
        }
        state.last_stdout = output.stdout;
      }
    }
    Ok(())
  }

  async fn discard(&self, id: &ContainerId) {
    if let Err(e) = self.engine.remove(id).await {
      warn!(id = %id, error = %e, "failed to remove container");
    }
  }
}

#[derive(Debug, Default)]
struct ExecState {
  env: BTreeMap<String, String>,
  workdir: Option<String>,
  last_stdout: String,
}

/// A container whose plan ran to completion.
pub struct Session<'a> {
  engine: &'a dyn ContainerEngine,
  id: ContainerId,
  stdout: String,
}

impl Session<'_> {
  pub fn id(&self) -> &ContainerId {
    &self.id
  }

  /// Stdout of the last exec step.
  pub fn stdout(&self) -> &str {
    &self.stdout
  }

  /// Copy `src` from the final container state to `dest` on the host.
  pub async fn export(&self, src: &str, dest: &Path) -> Result<(), EngineError> {
    if let Some(parent) = dest.parent() {
      if !parent.as_os_str().is_empty() {
        tokio::fs::create_dir_all(parent).await?;
      }
    }
    info!(src = %src, dest = %dest.display(), "exporting file");
    self.engine.copy_out(&self.id, src, dest).await
  }

  /// Remove the container and hand back the captured stdout.
  pub async fn close(self) -> Result<String, EngineError> {
    self.engine.remove(&self.id).await?;
    Ok(self.stdout)
  }
}
