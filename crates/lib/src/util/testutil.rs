//! Test utilities for omd-ci-lib.
//!
//! [`RecordingEngine`] stands in for a container runtime: it records every
//! call, answers execs with a predictable stdout, and writes a marker file on
//! `copy_out` so exports can be asserted on disk.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::engine::{ContainerEngine, ContainerId, EngineError, ExecOutput, ExecRequest, Mount};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
  Create { image: String, mounts: Vec<Mount> },
  CopyIn { dest: String, bytes: usize },
  Exec(ExecRequest),
  CopyOut { src: String, dest: PathBuf },
  Remove,
}

#[derive(Debug, Default)]
pub struct RecordingEngine {
  calls: Mutex<Vec<Call>>,
  fail_exec_at: Option<usize>,
  fail_create: bool,
}

impl RecordingEngine {
  pub fn new() -> Self {
    Self::default()
  }

  /// Fail the `n`th exec (zero-based) with exit code 100.
  pub fn failing_exec(n: usize) -> Self {
    Self {
      fail_exec_at: Some(n),
      ..Self::default()
    }
  }

  pub fn failing_create() -> Self {
    Self {
      fail_create: true,
      ..Self::default()
    }
  }

  pub fn calls(&self) -> Vec<Call> {
    self.calls.lock().unwrap().clone()
  }

  pub fn execs(&self) -> Vec<ExecRequest> {
    self
      .calls()
      .into_iter()
      .filter_map(|c| match c {
        Call::Exec(req) => Some(req),
        _ => None,
      })
      .collect()
  }

  pub fn exports(&self) -> Vec<(String, PathBuf)> {
    self
      .calls()
      .into_iter()
      .filter_map(|c| match c {
        Call::CopyOut { src, dest } => Some((src, dest)),
        _ => None,
      })
      .collect()
  }

  fn record(&self, call: Call) {
    self.calls.lock().unwrap().push(call);
  }
}

#[async_trait]
impl ContainerEngine for RecordingEngine {
  async fn create(&self, image: &str, mounts: &[Mount]) -> Result<ContainerId, EngineError> {
    self.record(Call::Create {
      image: image.to_string(),
      mounts: mounts.to_vec(),
    });
    if self.fail_create {
      return Err(EngineError::CommandFailed {
        cmd: format!("create {}", image),
        code: Some(125),
        stderr: "pull access denied".to_string(),
      });
    }
    Ok(ContainerId("recorded".to_string()))
  }

  async fn copy_in(&self, _id: &ContainerId, dest: &str, tar: Vec<u8>) -> Result<(), EngineError> {
    self.record(Call::CopyIn {
      dest: dest.to_string(),
      bytes: tar.len(),
    });
    Ok(())
  }

  async fn exec(&self, _id: &ContainerId, request: &ExecRequest) -> Result<ExecOutput, EngineError> {
    let index = self.execs().len();
    self.record(Call::Exec(request.clone()));

    if self.fail_exec_at == Some(index) {
      return Err(EngineError::CommandFailed {
        cmd: request.args.join(" "),
        code: Some(100),
        stderr: "E: Unable to fetch some archives".to_string(),
      });
    }

    Ok(ExecOutput {
      stdout: format!("ran: {}\n", request.args.join(" ")),
      stderr: String::new(),
    })
  }

  async fn copy_out(&self, _id: &ContainerId, src: &str, dest: &Path) -> Result<(), EngineError> {
    self.record(Call::CopyOut {
      src: src.to_string(),
      dest: dest.to_path_buf(),
    });
    std::fs::write(dest, format!("exported {}", src))?;
    Ok(())
  }

  async fn remove(&self, _id: &ContainerId) -> Result<(), EngineError> {
    self.record(Call::Remove);
    Ok(())
  }
}
