//! Docker CLI engine.

use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use super::{ContainerEngine, ContainerId, EngineError, ExecOutput, ExecRequest, Mount};
use crate::consts::DEFAULT_ENGINE;

/// Drives containers through a docker-compatible CLI.
///
/// Containers idle on `sleep infinity` so that each exec runs against the
/// state left by the previous one.
#[derive(Debug, Clone)]
pub struct DockerEngine {
  program: String,
}

impl Default for DockerEngine {
  fn default() -> Self {
    Self::new(DEFAULT_ENGINE)
  }
}

impl DockerEngine {
  pub fn new(program: impl Into<String>) -> Self {
    Self { program: program.into() }
  }

  pub fn program(&self) -> &str {
    &self.program
  }

  async fn run(&self, args: Vec<String>, stdin: Option<Vec<u8>>) -> Result<ExecOutput, EngineError> {
    let cmd = format!("{} {}", self.program, args.join(" "));
    debug!(cmd = %cmd, "running engine command");

    let mut command = Command::new(&self.program);
    command
      .args(&args)
      .stdin(if stdin.is_some() { Stdio::piped() } else { Stdio::null() })
      .stdout(Stdio::piped())
      .stderr(Stdio::piped());

    let mut child = command.spawn().map_err(|source| EngineError::Spawn {
      program: self.program.clone(),
      source,
    })?;

    // The engine may exit before draining stdin; its exit status and stderr
    // take precedence over the resulting broken pipe.
    let pipe = child.stdin.take();
    let feed = async move {
      match (pipe, stdin) {
        (Some(mut pipe), Some(data)) => {
          pipe.write_all(&data).await?;
          pipe.shutdown().await
        }
        _ => Ok(()),
      }
    };
    let (written, output) = tokio::join!(feed, child.wait_with_output());

    let output = output?;
    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();

    if !output.status.success() {
      if let Err(e) = &written {
        debug!(error = %e, "engine exited before reading all input");
      }
      if !stdout.is_empty() {
        debug!(stdout = %stdout, "command stdout");
      }
      return Err(EngineError::CommandFailed {
        cmd,
        code: output.status.code(),
        stderr,
      });
    }
    written?;

    Ok(ExecOutput { stdout, stderr })
  }
}

fn create_args(image: &str, mounts: &[Mount]) -> Vec<String> {
  let mut args = vec!["create".to_string(), "--entrypoint".to_string(), "sleep".to_string()];
  for mount in mounts {
    args.push("-v".to_string());
    args.push(format!("{}:{}", mount.volume, mount.path));
  }
  args.push(image.to_string());
  args.push("infinity".to_string());
  args
}

fn exec_args(id: &ContainerId, request: &ExecRequest) -> Vec<String> {
  let mut args = vec!["exec".to_string()];
  if let Some(workdir) = &request.workdir {
    args.push("-w".to_string());
    args.push(workdir.clone());
  }
  for (key, value) in &request.env {
    args.push("-e".to_string());
    args.push(format!("{}={}", key, value));
  }
  args.push(id.0.clone());
  args.extend(request.args.iter().cloned());
  args
}

#[async_trait]
impl ContainerEngine for DockerEngine {
  async fn create(&self, image: &str, mounts: &[Mount]) -> Result<ContainerId, EngineError> {
    let output = self.run(create_args(image, mounts), None).await?;
    let id = ContainerId(output.stdout.trim().to_string());

    self.run(vec!["start".to_string(), id.0.clone()], None).await?;
    debug!(id = %id, image = %image, "container started");
    Ok(id)
  }

  async fn copy_in(&self, id: &ContainerId, dest: &str, tar: Vec<u8>) -> Result<(), EngineError> {
    let mkdir = ExecRequest {
      args: vec!["mkdir".to_string(), "-p".to_string(), dest.to_string()],
      ..ExecRequest::default()
    };
    self.exec(id, &mkdir).await?;

    self
      .run(vec!["cp".to_string(), "-".to_string(), format!("{}:{}", id, dest)], Some(tar))
      .await?;
    Ok(())
  }

  async fn exec(&self, id: &ContainerId, request: &ExecRequest) -> Result<ExecOutput, EngineError> {
    self.run(exec_args(id, request), None).await
  }

  async fn copy_out(&self, id: &ContainerId, src: &str, dest: &Path) -> Result<(), EngineError> {
    self
      .run(
        vec![
          "cp".to_string(),
          format!("{}:{}", id, src),
          dest.to_string_lossy().to_string(),
        ],
        None,
      )
      .await?;
    Ok(())
  }

  async fn remove(&self, id: &ContainerId) -> Result<(), EngineError> {
    self.run(vec!["rm".to_string(), "-f".to_string(), id.0.clone()], None).await?;
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serial_test::serial;
  use std::collections::BTreeMap;

  /// Write an executable shell script standing in for the docker CLI.
  #[cfg(unix)]
  fn scripted_engine(dir: &Path, body: &str) -> DockerEngine {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("docker");
    std::fs::write(&path, format!("#!/bin/sh\n{}", body)).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    DockerEngine::new(path.to_string_lossy())
  }

  #[test]
  fn create_args_declare_volumes_before_image() {
    let mounts = vec![
      Mount {
        volume: "target".to_string(),
        path: "/app/target".to_string(),
      },
      Mount {
        volume: "registry".to_string(),
        path: "/root/cargo/registry".to_string(),
      },
    ];

    assert_eq!(
      create_args("rust:1.89-bullseye", &mounts),
      vec![
        "create",
        "--entrypoint",
        "sleep",
        "-v",
        "target:/app/target",
        "-v",
        "registry:/root/cargo/registry",
        "rust:1.89-bullseye",
        "infinity",
      ]
    );
  }

  #[test]
  fn exec_args_carry_workdir_and_env() {
    let mut env = BTreeMap::new();
    env.insert("TARGET".to_string(), "aarch64-unknown-linux-gnu".to_string());
    env.insert("TAG".to_string(), "v1.0.0".to_string());

    let request = ExecRequest {
      args: vec!["cargo".to_string(), "test".to_string()],
      env,
      workdir: Some("/app".to_string()),
    };

    assert_eq!(
      exec_args(&ContainerId("abc123".to_string()), &request),
      vec![
        "exec",
        "-w",
        "/app",
        "-e",
        "TAG=v1.0.0",
        "-e",
        "TARGET=aarch64-unknown-linux-gnu",
        "abc123",
        "cargo",
        "test",
      ]
    );
  }

  #[test]
  fn exec_args_without_workdir() {
    let request = ExecRequest {
      args: vec!["apt-get".to_string(), "update".to_string()],
      ..ExecRequest::default()
    };
    assert_eq!(
      exec_args(&ContainerId("c".to_string()), &request),
      vec!["exec", "c", "apt-get", "update"]
    );
  }

  #[cfg(unix)]
  #[tokio::test]
  #[serial]
  async fn failing_program_reports_exit_code() {
    let engine = DockerEngine::new("false");
    let err = engine.remove(&ContainerId("c".to_string())).await.unwrap_err();
    assert!(matches!(err, EngineError::CommandFailed { code: Some(1), .. }));
  }

  #[tokio::test]
  #[serial]
  async fn missing_program_is_a_spawn_error() {
    let engine = DockerEngine::new("/nonexistent/omd-ci-docker");
    let err = engine.remove(&ContainerId("c".to_string())).await.unwrap_err();
    assert!(matches!(err, EngineError::Spawn { .. }));
  }

  #[cfg(unix)]
  #[tokio::test]
  #[serial]
  async fn create_uses_trimmed_stdout_as_id() {
    // `echo` prints its arguments, so the "id" is the create argv.
    let engine = DockerEngine::new("echo");
    let id = engine.create("alpine:3", &[]).await.unwrap();
    assert_eq!(id.0, "create --entrypoint sleep alpine:3 infinity");
  }

  #[cfg(unix)]
  #[tokio::test]
  #[serial]
  async fn rejected_upload_reports_engine_stderr() {
    let temp = tempfile::tempdir().unwrap();
    let engine = scripted_engine(
      temp.path(),
      "case \"$1\" in\n  exec) exit 0 ;;\n  cp) echo 'Error: No such container: c' >&2; exit 1 ;;\nesac\n",
    );

    let err = engine
      .copy_in(&ContainerId("c".to_string()), "/app", vec![0u8; 4 * 1024 * 1024])
      .await
      .unwrap_err();

    match err {
      EngineError::CommandFailed { code, stderr, .. } => {
        assert_eq!(code, Some(1));
        assert_eq!(stderr.trim(), "Error: No such container: c");
      }
      other => panic!("expected command failure, got {:?}", other),
    }
  }

  #[cfg(unix)]
  #[tokio::test]
  #[serial]
  async fn upload_streams_tar_on_stdin() {
    let temp = tempfile::tempdir().unwrap();
    let received = temp.path().join("received");
    let engine = scripted_engine(
      temp.path(),
      &format!(
        "case \"$1\" in\n  exec) exit 0 ;;\n  cp) cat > '{}' ;;\nesac\n",
        received.display()
      ),
    );

    engine
      .copy_in(&ContainerId("c".to_string()), "/app", vec![7u8; 256 * 1024])
      .await
      .unwrap();

    assert_eq!(std::fs::read(&received).unwrap().len(), 256 * 1024);
  }
}
