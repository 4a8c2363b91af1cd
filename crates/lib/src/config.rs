//! Invocation configuration.
//!
//! Every value a stage needs from the outside world is resolved here, once,
//! before any container work starts. Stages only ever see a `&PipelineConfig`.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::consts::{
  BINARY_NAME, CROSS_INCLUDE_PATH, DEFAULT_ENGINE, DEFAULT_TAG, DEFAULT_TARGET, ENGINE_ENV, NATIVE_INCLUDE_PATH,
  TAG_ENV, TARGET_ENV,
};

/// Resolved settings for a single pipeline invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineConfig {
  /// Target triple passed to `rustup` and `cargo build --target`.
  pub target: String,
  /// Release tag embedded in artifact names.
  pub tag: String,
  /// Local source directory uploaded into the container.
  pub source: PathBuf,
  /// Local directory receiving exported artifacts.
  pub output_dir: PathBuf,
  /// Container engine binary (`docker`, `podman`, ...).
  pub engine: String,
}

impl Default for PipelineConfig {
  fn default() -> Self {
    Self {
      target: DEFAULT_TARGET.to_string(),
      tag: DEFAULT_TAG.to_string(),
      source: PathBuf::from("."),
      output_dir: PathBuf::from("."),
      engine: DEFAULT_ENGINE.to_string(),
    }
  }
}

impl PipelineConfig {
  /// Resolve configuration from the process environment.
  pub fn from_env() -> Self {
    Self::from_lookup(|key| std::env::var(key).ok())
  }

  /// Resolve configuration through an arbitrary lookup function.
  ///
  /// Empty values are treated the same as unset ones.
  pub fn from_lookup<F>(lookup: F) -> Self
  where
    F: Fn(&str) -> Option<String>,
  {
    let get = |key: &str, default: &str| {
      lookup(key)
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| default.to_string())
    };

    Self {
      target: get(TARGET_ENV, DEFAULT_TARGET),
      tag: get(TAG_ENV, DEFAULT_TAG),
      engine: get(ENGINE_ENV, DEFAULT_ENGINE),
      ..Self::default()
    }
  }

  pub fn with_target(mut self, target: impl Into<String>) -> Self {
    self.target = target.into();
    self
  }

  pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
    self.tag = tag.into();
    self
  }

  pub fn with_source(mut self, source: impl Into<PathBuf>) -> Self {
    self.source = source.into();
    self
  }

  pub fn with_output_dir(mut self, output_dir: impl Into<PathBuf>) -> Self {
    self.output_dir = output_dir.into();
    self
  }

  /// Whether the target is the build image's own architecture.
  pub fn is_native(&self) -> bool {
    self.target == DEFAULT_TARGET
  }

  /// Value of `PKG_CONFIG_ALLOW_CROSS` inside the build container.
  pub fn pkg_config_allow_cross(&self) -> &'static str {
    if self.is_native() { "0" } else { "1" }
  }

  /// Value of `C_INCLUDE_PATH` inside the build container.
  pub fn c_include_path(&self) -> &'static str {
    if self.is_native() {
      NATIVE_INCLUDE_PATH
    } else {
      CROSS_INCLUDE_PATH
    }
  }

  /// Release archive file name, e.g. `oh-my-droid_v1.2.3_aarch64-unknown-linux-gnu.tar.gz`.
  pub fn artifact_name(&self) -> String {
    format!("{}_{}_{}.tar.gz", BINARY_NAME, self.tag, self.target)
  }

  /// Checksum file name: the archive name with `.sha256` appended.
  pub fn checksum_name(&self) -> String {
    format!("{}.sha256", self.artifact_name())
  }

  pub fn artifact_path(&self) -> PathBuf {
    self.output_dir.join(self.artifact_name())
  }

  pub fn checksum_path(&self) -> PathBuf {
    self.output_dir.join(self.checksum_name())
  }

  pub fn source(&self) -> &Path {
    &self.source
  }
}
