//! Build stage: cross-compile `oh-my-droid` and package a release archive.
//!
//! The plan registers the ARM architectures with dpkg, installs the cross
//! toolchains, uploads the source, compiles for `config.target`, then tars
//! the binary with its docs into the release-asset cache and checksums it.
//! Both files are copied back into the working directory so they can be
//! exported to `config.output_dir` under the same names.

use std::sync::Arc;

use tracing::{info, warn};

use super::PipelineError;
use crate::config::PipelineConfig;
use crate::consts::{
  ASSETS_CACHE, ASSETS_CACHE_PATH, BASE_IMAGE, BINARY_NAME, CROSS_PACKAGES, FOREIGN_ARCHITECTURES, PACKAGED_DOCS,
  REGISTRY_CACHE, REGISTRY_CACHE_PATH, SYSROOT_DIR, TARGET_CACHE, TARGET_CACHE_PATH, WORKDIR,
};
use crate::container::Container;
use crate::context::ExecutionContext;
use crate::engine::ContainerEngine;
use crate::execute::Runner;
use crate::rustflags::rust_flags;

/// Plan for the build stage.
pub fn build_pipeline(context: Arc<ExecutionContext>, config: &PipelineConfig) -> Container {
  let rustflags = rust_flags(&config.target);
  let archive = format!("{}_${{TAG}}_${{TARGET}}.tar.gz", BINARY_NAME);
  let assets_archive = format!("{}/{}", ASSETS_CACHE_PATH, archive);

  let mut container = Container::new().from(BASE_IMAGE);
  for arch in FOREIGN_ARCHITECTURES {
    container = container.with_exec(["dpkg", "--add-architecture", *arch]);
  }

  let mut install = vec!["apt-get", "install", "-y", "-qq"];
  install.extend_from_slice(CROSS_PACKAGES);

  container
    .with_exec(["apt-get", "update"])
    .with_exec(["apt-get", "install", "-y", "build-essential"])
    .with_exec(install)
    .with_exec(["mkdir", "-p", SYSROOT_DIR])
    .with_directory(WORKDIR, context)
    .with_workdir(WORKDIR)
    .with_mounted_cache(TARGET_CACHE_PATH, TARGET_CACHE)
    .with_mounted_cache(REGISTRY_CACHE_PATH, REGISTRY_CACHE)
    .with_mounted_cache(ASSETS_CACHE_PATH, ASSETS_CACHE)
    .with_env_variable("RUSTFLAGS", rustflags)
    .with_env_variable("PKG_CONFIG_ALLOW_CROSS", config.pkg_config_allow_cross())
    .with_env_variable("C_INCLUDE_PATH", config.c_include_path())
    .with_env_variable("TAG", config.tag.clone())
    .with_env_variable("TARGET", config.target.clone())
    .with_shell("rustup target add $TARGET")
    .with_shell("cargo build --release --target $TARGET")
    .with_shell(format!("cp target/${{TARGET}}/release/{} .", BINARY_NAME))
    .with_shell(format!(
      "tar czvf {} {} {}",
      assets_archive,
      BINARY_NAME,
      PACKAGED_DOCS.join(" ")
    ))
    .with_shell(format!("shasum -a 256 {0} > {0}.sha256", assets_archive))
    .with_shell(format!("cp {} .", assets_archive))
    .with_shell(format!("cp {}.sha256 .", assets_archive))
}

/// Run the build stage and export the archive and its checksum.
///
/// Nothing is exported unless every step succeeded. Returns the stdout of the
/// last step.
pub async fn run_build(engine: &dyn ContainerEngine, config: &PipelineConfig) -> Result<String, PipelineError> {
  let context = ExecutionContext::load(config.source())?;
  info!(
    source = %context.root().display(),
    hash = %context.content_hash()?,
    target = %config.target,
    tag = %config.tag,
    native = config.is_native(),
    "running build stage"
  );

  let plan = build_pipeline(Arc::new(context), config);
  let session = Runner::new(engine).run(&plan).await?;

  for (name, dest) in [
    (config.artifact_name(), config.artifact_path()),
    (config.checksum_name(), config.checksum_path()),
  ] {
    let src = format!("{}/{}", WORKDIR, name);
    if let Err(source) = session.export(&src, &dest).await {
      if let Err(e) = session.close().await {
        warn!(error = %e, "failed to remove container after export failure");
      }
      return Err(PipelineError::Export { src, source });
    }
  }

  info!(
    archive = %config.artifact_path().display(),
    checksum = %config.checksum_path().display(),
    "artifacts exported"
  );
  session.close().await.map_err(PipelineError::Cleanup)
}
