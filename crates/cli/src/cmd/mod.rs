mod list;
mod plan;
mod run;
mod verify;

use std::path::{Path, PathBuf};

use omd_ci_lib::PipelineConfig;

pub use list::cmd_list;
pub use plan::cmd_plan;
pub use run::cmd_run;
pub use verify::cmd_verify;

/// Environment first, then command-line overrides.
pub(crate) fn resolve_config(
  src: &Path,
  target: Option<String>,
  tag: Option<String>,
  output_dir: Option<PathBuf>,
) -> PipelineConfig {
  let mut config = PipelineConfig::from_env().with_source(src);
  if let Some(target) = target {
    config = config.with_target(target);
  }
  if let Some(tag) = tag {
    config = config.with_tag(tag);
  }
  if let Some(dir) = output_dir {
    config = config.with_output_dir(dir);
  }
  config
}
