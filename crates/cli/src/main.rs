mod cmd;
mod output;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use omd_ci_lib::Job;

use cmd::{cmd_list, cmd_plan, cmd_run, cmd_verify};
use output::{OutputFormat, print_error};

/// omd-ci - Container test and release pipeline for oh-my-droid
#[derive(Parser)]
#[command(name = "omd-ci")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Args)]
struct ReleaseArgs {
  /// Target triple (overrides $TARGET)
  #[arg(long)]
  target: Option<String>,

  /// Release tag (overrides $TAG)
  #[arg(long)]
  tag: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
  /// Run a pipeline job (test or build)
  Run {
    /// Job to run
    job: Job,

    /// Source directory uploaded into the container
    #[arg(default_value = ".")]
    src: PathBuf,

    #[command(flatten)]
    release: ReleaseArgs,

    /// Directory receiving exported artifacts (default: current directory)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Extra options passed to `cargo test`
    #[arg(last = true)]
    options: Vec<String>,
  },

  /// List available jobs
  List {
    #[arg(short, long, value_enum, default_value_t)]
    output: OutputFormat,
  },

  /// Show the steps a job would run
  Plan {
    /// Job to plan
    job: Job,

    /// Source directory uploaded into the container
    #[arg(default_value = ".")]
    src: PathBuf,

    #[command(flatten)]
    release: ReleaseArgs,

    #[arg(short, long, value_enum, default_value_t)]
    output: OutputFormat,

    /// Extra options passed to `cargo test`
    #[arg(last = true)]
    options: Vec<String>,
  },

  /// Verify an exported release archive against its checksum
  Verify {
    /// Directory holding the archive and checksum
    #[arg(short, long, default_value = ".")]
    dir: PathBuf,

    #[command(flatten)]
    release: ReleaseArgs,

    #[arg(short, long, value_enum, default_value_t)]
    output: OutputFormat,
  },
}

fn main() {
  let cli = Cli::parse();

  let filter = if cli.verbose {
    EnvFilter::new("debug")
  } else {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("omd_ci_lib=info"))
  };
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  if let Err(e) = dispatch(cli.command) {
    print_error(&format!("{:#}", e));
    std::process::exit(1);
  }
}

fn dispatch(command: Commands) -> Result<()> {
  match command {
    Commands::Run {
      job,
      src,
      release,
      output_dir,
      options,
    } => cmd_run(job, &src, release.target, release.tag, output_dir, &options),
    Commands::List { output } => cmd_list(output),
    Commands::Plan {
      job,
      src,
      release,
      output,
      options,
    } => cmd_plan(job, &src, release.target, release.tag, &options, output),
    Commands::Verify { dir, release, output } => cmd_verify(dir, release.target, release.tag, output),
  }
}
