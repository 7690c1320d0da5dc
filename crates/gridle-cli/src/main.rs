//! Gridle front end - configure and supervise solver runs.

mod build;
mod colors;
mod overrides;
mod run;
mod seed;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use gridle_core::{SpawnError, supervisor::EXECUTABLE_ENV};

use crate::overrides::ConfigArgs;

#[derive(Parser)]
#[command(name = "gridle-run")]
#[command(about = "Configure and run the Gridle solver")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the merged configuration without running anything
    Build {
        #[command(flatten)]
        config: ConfigArgs,
    },

    /// Merge the configuration and run the solver
    Run {
        #[command(flatten)]
        config: ConfigArgs,

        /// Path to the solver executable
        #[arg(long)]
        executable: Option<PathBuf>,

        /// Directory to run the solver in (default: the executable's directory)
        #[arg(long)]
        working_dir: Option<PathBuf>,
    },

    /// Build a configuration from the solver's preprocess report
    Seed {
        /// Path to the defaults document
        #[arg(long)]
        defaults: PathBuf,

        /// File holding the solver's preprocess output
        #[arg(long)]
        report: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        tracing_subscriber::EnvFilter::from_default_env()
            .add_directive(tracing::Level::DEBUG.into())
    } else {
        tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    // Point at the fix when the solver cannot be found
    let format_error = |err: anyhow::Error| -> anyhow::Error {
        match err.downcast_ref::<SpawnError>() {
            Some(SpawnError::ExecutableNotFound(_)) => anyhow::anyhow!(
                "{err}\n  hint: pass --executable or set {EXECUTABLE_ENV}"
            ),
            _ => err,
        }
    };

    match cli.command {
        Commands::Build { config } => build::execute(&config).map_err(format_error)?,

        Commands::Run {
            config,
            executable,
            working_dir,
        } => {
            run::execute(&config, executable.as_deref(), working_dir.as_deref())
                .await
                .map_err(format_error)?;
        }

        Commands::Seed { defaults, report } => {
            seed::execute(&defaults, &report).map_err(format_error)?;
        }
    }

    Ok(())
}
