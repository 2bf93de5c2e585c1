//! `plugpack` command-line tool.
//!
//! Builds plugin packages (`.cs3`) from compiled module outputs, writes the
//! `plugins.json` registry, checks archives for cross-platform compatibility
//! and deploys packages to a device.
//!
//! # Examples
//!
//! ```bash
//! # Build every module and the registry
//! plugpack build
//!
//! # Build one module without using cached stage results
//! plugpack build --module ExampleProvider --no-cache
//!
//! # Push it to the connected device
//! plugpack deploy ExampleProvider
//! ```

#![allow(clippy::unused_async)]

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use plugpack_cli::commands;
use plugpack_cli::commands::common::{exit_code_for, hint_for};
use plugpack_core::CONFIG_FILE;
use plugpack_core::cli::{ExitCode, OutputFormat};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Plugin package builder.
#[derive(Parser, Debug)]
#[command(name = "plugpack")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format (json, text, pretty)
    #[arg(long = "format", global = true, default_value = "pretty")]
    format: String,

    /// Workspace configuration file
    #[arg(short, long, global = true, env = "PLUGPACK_CONFIG", default_value = CONFIG_FILE)]
    config: PathBuf,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build plugin packages.
    ///
    /// Without `--module`, builds every module and writes `plugins.json`.
    /// With it, builds only the named modules and leaves the registry alone.
    Build {
        /// Module to build (repeatable)
        #[arg(short, long = "module", num_args = 1)]
        modules: Vec<String>,

        /// Run every stage even if its inputs did not change
        #[arg(long)]
        no_cache: bool,
    },

    /// Rewrite `plugins.json` from the packages already built.
    Registry,

    /// Check an archive for references to platform-only packages.
    Check {
        /// Archive to analyze
        archive: PathBuf,

        /// Analyzer program (default: toolchain.analyzer)
        #[arg(long)]
        analyzer: Option<String>,
    },

    /// Push a built package to the device.
    Deploy {
        /// Module to deploy
        module: String,
    },

    /// Report which external tools are available.
    Setup,

    /// Remove the build directory.
    Clean,

    /// Generate shell completions.
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let exit_code = match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            if let Some(hint) = hint_for(&e) {
                eprintln!("Hint: {hint}");
            }
            exit_code_for(&e)
        }
    };

    std::process::exit(exit_code.as_i32());
}

/// Installs the stderr log subscriber.
///
/// `--verbose` forces the `debug` level; otherwise `RUST_LOG` applies,
/// defaulting to `info`.
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let output_format = cli.format.parse::<OutputFormat>()?;
    let config = cli.config;

    match cli.command {
        Commands::Build { modules, no_cache } => {
            commands::build::run(&config, modules, no_cache, output_format).await
        }
        Commands::Registry => commands::registry::run(&config, output_format).await,
        Commands::Check { archive, analyzer } => {
            commands::check::run(&archive, analyzer, &config, output_format).await
        }
        Commands::Deploy { module } => commands::deploy::run(&module, &config, output_format).await,
        Commands::Setup => commands::setup::run(&config, output_format).await,
        Commands::Clean => commands::clean::run(&config, output_format).await,
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            commands::completions::run(shell, &mut cmd).await
        }
    }
}
