//! Masterline CLI - Tiered Audio Mastering
//!
//! Command-line interface for the Masterline mastering pipeline.

use anyhow::{bail, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use masterline::cli::{commands, Cli, Commands};
use masterline::{Mastering, Tier};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging; RUST_LOG overrides the default level
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    info!("Masterline v{}", env!("CARGO_PKG_VERSION"));

    handle_command(cli.command)
}

fn handle_command(cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Master {
            input,
            tier,
            out_dir,
            config,
        } => {
            let mastering = Mastering::new(commands::load_config(config.as_deref())?);
            commands::master_file(&mastering, &input, Tier::parse_lossy(&tier), out_dir.as_deref())?;
            Ok(())
        }
        Commands::Batch {
            dir,
            tier,
            out_dir,
            config,
        } => {
            let mastering = Mastering::new(commands::load_config(config.as_deref())?);
            let summary =
                commands::batch(&mastering, &dir, Tier::parse_lossy(&tier), out_dir.as_deref())?;
            if !summary.failed.is_empty() {
                bail!(
                    "{} of {} files failed",
                    summary.failed.len(),
                    summary.failed.len() + summary.mastered.len()
                );
            }
            Ok(())
        }
        Commands::Analyze {
            original,
            processed,
        } => {
            commands::analyze_files(&original, &processed)?;
            Ok(())
        }
        Commands::Chain { tier } => {
            commands::print_chain(&tier)?;
            Ok(())
        }
    }
}
