//! CLI Module
//!
//! Command-line interface for the Masterline mastering pipeline.

pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Masterline - tiered offline audio mastering
#[derive(Parser, Debug)]
#[command(name = "masterline")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Master one audio file into a full render and a preview
    #[command(name = "master")]
    Master {
        /// Input audio file
        input: PathBuf,

        /// Tier: free, basic or premium (unknown values use basic)
        #[arg(short, long, default_value = "basic")]
        tier: String,

        /// Output directory (defaults to the input's directory)
        #[arg(short, long)]
        out_dir: Option<PathBuf>,

        /// JSON config file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Master every audio file under a directory
    #[command(name = "batch")]
    Batch {
        /// Directory to scan recursively
        dir: PathBuf,

        /// Tier: free, basic or premium (unknown values use basic)
        #[arg(short, long, default_value = "basic")]
        tier: String,

        /// Output directory (defaults to each input's directory)
        #[arg(short, long)]
        out_dir: Option<PathBuf>,

        /// JSON config file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Compare the loudness of two files
    #[command(name = "analyze")]
    Analyze {
        /// Reference (unprocessed) audio
        original: PathBuf,

        /// Processed audio
        processed: PathBuf,
    },

    /// Print the stage list for a tier
    #[command(name = "chain")]
    Chain {
        /// Tier: free, basic or premium (unknown values use basic)
        #[arg(short, long, default_value = "basic")]
        tier: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_master_command() {
        let cli = Cli::parse_from([
            "masterline",
            "master",
            "song.mp3",
            "--tier",
            "premium",
            "--out-dir",
            "out",
        ]);
        match cli.command {
            Commands::Master {
                input,
                tier,
                out_dir,
                config,
            } => {
                assert_eq!(input, PathBuf::from("song.mp3"));
                assert_eq!(tier, "premium");
                assert_eq!(out_dir, Some(PathBuf::from("out")));
                assert!(config.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_tier_defaults_to_basic() {
        let cli = Cli::parse_from(["masterline", "-v", "chain"]);
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::Chain { ref tier } if tier == "basic"));
    }
}
