//! Command-line interface definitions.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Runs one mkvmerge command line over every episode next to its sources.
#[derive(Parser, Debug)]
#[command(name = "mkvbatch", version, about, long_about = None)]
pub struct Cli {
    /// Path to the configuration file.
    #[arg(short, long, env = "MKVBATCH_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Log level forced by verbosity flags, if any.
    pub fn log_level(&self) -> Option<&'static str> {
        match self.verbose {
            0 => None,
            1 => Some("debug"),
            _ => Some("trace"),
        }
    }
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Parse a command line and print its analysis.
    Check {
        /// mkvmerge command line, as copied from MKVToolNix GUI.
        command: String,
    },

    /// Print every command of the batch without running anything.
    Show {
        /// mkvmerge command line, as copied from MKVToolNix GUI.
        command: String,
    },

    /// Verify, adjust and run every command of the batch.
    Run(RunArgs),

    /// Find mkvmerge and print its version.
    Locate,
}

/// Arguments for the run subcommand.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// mkvmerge command line, as copied from MKVToolNix GUI.
    pub command: String,

    /// Verify and adjust, but do not run mkvmerge.
    #[arg(long, default_value = "false")]
    pub dry_run: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_run_with_global_flags() {
        let cli = Cli::try_parse_from([
            "mkvbatch",
            "run",
            "mkvmerge --output out.mkv ( in.mkv )",
            "--dry-run",
            "-vv",
            "--config",
            "batch.yaml",
        ])
        .unwrap();

        assert_eq!(cli.log_level(), Some("trace"));
        assert_eq!(cli.config, Some(PathBuf::from("batch.yaml")));
        match cli.command {
            Commands::Run(args) => {
                assert!(args.dry_run);
                assert!(args.command.starts_with("mkvmerge"));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn locate_takes_no_arguments() {
        let cli = Cli::try_parse_from(["mkvbatch", "locate"]).unwrap();
        assert!(matches!(cli.command, Commands::Locate));
        assert_eq!(cli.log_level(), None);
        assert!(Cli::try_parse_from(["mkvbatch", "check"]).is_err());
    }
}
