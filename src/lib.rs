//! mkvbatch - turns one mkvmerge command line into a batch of commands.
//!
//! A command line written for the first episode of a series is parsed into a
//! template, every file next to its sources becomes one batch entry, and each
//! entry is verified and, when its track layout differs, adjusted before
//! mkvmerge runs.

pub mod cli;
pub mod config;
pub mod error;
pub mod media;
pub mod mkv;
pub mod process;

use std::path::PathBuf;

use anyhow::Result;
use tracing::{error, info, info_span, warn};

use crate::cli::{Cli, Commands, RunArgs};
use crate::config::{AppConfig, LogFormat};
use crate::error::{AppError, BatchError};
use crate::media::{verify_structure, InspectCache, MkvmergeInspector, TrackInspector};
use crate::mkv::{adjust_sources, paths, Adjustment, MkvCommand};
use crate::process::{mkvmerge_version, CommandRunner};

/// Runs mkvbatch with the provided CLI arguments.
pub async fn run(cli: Cli) -> Result<()> {
    let config = config::load_or_default(cli.config.as_deref())?;
    let level = cli.log_level().unwrap_or(config.log_level.as_str());
    setup_logging(level, config.log_format)?;
    config::ensure_valid(&config)?;

    match cli.command {
        Commands::Check { command } => check_command(&command, &config),
        Commands::Show { command } => show_commands(&command, &config),
        Commands::Run(args) => run_batch(args, &config).await,
        Commands::Locate => Ok(locate(&config).await?),
    }
}

/// Initializes the tracing subscriber. Logs go to stderr so generated
/// commands can be piped from stdout.
fn setup_logging(level: &str, format: LogFormat) -> Result<()> {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    match format {
        LogFormat::Text => fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init(),
        LogFormat::Json => fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .json()
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .try_init(),
    }
    .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))
}

/// How one batch index will be handled.
#[derive(Debug, Clone, PartialEq, Eq)]
enum IndexStatus {
    Ready,
    Adjusted,
    Skipped(String),
}

fn parse_command(raw: &str, config: &AppConfig) -> Result<MkvCommand> {
    let command = MkvCommand::parse(raw, config.parse_options());
    if !command.is_ok() {
        eprint!("{}", command.analysis());
        anyhow::bail!(BatchError::InvalidCommand {
            error_count: command.analysis().error_count()
        });
    }
    Ok(command)
}

/// mkvmerge used for inspection: the configured one, the command's own
/// executable, or one found on the system.
fn inspection_mkvmerge(command: &MkvCommand, config: &AppConfig) -> Result<PathBuf, AppError> {
    let mkvmerge = config
        .mkvmerge
        .clone()
        .or_else(|| command.executable().filter(|p| p.is_file()).map(PathBuf::from))
        .or_else(paths::locate_mkvmerge)
        .ok_or(BatchError::MkvmergeNotFound)?;
    Ok(mkvmerge)
}

/// Verifies and adjusts every batch index.
fn prepare(command: &mut MkvCommand, config: &AppConfig, inspector: &dyn TrackInspector) -> Vec<IndexStatus> {
    if config.titles_from_source {
        command.apply_source_titles(inspector);
    }

    let base_files = command.base_files();
    (0..command.len())
        .map(|index| {
            let _span = info_span!("index", index).entered();

            if config.verify_structure {
                let sources = command.source_files(index);
                let destination = command.destination_files().get(index).cloned();
                let report = verify_structure(&base_files, &sources, destination.as_deref(), inspector);
                if report.is_ok() {
                    return IndexStatus::Ready;
                }
                if !config.adjust_tracks {
                    return IndexStatus::Skipped("structure does not match the base files".to_string());
                }
            } else if !config.adjust_tracks {
                return IndexStatus::Ready;
            }

            match adjust_sources(command, index, inspector) {
                Ok(Adjustment::Matched) => IndexStatus::Ready,
                Ok(Adjustment::Adjusted { .. }) => IndexStatus::Adjusted,
                Ok(Adjustment::Unresolvable { reason }) => IndexStatus::Skipped(reason),
                Err(e) => IndexStatus::Skipped(e.to_string()),
            }
        })
        .collect()
}

/// Parses a command line and prints its analysis.
fn check_command(raw: &str, config: &AppConfig) -> Result<()> {
    let command = parse_command(raw, config)?;

    print!("{}", command.analysis());
    println!();
    println!("Template: {}", command.template_string());
    println!("Batch size: {}", command.len());
    Ok(())
}

/// Prints every command of the batch after verification and adjustment.
fn show_commands(raw: &str, config: &AppConfig) -> Result<()> {
    let mut command = parse_command(raw, config)?;
    let mkvmerge = MkvmergeInspector::new(inspection_mkvmerge(&command, config)?);
    let inspector = InspectCache::new(&mkvmerge);

    let statuses = prepare(&mut command, config, &inspector);
    for (line, status) in command.commands().iter().zip(&statuses) {
        match status {
            IndexStatus::Skipped(reason) => println!("# skipped ({}): {}", reason, line),
            IndexStatus::Adjusted => println!("# adjusted\n{}", line),
            IndexStatus::Ready => println!("{}", line),
        }
    }
    Ok(())
}

/// Verifies, adjusts and runs every command of the batch.
async fn run_batch(args: RunArgs, config: &AppConfig) -> Result<()> {
    let mut command = parse_command(&args.command, config)?;
    let statuses = {
        let mkvmerge = MkvmergeInspector::new(inspection_mkvmerge(&command, config)?);
        let inspector = InspectCache::new(&mkvmerge);
        prepare(&mut command, config, &inspector)
    };

    info!(size = command.len(), dry_run = args.dry_run, "Starting batch");

    let runner = CommandRunner::new();
    let mut succeeded = 0;
    let mut failed = 0;
    let adjusted = statuses.iter().filter(|s| **s == IndexStatus::Adjusted).count();
    let mut skipped = 0;

    for (index, status) in statuses.iter().enumerate() {
        let entry = command.entry(index)?;
        if let IndexStatus::Skipped(reason) = status {
            warn!(index, output = %entry.output_file.display(), reason = %reason, "Skipping command");
            skipped += 1;
            continue;
        }

        if args.dry_run {
            println!("{}", entry.command);
            succeeded += 1;
            continue;
        }

        info!(index, output = %entry.output_file.display(), "Running mkvmerge");
        let mut on_line = |line: &str| info!(index, "{}", line);
        match runner.run(&entry.args, &mut on_line).await {
            Ok(output) => {
                let interrupted = output.interrupted;
                match output.ensure_mkvmerge_ok() {
                    Ok(()) => succeeded += 1,
                    Err(e) => {
                        error!(index, error = %e, "Command failed");
                        failed += 1;
                    }
                }
                if interrupted {
                    warn!("Batch interrupted");
                    break;
                }
            }
            Err(e) => {
                error!(index, error = %e, "Command could not run");
                failed += 1;
            }
        }

        if failed > 0 && config.stop_on_error {
            warn!("Stopping at first failure");
            break;
        }
    }

    println!(
        "{} succeeded, {} adjusted, {} skipped, {} failed",
        succeeded, adjusted, skipped, failed
    );

    if failed > 0 {
        anyhow::bail!("{} command(s) failed", failed);
    }
    Ok(())
}

/// Prints the mkvmerge path and version.
async fn locate(config: &AppConfig) -> Result<(), AppError> {
    let mkvmerge = config
        .mkvmerge
        .clone()
        .or_else(paths::locate_mkvmerge)
        .ok_or(BatchError::MkvmergeNotFound)?;

    let version = mkvmerge_version(&mkvmerge).await?;
    println!("{}", mkvmerge.display());
    println!("Version: {}", version.as_deref().unwrap_or("unknown"));
    Ok(())
}
