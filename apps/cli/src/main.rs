//! Kontext CLI - FLUX LoRA training-data pipeline
//!
//! This CLI provides a `kontext` command that prepares a training set,
//! submits it for LoRA fine-tuning, and works with the resulting model.

mod commands;
mod config;

use anyhow::Context;
use clap::{CommandFactory, Parser, Subcommand};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::Level;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt};

use commands::{generate, predict, submit, train, upload, version};
use config::CliConfig;

/// Kontext CLI - FLUX LoRA training pipeline
///
/// Collects and validates portrait photos, packages them with captions,
/// trains a LoRA on Replicate, and generates thumbnails with the result.
#[derive(Parser, Debug)]
#[command(name = "kontext", author, version, about = "Kontext - FLUX LoRA training pipeline")]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    /// Configuration file (defaults to ~/.kontext/config.toml merged with ./kontext.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the full pipeline
    ///
    /// Collects images, validates them, packages the archive, submits the
    /// training, follows it to completion and smoke-tests the new model.
    Train {
        /// Directory with the source photos
        #[arg(long)]
        source: Option<PathBuf>,

        /// Directory for the archive and the run report
        #[arg(long)]
        output: Option<PathBuf>,

        /// Output the run report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Start a training from an existing archive
    Submit {
        /// Path to a training archive (zip)
        archive: PathBuf,

        /// Follow the job until it finishes
        #[arg(long)]
        wait: bool,

        /// Output results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Generate a batch of thumbnails with a trained model
    Generate {
        /// Output directory
        #[arg(long)]
        output: Option<PathBuf>,

        /// Model, `owner/name` or `owner/name:version`
        #[arg(long)]
        model: Option<String>,

        /// Output results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Generate a single image and print its URL
    Predict {
        /// Prompt text
        #[arg(long)]
        prompt: Option<String>,

        /// Model, `owner/name` or `owner/name:version`
        #[arg(long)]
        model: Option<String>,
    },

    /// Print the latest version id of a model
    Version {
        /// Model, `owner/name`
        #[arg(long)]
        model: Option<String>,
    },

    /// Upload JPEGs to Supabase Storage
    Upload {
        /// Directory with the images
        #[arg(long)]
        dir: Option<PathBuf>,

        /// Target bucket
        #[arg(long)]
        bucket: Option<String>,

        /// Output results as JSON
        #[arg(long)]
        json: bool,
    },
}

fn parse_level(level: &str) -> Level {
    match level {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// `--log-level` wins, then `RUST_LOG`, then the configured level.
fn log_filter(cli_level: Option<&str>, config_level: Option<&str>) -> EnvFilter {
    let from_level = |level: &str| EnvFilter::default().add_directive(LevelFilter::from_level(parse_level(level)).into());
    if let Some(level) = cli_level {
        return from_level(level);
    }
    EnvFilter::try_from_default_env().unwrap_or_else(|_| from_level(config_level.unwrap_or("info")))
}

/// Log to stdout and append to `log_file`.
fn init_logging(filter: EnvFilter, log_file: &Path) -> anyhow::Result<()> {
    if let Some(parent) = log_file.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)
        .with_context(|| format!("Failed to open log file {}", log_file.display()))?;

    let writer = BoxMakeWriter::new(std::io::stdout.and(Mutex::new(file)));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(false)
        .with_writer(writer)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // If no command provided, show help
    let Some(command) = args.command else {
        Args::command().print_help()?;
        return Ok(());
    };

    let cli_config = CliConfig::discover_and_load(args.config.as_deref())?;

    let filter = log_filter(args.log_level.as_deref(), cli_config.log_level.as_deref());
    init_logging(filter, &cli_config.log_file())?;

    match command {
        Command::Train { source, output, json } => {
            train::execute(&cli_config, source, output, json).await?;
        }
        Command::Submit { archive, wait, json } => {
            submit::execute(&cli_config, archive, wait, json).await?;
        }
        Command::Generate { output, model, json } => {
            generate::execute(&cli_config, output, model, json).await?;
        }
        Command::Predict { prompt, model } => {
            predict::execute(&cli_config, prompt, model).await?;
        }
        Command::Version { model } => {
            version::execute(&cli_config, model).await?;
        }
        Command::Upload { dir, bucket, json } => {
            upload::execute(&cli_config, dir, bucket, json).await?;
        }
    }

    Ok(())
}
