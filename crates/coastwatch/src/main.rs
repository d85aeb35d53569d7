//! Coastwatch CLI - classify coastal pollution photos and read their geotags.
//!
//! Each photo is classified as plastic, oil spill, marine debris, other solid
//! waste, or clean water, with a confidence band and a human-review flag.
//!
//! # Usage
//!
//! ```bash
//! # Classify a single upload
//! coastwatch analyze upload.jpg
//!
//! # Classify a directory of uploads as JSON Lines
//! coastwatch analyze ./uploads/ --format jsonl --output results.jsonl
//!
//! # Classification plus GPS position, as the upload workflow stores it
//! coastwatch assess upload.jpg
//!
//! # GPS position only
//! coastwatch gps upload.jpg
//!
//! # Check which backends have their model files
//! coastwatch models status
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use coastwatch_core::Config;

mod cli;
mod logging;

/// Coastwatch - coastal pollution photo classification and triage.
#[derive(Parser, Debug)]
#[command(name = "coastwatch")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    /// Config file (defaults to the platform config directory)
    #[arg(long, global = true, env = "COASTWATCH_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Classify uploads and print the frontend view
    Analyze(cli::analyze::AnalyzeArgs),

    /// Classify uploads and read their GPS position
    Assess(cli::analyze::AnalyzeArgs),

    /// Read GPS positions from EXIF
    Gps(cli::gps::GpsArgs),

    /// Inspect classification model files
    Models(cli::models::ModelsArgs),

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logging isn't initialized yet, so config warnings go through eprintln.
    let loaded = match &cli.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "Warning: Failed to load config: {e}\n  \
                 Using default configuration. Check your config file with `coastwatch config path`."
            );
            Config::default()
        }
    };
    logging::init_from_config(&config, cli.verbose, cli.json_logs);

    tracing::debug!("Coastwatch v{}", coastwatch_core::VERSION);

    match cli.command {
        Commands::Analyze(args) => {
            cli::analyze::execute(args, config, cli::analyze::Mode::Classify).await
        }
        Commands::Assess(args) => {
            cli::analyze::execute(args, config, cli::analyze::Mode::Assess).await
        }
        Commands::Gps(args) => cli::gps::execute(args, &config),
        Commands::Models(args) => cli::models::execute(args, &config),
        Commands::Config(args) => cli::config::execute(args, &config, cli.config.as_deref()),
    }
}
