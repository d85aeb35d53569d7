//! The `coastwatch gps` command.

use std::path::PathBuf;

use clap::Args;
use coastwatch_core::pipeline::FileDiscovery;
use coastwatch_core::{Config, GeoTag, GeoTagExtractor};
use serde::Serialize;

use super::{open_writer, FormatArg};

/// Arguments for the `gps` command.
#[derive(Args, Debug)]
pub struct GpsArgs {
    /// Image files or directories
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Output file (defaults to stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Output format (defaults to `output.format` from config)
    #[arg(short, long, value_enum)]
    pub format: Option<FormatArg>,

    /// Pretty-print JSON output
    #[arg(long)]
    pub pretty: bool,

    /// Only print images that carry a GPS position
    #[arg(long)]
    pub located_only: bool,
}

#[derive(Serialize)]
struct GpsRecord {
    file: PathBuf,
    #[serde(flatten)]
    location: GeoTag,
}

pub fn execute(args: GpsArgs, config: &Config) -> anyhow::Result<()> {
    let discovery = FileDiscovery::new(&config.processing);
    let mut files = Vec::new();
    for input in &args.inputs {
        if !input.exists() {
            anyhow::bail!("Input not found: {}", input.display());
        }
        files.extend(discovery.discover(input).files);
    }

    let mut writer = open_writer(config, args.output.as_deref(), args.format, args.pretty)?;
    let mut located = 0usize;
    for file in &files {
        let location = GeoTagExtractor::extract(file);
        located += usize::from(location.has_gps);
        if args.located_only && !location.has_gps {
            continue;
        }
        writer.push(&GpsRecord {
            file: file.clone(),
            location,
        })?;
    }
    writer.finish()?;

    tracing::info!("{} of {} images carry a GPS position", located, files.len());
    Ok(())
}
