//! Command implementations and the output plumbing they share.

pub mod analyze;
pub mod config;
pub mod gps;
pub mod models;

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use clap::ValueEnum;
use coastwatch_core::{Config, OutputFormat, RecordWriter};

/// Output formats accepted on the command line.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum FormatArg {
    /// Single JSON object, or an array for several inputs
    Json,
    /// One JSON object per line
    Jsonl,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Json => OutputFormat::Json,
            FormatArg::Jsonl => OutputFormat::JsonLines,
        }
    }
}

/// Open a record writer on `output` (stdout when `None`).
///
/// Flags win over the `[output]` config section.
pub fn open_writer(
    config: &Config,
    output: Option<&Path>,
    format: Option<FormatArg>,
    pretty: bool,
) -> anyhow::Result<RecordWriter<Box<dyn Write>>> {
    let format = match format {
        Some(arg) => arg.into(),
        None => config
            .output
            .format
            .parse::<OutputFormat>()
            .map_err(anyhow::Error::msg)?,
    };

    let sink: Box<dyn Write> = match output {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(io::stdout()),
    };

    Ok(RecordWriter::new(sink, format, pretty || config.output.pretty))
}
