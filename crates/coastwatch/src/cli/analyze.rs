//! The `coastwatch analyze` and `coastwatch assess` commands.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::{Args, ValueEnum};
use coastwatch_core::config::BackendChoice;
use coastwatch_core::pipeline::FileDiscovery;
use coastwatch_core::types::NO_MODEL;
use coastwatch_core::{ClassificationView, Config, PollutionAnalyzer, UploadAssessment};
use futures_util::stream::{self, StreamExt};
use serde::Serialize;

use super::{open_writer, FormatArg};

/// Arguments shared by `analyze` and `assess`.
#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Image file or directory of uploads
    #[arg(required = true)]
    pub input: PathBuf,

    /// Output file (defaults to stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Output format (defaults to `output.format` from config)
    #[arg(short, long, value_enum)]
    pub format: Option<FormatArg>,

    /// Pretty-print JSON output
    #[arg(long)]
    pub pretty: bool,

    /// Number of uploads classified concurrently
    #[arg(short, long)]
    pub parallel: Option<usize>,

    /// Classification backend (defaults to `classifier.backend` from config)
    #[arg(short, long, value_enum)]
    pub backend: Option<BackendArg>,
}

/// Backend selection on the command line.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum BackendArg {
    /// Trained fixed-category model
    Grid,
    /// Zero-shot prompt scoring
    Semantic,
    /// Semantic if its files load, otherwise grid
    Auto,
}

impl From<BackendArg> for BackendChoice {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Grid => BackendChoice::Grid,
            BackendArg::Semantic => BackendChoice::Semantic,
            BackendArg::Auto => BackendChoice::Auto,
        }
    }
}

/// What to produce per upload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    /// Classification view only
    Classify,
    /// Classification plus GPS position
    Assess,
}

#[derive(Serialize)]
struct ViewRecord {
    file: PathBuf,
    #[serde(flatten)]
    view: ClassificationView,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Record {
    View(ViewRecord),
    Assessment(UploadAssessment),
}

impl Record {
    fn view(&self) -> &ClassificationView {
        match self {
            Self::View(record) => &record.view,
            Self::Assessment(assessment) => &assessment.classification,
        }
    }
}

pub async fn execute(args: AnalyzeArgs, mut config: Config, mode: Mode) -> anyhow::Result<()> {
    if let Some(backend) = args.backend {
        config.classifier.backend = backend.into();
    }
    if let Some(parallel) = args.parallel {
        anyhow::ensure!(parallel > 0, "--parallel must be at least 1");
        config.processing.parallel_workers = parallel;
    }

    if !args.input.exists() {
        anyhow::bail!("Input not found: {}", args.input.display());
    }
    let discovery = FileDiscovery::new(&config.processing).discover(&args.input);
    if discovery.files.is_empty() {
        anyhow::bail!("No supported images found at {}", args.input.display());
    }
    if discovery.skipped > 0 {
        tracing::info!("Skipping {} unsupported files", discovery.skipped);
    }

    let mut writer = open_writer(&config, args.output.as_deref(), args.format, args.pretty)?;
    let analyzer = PollutionAnalyzer::load(&config);

    let total = discovery.files.len();
    let progress = (total > 1).then(|| create_progress_bar(total as u64));
    let mut summary = Summary::default();
    let start = Instant::now();

    let mut outcomes = stream::iter(discovery.files)
        .map(|path| {
            let analyzer = analyzer.clone();
            async move {
                let outcome = match mode {
                    Mode::Classify => analyzer.analyze_image(&path).await.map(|view| {
                        Record::View(ViewRecord {
                            file: path.clone(),
                            view,
                        })
                    }),
                    Mode::Assess => analyzer.assess_upload(&path).await.map(Record::Assessment),
                };
                (path, outcome)
            }
        })
        .buffered(config.processing.parallel_workers);

    while let Some((path, outcome)) = outcomes.next().await {
        match outcome {
            Ok(record) => {
                summary.record(record.view());
                writer.push(&record)?;
            }
            Err(e) => {
                summary.failed += 1;
                tracing::error!("Failed: {:?} - {}", path, e);
            }
        }

        if let Some(pb) = &progress {
            pb.inc(1);
            let elapsed = start.elapsed().as_secs_f64();
            if elapsed > 0.0 {
                pb.set_message(format!("{:.1} img/sec", summary.processed() as f64 / elapsed));
            }
        }
    }

    writer.finish()?;
    if let Some(path) = &args.output {
        tracing::info!("Output written to {:?}", path);
    }

    if let Some(pb) = progress {
        pb.finish_and_clear();
        summary.print(start.elapsed());
    }

    Ok(())
}

/// Tallies for the end-of-run report.
#[derive(Debug, Default)]
struct Summary {
    by_label: BTreeMap<String, u64>,
    needs_review: u64,
    suspicious: u64,
    fallback: u64,
    failed: u64,
}

impl Summary {
    fn record(&mut self, view: &ClassificationView) {
        *self.by_label.entry(view.label.clone()).or_default() += 1;
        self.needs_review += u64::from(view.needs_review);
        self.suspicious += u64::from(view.is_suspicious);
        self.fallback += u64::from(view.model_used == NO_MODEL);
    }

    fn succeeded(&self) -> u64 {
        self.by_label.values().sum()
    }

    fn processed(&self) -> u64 {
        self.succeeded() + self.failed
    }

    fn print(&self, elapsed: Duration) {
        let rate = if elapsed.as_secs_f64() > 0.0 {
            self.processed() as f64 / elapsed.as_secs_f64()
        } else {
            0.0
        };

        eprintln!();
        eprintln!("  ====================================");
        eprintln!("               Summary");
        eprintln!("  ====================================");
        for (label, count) in &self.by_label {
            eprintln!("    {:<18}{:>8}", label, count);
        }
        eprintln!("  ------------------------------------");
        eprintln!("    Needs review:     {:>8}", self.needs_review);
        if self.suspicious > 0 {
            eprintln!("    Suspicious:       {:>8}", self.suspicious);
        }
        if self.fallback > 0 {
            eprintln!("    Unclassified:     {:>8}", self.fallback);
        }
        if self.failed > 0 {
            eprintln!("    Failed:           {:>8}", self.failed);
        }
        eprintln!("  ------------------------------------");
        eprintln!("    Total:            {:>8}", self.processed());
        eprintln!("    Duration:         {:>7.1}s", elapsed.as_secs_f64());
        eprintln!("    Rate:             {:>7.1} img/sec", rate);
        eprintln!("  ====================================");
    }
}

fn create_progress_bar(total: u64) -> indicatif::ProgressBar {
    use indicatif::{ProgressBar, ProgressStyle};

    let pb = ProgressBar::new(total);
    if let Ok(style) = ProgressStyle::default_bar().template(
        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}",
    ) {
        pb.set_style(style.progress_chars("##-"));
    }
    pb.set_message("starting...");
    pb
}
