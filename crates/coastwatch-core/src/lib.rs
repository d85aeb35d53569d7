//! Coastwatch Core - coastal pollution photo classification.
//!
//! Takes a citizen-submitted photo and decides whether it shows plastic, an
//! oil spill, marine debris, other solid waste, or clean water, along with a
//! confidence band, a human-review flag, and the photo's GPS position.
//!
//! # Architecture
//!
//! ```text
//! Upload → Validate/Decode → Backend (grid | semantic) → Map → Triage → View
//!        ↘ EXIF GPS ───────────────────────────────────────────────↗
//! ```
//!
//! The backend is loaded once per process. When it cannot be loaded, every
//! upload receives a conservative fallback result instead of an error.
//!
//! # Usage
//!
//! ```rust,ignore
//! use coastwatch_core::{Config, PollutionAnalyzer};
//!
//! #[tokio::main]
//! async fn main() -> coastwatch_core::Result<()> {
//!     let config = Config::load()?;
//!     let analyzer = PollutionAnalyzer::load(&config);
//!
//!     let view = analyzer.analyze_image("./upload.jpg").await?;
//!     println!("{} ({:.1}%)", view.pollution_name, view.confidence * 100.0);
//!     Ok(())
//! }
//! ```

pub mod classify;
pub mod config;
pub mod error;
pub mod math;
pub mod output;
pub mod pipeline;
pub mod presentation;
pub mod taxonomy;
pub mod triage;
pub mod types;

pub use classify::{BackendSlot, ClassificationBackend};
pub use config::Config;
pub use error::{CoastwatchError, ConfigError, PipelineError, Result};
pub use output::{OutputFormat, RecordWriter};
pub use pipeline::{Analysis, GeoTagExtractor, PollutionAnalyzer};
pub use presentation::PollutionInfo;
pub use taxonomy::{CanonicalCategory, RawLabel};
pub use triage::TriagePolicy;
pub use types::{
    ClassificationResult, ClassificationView, ConfidenceLevel, GeoTag, RawPrediction,
    UploadAssessment,
};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
