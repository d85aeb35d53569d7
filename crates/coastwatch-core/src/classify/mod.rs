//! Pluggable classification backends.
//!
//! Two variants implement [`ClassificationBackend`]:
//!
//! - [`GridClassifier`]: a trained model with a fixed output head
//! - [`SemanticClassifier`]: zero-shot scoring against natural-language prompts
//!
//! Backends are loaded once at startup. A backend that fails to load is
//! reported as [`BackendSlot::Unavailable`] for the rest of the process; the
//! orchestrator never retries it per request.

pub mod grid;
pub mod preprocess;
pub mod semantic;
pub(crate) mod session;
pub(crate) mod text_encoder;
pub mod vocabulary;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::DynamicImage;

use crate::config::{BackendChoice, Config};
use crate::error::PipelineError;
use crate::taxonomy::CategoryScores;
use crate::types::RawPrediction;

pub use grid::GridClassifier;
pub use semantic::SemanticClassifier;
pub use vocabulary::LabelVocabulary;

/// What a backend returns for one image.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendOutput {
    pub prediction: RawPrediction,
    /// Per-category probability mass, when the backend exposes a full
    /// distribution.
    pub scores: Option<CategoryScores>,
}

/// A model that turns an image into a raw label and confidence.
///
/// Implementations hold immutable, already-loaded weights and are shared
/// across requests.
pub trait ClassificationBackend: Send + Sync {
    /// Short name recorded as `model_used`.
    fn name(&self) -> &str;

    /// Classify one decoded image. `path` is only used in error context.
    fn predict(&self, image: &DynamicImage, path: &Path) -> Result<BackendOutput, PipelineError>;
}

/// The backend chosen at startup, or why there is none.
#[derive(Clone)]
pub enum BackendSlot {
    Ready(Arc<dyn ClassificationBackend>),
    Unavailable { reason: String },
}

impl BackendSlot {
    pub fn backend(&self) -> Option<&Arc<dyn ClassificationBackend>> {
        match self {
            Self::Ready(backend) => Some(backend),
            Self::Unavailable { .. } => None,
        }
    }
}

impl std::fmt::Debug for BackendSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ready(backend) => write!(f, "Ready({})", backend.name()),
            Self::Unavailable { reason } => write!(f, "Unavailable({reason})"),
        }
    }
}

/// Load the configured backend.
///
/// Failures are logged here, once, and turned into `Unavailable`.
pub fn load_backend(config: &Config) -> BackendSlot {
    let result = match config.classifier.backend {
        BackendChoice::Grid => load_grid(config),
        BackendChoice::Semantic => load_semantic(config),
        BackendChoice::Auto => load_semantic(config).or_else(|e| {
            tracing::info!("Zero-shot backend not loaded ({e}); trying grid model");
            load_grid(config)
        }),
    };

    match result {
        Ok(backend) => {
            tracing::info!("Classification backend ready: {}", backend.name());
            BackendSlot::Ready(backend)
        }
        Err(e) => {
            tracing::warn!(
                "No classification backend available: {e}. \
                 Every image will receive the fallback result."
            );
            BackendSlot::Unavailable {
                reason: e.to_string(),
            }
        }
    }
}

/// Files each backend needs on disk, as `(backend, path)` pairs.
///
/// The grid class mapping is optional and not listed.
pub fn required_files(config: &Config) -> Vec<(&'static str, PathBuf)> {
    let grid_dir = config.grid_model_dir();
    let semantic_dir = config.semantic_model_dir();
    vec![
        (grid::GRID_BACKEND, GridClassifier::model_path(&grid_dir)),
        (
            semantic::SEMANTIC_BACKEND,
            SemanticClassifier::visual_model_path(&semantic_dir),
        ),
        (
            semantic::SEMANTIC_BACKEND,
            semantic_dir.join(text_encoder::TEXT_MODEL_FILENAME),
        ),
        (
            semantic::SEMANTIC_BACKEND,
            semantic_dir.join(text_encoder::TOKENIZER_FILENAME),
        ),
    ]
}

fn load_grid(config: &Config) -> Result<Arc<dyn ClassificationBackend>, PipelineError> {
    let backend: Arc<dyn ClassificationBackend> =
        Arc::new(GridClassifier::load(&config.grid, &config.grid_model_dir())?);
    Ok(backend)
}

fn load_semantic(config: &Config) -> Result<Arc<dyn ClassificationBackend>, PipelineError> {
    let backend: Arc<dyn ClassificationBackend> = Arc::new(SemanticClassifier::load(
        &config.semantic,
        &config.semantic_model_dir(),
    )?);
    Ok(backend)
}
