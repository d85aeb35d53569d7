//! Sub-configuration structs with their defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Directory where model artifacts are stored
    pub model_dir: PathBuf,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("~/.coastwatch/models"),
        }
    }
}

/// Processing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Number of images classified concurrently in directory runs
    pub parallel_workers: usize,

    /// Supported input formats
    pub supported_formats: Vec<String>,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            parallel_workers: 4,
            supported_formats: vec![
                "jpg".to_string(),
                "jpeg".to_string(),
                "png".to_string(),
                "webp".to_string(),
                "gif".to_string(),
                "bmp".to_string(),
                "tif".to_string(),
                "tiff".to_string(),
            ],
        }
    }
}

/// Resource limits to protect against problematic inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum file size in megabytes
    pub max_file_size_mb: u64,

    /// Maximum image dimension (width or height)
    pub max_image_dimension: u32,

    /// Shorter side below this many pixels flags the image as suspicious
    pub min_image_dimension: u32,

    /// Confidence multiplier suggested for suspicious images (advisory)
    pub small_image_penalty: f32,

    /// Upper bound on one classification call, in milliseconds
    pub classify_timeout_ms: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_file_size_mb: 50,
            max_image_dimension: 10000,
            min_image_dimension: 100,
            small_image_penalty: 0.5,
            classify_timeout_ms: 30000,
        }
    }
}

/// Which classification backend the orchestrator runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackendChoice {
    /// Trained fixed-category model
    Grid,
    /// Zero-shot prompt-similarity model
    Semantic,
    /// Semantic if it loads, otherwise grid
    #[default]
    Auto,
}

/// Classifier selection.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ClassifierConfig {
    pub backend: BackendChoice,
}

/// Grid (fixed-category) model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Model directory name under `general.model_dir`
    pub model: String,

    /// Square input size the model was trained on
    pub image_size: u32,

    /// Label vocabulary artifact, relative to the model directory
    pub class_mapping: String,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            model: "coastal-grid".to_string(),
            image_size: 224,
            class_mapping: "class_mapping.json".to_string(),
        }
    }
}

/// One zero-shot prompt and the raw label it votes for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptConfig {
    pub text: String,
    pub label: String,
}

impl PromptConfig {
    fn new(text: &str, label: &str) -> Self {
        Self {
            text: text.to_string(),
            label: label.to_string(),
        }
    }
}

/// Zero-shot (semantic) model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SemanticConfig {
    /// Model directory name under `general.model_dir`
    pub model: String,

    /// Image input size for the visual encoder
    pub image_size: u32,

    /// Multiplier turning cosine similarity into a logit
    pub logit_scale: f32,

    /// Softmax temperature; values below 1.0 sharpen the distribution
    pub temperature: f32,

    /// Ordered, mutually exclusive scene descriptions
    pub prompts: Vec<PromptConfig>,
}

impl Default for SemanticConfig {
    fn default() -> Self {
        Self {
            model: "siglip-base-patch16".to_string(),
            image_size: 224,
            logit_scale: 117.33,
            temperature: 1.0,
            prompts: vec![
                PromptConfig::new("plastic bottles littering a beach", "plastic"),
                PromptConfig::new("plastic bags and wrappers floating in the sea", "plastic"),
                PromptConfig::new("a black oil spill spreading on the water", "oil"),
                PromptConfig::new("an oil slick washed up on the shore", "oil"),
                PromptConfig::new("fishing nets, ropes and buoys washed ashore", "debris"),
                PromptConfig::new("scattered cans, cardboard and trash on the sand", "trash"),
                PromptConfig::new("pristine beach, no waste", "clean"),
                PromptConfig::new("clear clean ocean water", "clean"),
            ],
        }
    }
}

/// Confidence banding and review thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TriageConfig {
    /// Confidence at or above this is `high`
    pub high_threshold: f32,

    /// Confidence at or above this (and below high) is `medium`
    pub medium_threshold: f32,

    /// Non-clean predictions at or above this are never overridden
    pub override_certainty: f32,

    /// `no_waste` mass above this makes a weak pollution call suspect
    pub clean_suspicion: f32,

    /// `no_waste` results below this confidence need manual review
    pub review_threshold: f32,
}

impl Default for TriageConfig {
    fn default() -> Self {
        Self {
            high_threshold: 0.75,
            medium_threshold: 0.50,
            override_certainty: 0.85,
            clean_suspicion: 0.15,
            review_threshold: 0.70,
        }
    }
}

/// Output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Default output format ("json" or "jsonl")
    pub format: String,

    /// Pretty-print JSON output
    pub pretty: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: "json".to_string(),
            pretty: false,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
