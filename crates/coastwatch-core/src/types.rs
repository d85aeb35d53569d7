//! Core data types produced by the classification pipeline.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::taxonomy::CanonicalCategory;

/// `model_used` value when no backend produced a prediction.
pub const NO_MODEL: &str = "None";

/// A backend's verdict before mapping and triage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPrediction {
    /// Label in the backend's own vocabulary
    pub raw_label: String,

    /// Backend confidence from 0.0 to 1.0
    pub raw_confidence: f32,
}

impl RawPrediction {
    pub fn new(raw_label: impl Into<String>, raw_confidence: f32) -> Self {
        Self {
            raw_label: raw_label.into(),
            raw_confidence,
        }
    }
}

/// Coarse confidence bucket for display and triage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceLevel {
    Low,
    Medium,
    High,
}

impl ConfidenceLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The pipeline's decision for one image. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub final_label: CanonicalCategory,
    pub final_confidence: f32,
    pub confidence_level: ConfidenceLevel,
    pub needs_review: bool,
    /// Name of the backend that produced the prediction, or `"None"`
    pub model_used: String,
    /// Raw predictions keyed by backend name
    pub details: BTreeMap<String, RawPrediction>,
}

impl ClassificationResult {
    /// The safe default returned when classification cannot run.
    ///
    /// Flagged for review: nothing looked at the image.
    pub fn fallback() -> Self {
        Self {
            final_label: CanonicalCategory::OtherSolidWaste,
            final_confidence: 0.0,
            confidence_level: ConfidenceLevel::Low,
            needs_review: true,
            model_used: NO_MODEL.to_string(),
            details: BTreeMap::new(),
        }
    }

    /// True when no backend contributed to this result.
    pub fn is_fallback(&self) -> bool {
        self.model_used == NO_MODEL
    }
}

/// Frontend-facing view of a classification, with presentation metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationView {
    pub label: String,
    pub confidence: f32,
    pub confidence_level: ConfidenceLevel,
    pub needs_review: bool,
    pub pollution_name: String,
    pub pollution_icon: String,
    pub pollution_color: String,
    pub model_used: String,
    pub analysis_details: BTreeMap<String, RawPrediction>,

    /// Shorter side was under the minimum dimension
    #[serde(default)]
    pub is_suspicious: bool,

    /// Advisory multiplier for suspicious images; callers decide whether to apply it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence_penalty: Option<f32>,
}

/// Location recovered from EXIF GPS tags.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct GeoTag {
    pub has_gps: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
}

impl GeoTag {
    /// No usable location in the image.
    pub fn absent() -> Self {
        Self::default()
    }

    pub fn at(latitude: f64, longitude: f64) -> Self {
        Self {
            has_gps: true,
            latitude: Some(latitude),
            longitude: Some(longitude),
        }
    }
}

/// Everything the upload workflow persists for one photo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadAssessment {
    pub file_name: String,
    pub classification: ClassificationView,
    pub location: GeoTag,
}
