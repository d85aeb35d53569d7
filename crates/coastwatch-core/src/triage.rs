//! Confidence banding, the clean-scene override, and review flagging.
//!
//! Zero-shot prompts are noisy near decision boundaries: a weak "pollution"
//! call sitting next to a non-trivial "clean" signal is more often a false
//! positive than real pollution. The override reclassifies those as
//! `no_waste`, and every middling `no_waste` call is sent to a human because
//! missed pollution costs more than an extra review.

use crate::config::TriageConfig;
use crate::taxonomy::{CanonicalCategory, CategoryScores};
use crate::types::{ConfidenceLevel, RawPrediction};

/// Outcome of applying the policy to one prediction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriageDecision {
    pub label: CanonicalCategory,
    pub confidence: f32,
    pub needs_review: bool,
    pub level: ConfidenceLevel,
    /// The clean-scene override replaced the backend's label
    pub overridden: bool,
}

/// Threshold-driven decision policy.
#[derive(Debug, Clone)]
pub struct TriagePolicy {
    config: TriageConfig,
}

impl TriagePolicy {
    pub fn new(config: TriageConfig) -> Self {
        Self { config }
    }

    /// Bucket a confidence into low / medium / high.
    pub fn band(&self, confidence: f32) -> ConfidenceLevel {
        if confidence >= self.config.high_threshold {
            ConfidenceLevel::High
        } else if confidence >= self.config.medium_threshold {
            ConfidenceLevel::Medium
        } else {
            ConfidenceLevel::Low
        }
    }

    /// Whether a final decision should be looked at by a human.
    pub fn needs_review(&self, label: CanonicalCategory, confidence: f32) -> bool {
        label == CanonicalCategory::NoWaste && confidence < self.config.review_threshold
    }

    /// Decide the final label for a mapped prediction.
    ///
    /// `scores` is the per-category distribution when the backend exposes one;
    /// without it the override is skipped. Confidences are rounded to four
    /// decimals before banding, so the reported value and its band agree.
    pub fn decide(
        &self,
        prediction: &RawPrediction,
        label: CanonicalCategory,
        scores: Option<&CategoryScores>,
    ) -> TriageDecision {
        let mut final_label = label;
        let mut confidence = round4(clamp_unit(prediction.raw_confidence));
        let mut overridden = false;

        if let Some(scores) = scores {
            let clean_mass = round4(clamp_unit(scores.get(CanonicalCategory::NoWaste)));
            if label != CanonicalCategory::NoWaste
                && confidence < self.config.override_certainty
                && clean_mass > self.config.clean_suspicion
            {
                tracing::debug!(
                    "Clean-scene override: {} at {:.3} -> no_waste at {:.3}",
                    label,
                    confidence,
                    clean_mass
                );
                final_label = CanonicalCategory::NoWaste;
                confidence = clean_mass;
                overridden = true;
            }
        }

        TriageDecision {
            label: final_label,
            confidence,
            needs_review: self.needs_review(final_label, confidence),
            level: self.band(confidence),
            overridden,
        }
    }
}

impl Default for TriagePolicy {
    fn default() -> Self {
        Self::new(TriageConfig::default())
    }
}

fn round4(value: f32) -> f32 {
    (value * 10_000.0).round() / 10_000.0
}

fn clamp_unit(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
