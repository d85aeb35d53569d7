//! Request orchestration: validate, classify, map, triage, present.
//!
//! The analyzer owns the one backend chosen at startup. Every degraded path
//! (corrupt upload, missing backend, inference failure, timeout) collapses to
//! [`ClassificationResult::fallback`]; only a missing file is reported to the
//! caller as an error.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use tokio::time::timeout;

use crate::classify::{self, BackendSlot};
use crate::config::Config;
use crate::error::PipelineError;
use crate::presentation::PollutionInfo;
use crate::taxonomy::map_label;
use crate::triage::TriagePolicy;
use crate::types::{ClassificationResult, ClassificationView, GeoTag, UploadAssessment};

use super::geotag::GeoTagExtractor;
use super::preprocess::ImagePreprocessor;

static GLOBAL: OnceLock<PollutionAnalyzer> = OnceLock::new();

/// A classification together with the advisory flags from preprocessing.
#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    pub result: ClassificationResult,
    pub is_suspicious: bool,
    pub confidence_penalty: Option<f32>,
}

impl Analysis {
    fn fallback() -> Self {
        Self {
            result: ClassificationResult::fallback(),
            is_suspicious: false,
            confidence_penalty: None,
        }
    }

    /// Attach presentation metadata for the frontend.
    pub fn to_view(&self) -> ClassificationView {
        let result = &self.result;
        let info = PollutionInfo::for_category(result.final_label);
        ClassificationView {
            label: result.final_label.as_str().to_string(),
            confidence: result.final_confidence,
            confidence_level: result.confidence_level,
            needs_review: result.needs_review,
            pollution_name: info.name.to_string(),
            pollution_icon: info.icon.to_string(),
            pollution_color: info.color.to_string(),
            model_used: result.model_used.clone(),
            analysis_details: result.details.clone(),
            is_suspicious: self.is_suspicious,
            confidence_penalty: self.confidence_penalty,
        }
    }
}

struct Inner {
    preprocessor: ImagePreprocessor,
    backend: BackendSlot,
    triage: TriagePolicy,
    classify_timeout: Duration,
}

/// The pollution classification service.
///
/// Cheap to clone; clones share the loaded backend.
#[derive(Clone)]
pub struct PollutionAnalyzer {
    inner: Arc<Inner>,
}

impl PollutionAnalyzer {
    /// Build an analyzer, loading the configured backend.
    ///
    /// Never fails: a backend that cannot load leaves the analyzer serving
    /// fallback results.
    pub fn load(config: &Config) -> Self {
        Self::with_backend(config, classify::load_backend(config))
    }

    /// Build an analyzer around an already-loaded backend slot.
    pub fn with_backend(config: &Config, backend: BackendSlot) -> Self {
        Self {
            inner: Arc::new(Inner {
                preprocessor: ImagePreprocessor::from_config(config),
                backend,
                triage: TriagePolicy::new(config.triage.clone()),
                classify_timeout: Duration::from_millis(config.limits.classify_timeout_ms),
            }),
        }
    }

    /// The process-wide analyzer, loaded on first use.
    ///
    /// Concurrent first callers block until one load finishes; `config` is
    /// ignored once the analyzer exists.
    pub fn global(config: &Config) -> &'static PollutionAnalyzer {
        GLOBAL.get_or_init(|| {
            tracing::debug!("Initializing shared pollution analyzer");
            Self::load(config)
        })
    }

    /// Name of the active backend, if any.
    pub fn backend_name(&self) -> Option<&str> {
        self.inner.backend.backend().map(|b| b.name())
    }

    /// Classify an image and attach presentation metadata.
    ///
    /// Fails only with `FileNotFound`.
    pub async fn analyze_image(
        &self,
        path: impl AsRef<Path>,
    ) -> Result<ClassificationView, PipelineError> {
        Ok(self.analyze(path.as_ref()).await?.to_view())
    }

    /// Classify an image on the blocking pool, bounded by the configured
    /// timeout.
    pub async fn analyze(&self, path: &Path) -> Result<Analysis, PipelineError> {
        if !path.is_file() {
            return Err(PipelineError::FileNotFound(path.to_path_buf()));
        }

        let inner = Arc::clone(&self.inner);
        let task_path = path.to_path_buf();
        let outcome = timeout(
            self.inner.classify_timeout,
            tokio::task::spawn_blocking(move || inner.classify(&task_path)),
        )
        .await;

        match outcome {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                tracing::error!("Classification task for {:?} failed: {}", path, e);
                Ok(Analysis::fallback())
            }
            Err(_) => {
                let e = PipelineError::Timeout {
                    path: path.to_path_buf(),
                    stage: "classify".to_string(),
                    timeout_ms: self.inner.classify_timeout.as_millis() as u64,
                };
                tracing::warn!("{e}");
                Ok(Analysis::fallback())
            }
        }
    }

    /// Synchronous classification on the calling thread.
    pub fn classify_blocking(&self, path: &Path) -> Result<Analysis, PipelineError> {
        self.inner.classify(path)
    }

    /// Read the image's GPS position, if it has one.
    pub fn extract_gps_data(&self, path: impl AsRef<Path>) -> GeoTag {
        GeoTagExtractor::extract(path.as_ref())
    }

    /// Classify an upload and read its location in one call.
    pub async fn assess_upload(
        &self,
        path: impl AsRef<Path>,
    ) -> Result<UploadAssessment, PipelineError> {
        let path = path.as_ref();
        let classification = self.analyze_image(path).await?;

        let gps_path: PathBuf = path.to_path_buf();
        let location = tokio::task::spawn_blocking(move || GeoTagExtractor::extract(&gps_path))
            .await
            .unwrap_or_else(|e| {
                tracing::error!("GPS extraction task failed: {}", e);
                GeoTag::absent()
            });

        Ok(UploadAssessment {
            file_name: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            classification,
            location,
        })
    }
}

impl Inner {
    fn classify(&self, path: &Path) -> Result<Analysis, PipelineError> {
        let prepared = match self.preprocessor.load_and_validate(path) {
            Ok(prepared) => prepared,
            Err(e @ PipelineError::FileNotFound(_)) => return Err(e),
            Err(e) => {
                tracing::warn!("Rejected upload: {e}");
                return Ok(Analysis::fallback());
            }
        };

        let flagged = |result: ClassificationResult| Analysis {
            result,
            is_suspicious: prepared.is_suspicious,
            confidence_penalty: prepared.confidence_penalty,
        };

        let Some(backend) = self.backend.backend() else {
            return Ok(flagged(ClassificationResult::fallback()));
        };

        tracing::debug!(
            "Classifying {:?} ({}x{}) with {}",
            path.file_name().unwrap_or_default(),
            prepared.width,
            prepared.height,
            backend.name()
        );

        let output = match backend.predict(&prepared.image, path) {
            Ok(output) => output,
            Err(e) => {
                tracing::warn!("{e}");
                return Ok(flagged(ClassificationResult::fallback()));
            }
        };

        let category = match map_label(backend.name(), &output.prediction.raw_label) {
            Ok(category) => category,
            Err(e) => {
                tracing::error!("{e}");
                return Ok(flagged(ClassificationResult::fallback()));
            }
        };

        let decision = self
            .triage
            .decide(&output.prediction, category, output.scores.as_ref());

        tracing::info!(
            "{:?}: {} ({:.1}%, {}){}",
            path.file_name().unwrap_or_default(),
            decision.label,
            decision.confidence * 100.0,
            decision.level,
            if decision.needs_review { " [review]" } else { "" }
        );

        let mut details = BTreeMap::new();
        details.insert(backend.name().to_string(), output.prediction);

        Ok(flagged(ClassificationResult {
            final_label: decision.label,
            final_confidence: decision.confidence,
            confidence_level: decision.level,
            needs_review: decision.needs_review,
            model_used: backend.name().to_string(),
            details,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::{BackendOutput, ClassificationBackend};
    use crate::taxonomy::{CanonicalCategory, CategoryScores};
    use crate::types::{ConfidenceLevel, RawPrediction};
    use image::{DynamicImage, Rgb, RgbImage};

    enum Behavior {
        Answer(BackendOutput),
        Fail,
        Sleep(Duration),
    }

    struct StubBackend(Behavior);

    impl ClassificationBackend for StubBackend {
        fn name(&self) -> &str {
            "stub"
        }

        fn predict(
            &self,
            _image: &DynamicImage,
            path: &Path,
        ) -> Result<BackendOutput, PipelineError> {
            match &self.0 {
                Behavior::Answer(output) => Ok(output.clone()),
                Behavior::Fail => Err(PipelineError::Inference {
                    backend: "stub".to_string(),
                    path: path.to_path_buf(),
                    message: "session crashed".to_string(),
                }),
                Behavior::Sleep(d) => {
                    std::thread::sleep(*d);
                    Ok(answer("plastic", 0.99, None))
                }
            }
        }
    }

    fn answer(label: &str, confidence: f32, scores: Option<CategoryScores>) -> BackendOutput {
        BackendOutput {
            prediction: RawPrediction::new(label, confidence),
            scores,
        }
    }

    fn analyzer_with(behavior: Behavior) -> PollutionAnalyzer {
        let backend: Arc<dyn ClassificationBackend> = Arc::new(StubBackend(behavior));
        PollutionAnalyzer::with_backend(&Config::default(), BackendSlot::Ready(backend))
    }

    fn write_png(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
        let path = dir.join(name);
        RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, 128])
        })
        .save(&path)
        .unwrap();
        path
    }

    #[tokio::test]
    async fn test_missing_file_is_not_found() {
        let analyzer = analyzer_with(Behavior::Answer(answer("plastic", 0.9, None)));
        let err = analyzer
            .analyze_image("/nonexistent/upload.jpg")
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::FileNotFound(_)));
    }

    #[tokio::test]
    async fn test_corrupt_upload_gets_default_result() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(dir.path(), "cut.png", 256, 256);
        let bytes = std::fs::read(&path).unwrap();
        std::fs::write(&path, &bytes[..bytes.len() / 3]).unwrap();

        let analyzer = analyzer_with(Behavior::Answer(answer("plastic", 0.9, None)));
        let view = analyzer.analyze_image(&path).await.unwrap();
        assert_eq!(view.label, "other_solid_waste");
        assert_eq!(view.confidence, 0.0);
        assert_eq!(view.model_used, "None");
        assert!(view.analysis_details.is_empty());
    }

    #[tokio::test]
    async fn test_unavailable_backend_gets_default_result() {
        let dir = tempfile::tempdir().unwrap();
        let cut = write_png(dir.path(), "cut.png", 256, 256);
        let bytes = std::fs::read(&cut).unwrap();
        std::fs::write(&cut, &bytes[..bytes.len() / 3]).unwrap();
        let uploads = [
            write_png(dir.path(), "beach.png", 200, 200),
            cut,
            write_png(dir.path(), "thumb.png", 64, 48),
            write_png(dir.path(), "harbour.png", 320, 240),
        ];
        let analyzer = PollutionAnalyzer::with_backend(
            &Config::default(),
            BackendSlot::Unavailable {
                reason: "no model".to_string(),
            },
        );

        assert_eq!(analyzer.backend_name(), None);
        for _ in 0..2 {
            for path in &uploads {
                let view = analyzer.analyze_image(path).await.unwrap();
                assert_eq!(view.label, "other_solid_waste", "{path:?}");
                assert_eq!(view.confidence, 0.0);
                assert_eq!(view.model_used, "None");
                assert_eq!(view.pollution_name, "Solid Waste");
            }
        }
    }

    #[tokio::test]
    async fn test_confident_prediction_passes_through() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(dir.path(), "bottles.png", 200, 200);
        let analyzer = analyzer_with(Behavior::Answer(answer("plastic", 0.9, None)));

        let view = analyzer.analyze_image(&path).await.unwrap();
        assert_eq!(view.label, "plastic");
        assert_eq!(view.confidence_level, ConfidenceLevel::High);
        assert!(!view.needs_review);
        assert_eq!(view.model_used, "stub");
        assert_eq!(view.pollution_name, "Plastic Pollution");
        assert_eq!(view.analysis_details["stub"].raw_label, "plastic");
    }

    #[tokio::test]
    async fn test_clean_scene_override_applies() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(dir.path(), "shore.png", 200, 200);
        let scores = CategoryScores::from_pairs([
            (CanonicalCategory::Plastic, 0.60),
            (CanonicalCategory::OilSpill, 0.20),
            (CanonicalCategory::NoWaste, 0.20),
        ]);
        let analyzer = analyzer_with(Behavior::Answer(answer("plastic", 0.60, Some(scores))));

        let view = analyzer.analyze_image(&path).await.unwrap();
        assert_eq!(view.label, "no_waste");
        assert!((view.confidence - 0.2).abs() < 1e-6);
        assert_eq!(view.confidence_level, ConfidenceLevel::Low);
        assert!(view.needs_review);
        // Details keep what the backend actually said.
        assert_eq!(view.analysis_details["stub"].raw_label, "plastic");
    }

    #[tokio::test]
    async fn test_raw_labels_are_mapped() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(dir.path(), "nets.png", 200, 200);
        let analyzer = analyzer_with(Behavior::Answer(answer("marine_trash", 0.8, None)));
        let view = analyzer.analyze_image(&path).await.unwrap();
        assert_eq!(view.label, "marine_debris");
        assert_eq!(view.pollution_icon, "⚓");
    }

    #[tokio::test]
    async fn test_unmapped_label_gets_default_result() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(dir.path(), "kelp.png", 200, 200);
        let analyzer = analyzer_with(Behavior::Answer(answer("seaweed", 0.9, None)));
        let view = analyzer.analyze_image(&path).await.unwrap();
        assert_eq!(view.label, "other_solid_waste");
        assert_eq!(view.model_used, "None");
    }

    #[tokio::test]
    async fn test_inference_failure_gets_default_result() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(dir.path(), "beach.png", 200, 200);
        let analyzer = analyzer_with(Behavior::Fail);
        let view = analyzer.analyze_image(&path).await.unwrap();
        assert_eq!(view.model_used, "None");
        assert_eq!(view.confidence, 0.0);
    }

    #[tokio::test]
    async fn test_timeout_gets_default_result() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(dir.path(), "slow.png", 200, 200);
        let mut config = Config::default();
        config.limits.classify_timeout_ms = 20;
        let backend: Arc<dyn ClassificationBackend> =
            Arc::new(StubBackend(Behavior::Sleep(Duration::from_millis(300))));
        let analyzer = PollutionAnalyzer::with_backend(&config, BackendSlot::Ready(backend));

        let analysis = analyzer.analyze(&path).await.unwrap();
        assert!(analysis.result.is_fallback());
    }

    #[tokio::test]
    async fn test_small_image_is_flagged_not_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(dir.path(), "thumb.png", 64, 48);
        let analyzer = analyzer_with(Behavior::Answer(answer("oil", 0.8, None)));
        let view = analyzer.analyze_image(&path).await.unwrap();
        assert_eq!(view.label, "oil_spill");
        assert!(view.is_suspicious);
        assert_eq!(view.confidence_penalty, Some(0.5));
        assert!((view.confidence - 0.8).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_presentation_confidence_is_rounded() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(dir.path(), "beach.png", 200, 200);
        let analyzer = analyzer_with(Behavior::Answer(answer("glass", 0.123456, None)));
        let view = analyzer.analyze_image(&path).await.unwrap();
        assert_eq!(view.label, "other_solid_waste");
        assert!((view.confidence - 0.1235).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_band_matches_reported_confidence() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(dir.path(), "beach.png", 200, 200);
        let analyzer = analyzer_with(Behavior::Answer(answer("plastic", 0.74996, None)));
        let view = analyzer.analyze_image(&path).await.unwrap();
        assert_eq!(view.confidence, 0.75);
        assert_eq!(view.confidence_level, ConfidenceLevel::High);
        assert_eq!(view.analysis_details["stub"].raw_confidence, 0.74996);
    }

    #[tokio::test]
    async fn test_heic_upload_fails_closed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("IMG_0042.heic");
        let mut bytes = vec![0, 0, 0, 24];
        bytes.extend_from_slice(b"ftypheic");
        bytes.extend_from_slice(&[0; 64]);
        std::fs::write(&path, bytes).unwrap();

        let analyzer = analyzer_with(Behavior::Answer(answer("plastic", 0.9, None)));
        let view = analyzer.analyze_image(&path).await.unwrap();
        assert_eq!(view.label, "other_solid_waste");
        assert_eq!(view.model_used, "None");
        assert!(view.needs_review);
    }

    #[tokio::test]
    async fn test_assess_upload_without_gps() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(dir.path(), "upload.png", 200, 200);
        let analyzer = analyzer_with(Behavior::Answer(answer("clean", 0.95, None)));

        let assessment = analyzer.assess_upload(&path).await.unwrap();
        assert_eq!(assessment.file_name, "upload.png");
        assert_eq!(assessment.classification.label, "no_waste");
        assert!(!assessment.classification.needs_review);
        assert_eq!(assessment.location, GeoTag::absent());
        assert_eq!(analyzer.extract_gps_data(&path), GeoTag::absent());
    }

    #[test]
    fn test_classify_blocking_matches_async_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(dir.path(), "beach.png", 200, 200);
        let analyzer = analyzer_with(Behavior::Answer(answer("clean_water", 0.6, None)));
        let analysis = analyzer.classify_blocking(&path).unwrap();
        assert_eq!(analysis.result.final_label, CanonicalCategory::NoWaste);
        assert!(analysis.result.needs_review);
        assert_eq!(analysis.result.confidence_level, ConfidenceLevel::Medium);
    }

    #[test]
    fn test_global_is_initialized_once() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.general.model_dir = dir.path().to_path_buf();

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let config = config.clone();
                std::thread::spawn(move || {
                    PollutionAnalyzer::global(&config) as *const PollutionAnalyzer as usize
                })
            })
            .collect();
        let addresses: Vec<usize> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(addresses.windows(2).all(|w| w[0] == w[1]));
        assert!(Arc::ptr_eq(
            &PollutionAnalyzer::global(&config).inner,
            &PollutionAnalyzer::global(&Config::default()).inner
        ));
    }
}
