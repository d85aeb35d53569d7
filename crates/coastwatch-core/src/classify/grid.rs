//! Trained fixed-category classifier.
//!
//! Runs an image classification network exported to ONNX. The output head has
//! one unit per class in the label vocabulary; the prediction is the argmax
//! and its softmax probability. Only that scalar leaves the backend, so the
//! clean-scene override never applies to grid results.

use std::path::{Path, PathBuf};

use image::DynamicImage;

use crate::config::GridConfig;
use crate::error::PipelineError;
use crate::math;
use crate::types::RawPrediction;

use super::preprocess::grid_tensor;
use super::session::OnnxSession;
use super::vocabulary::LabelVocabulary;
use super::{BackendOutput, ClassificationBackend};

/// The grid model's ONNX filename.
const MODEL_FILENAME: &str = "model.onnx";

/// Backend name recorded in results.
pub const GRID_BACKEND: &str = "grid";

pub struct GridClassifier {
    session: OnnxSession,
    vocabulary: LabelVocabulary,
    image_size: u32,
}

impl GridClassifier {
    /// Load the model and its vocabulary from `model_dir`.
    ///
    /// Expects `{model_dir}/model.onnx`; the vocabulary artifact is optional.
    pub fn load(config: &GridConfig, model_dir: &Path) -> Result<Self, PipelineError> {
        let model_path = Self::model_path(model_dir);
        if !model_path.exists() {
            return Err(PipelineError::BackendUnavailable {
                backend: GRID_BACKEND.to_string(),
                message: format!("Model not found at {:?}", model_path),
            });
        }

        let vocabulary =
            LabelVocabulary::load_or_default(GRID_BACKEND, &model_dir.join(&config.class_mapping))?;

        tracing::info!("Loading grid model from {:?}", model_path);
        let session = OnnxSession::load(&model_path, None).map_err(|message| {
            PipelineError::BackendUnavailable {
                backend: GRID_BACKEND.to_string(),
                message,
            }
        })?;
        tracing::info!(
            "Grid model loaded ({} classes, {}px input)",
            vocabulary.len(),
            config.image_size
        );

        Ok(Self {
            session,
            vocabulary,
            image_size: config.image_size,
        })
    }

    /// Check whether the model file exists on disk.
    pub fn model_exists(model_dir: &Path) -> bool {
        Self::model_path(model_dir).exists()
    }

    pub fn model_path(model_dir: &Path) -> PathBuf {
        model_dir.join(MODEL_FILENAME)
    }

    /// Turn the output head into a prediction.
    ///
    /// Accepts either probabilities or raw logits; logits are softmaxed first.
    pub(crate) fn interpret_head(
        head: &[f32],
        vocabulary: &LabelVocabulary,
    ) -> Result<RawPrediction, String> {
        let probabilities = if math::is_distribution(head) {
            head.to_vec()
        } else {
            math::softmax(head)
        };

        let (index, confidence) =
            math::argmax(&probabilities).ok_or_else(|| "Model produced an empty head".to_string())?;
        let label = vocabulary.get(index).ok_or_else(|| {
            format!(
                "Head index {index} outside vocabulary of {} classes",
                vocabulary.len()
            )
        })?;

        Ok(RawPrediction::new(label.as_str(), confidence))
    }
}

impl ClassificationBackend for GridClassifier {
    fn name(&self) -> &str {
        GRID_BACKEND
    }

    fn predict(&self, image: &DynamicImage, path: &Path) -> Result<BackendOutput, PipelineError> {
        let inference_error = |message: String| PipelineError::Inference {
            backend: GRID_BACKEND.to_string(),
            path: path.to_path_buf(),
            message,
        };

        let tensor = grid_tensor(image, self.image_size);
        let output = self.session.run(&tensor).map_err(inference_error)?;
        let head = output.first_row().map_err(inference_error)?;
        let prediction = Self::interpret_head(head, &self.vocabulary).map_err(inference_error)?;

        tracing::debug!(
            "Grid prediction for {:?}: {} ({:.1}%)",
            path,
            prediction.raw_label,
            prediction.raw_confidence * 100.0
        );

        Ok(BackendOutput {
            prediction,
            scores: None,
        })
    }
}
