//! Zero-shot classifier over natural-language scene descriptions.
//!
//! The prompt list is encoded once at load time. Per image, the visual
//! embedding is compared against every prompt embedding; cosine similarities
//! are scaled into logits, optionally temperature-scaled, and softmaxed across
//! prompts. The winning prompt's raw label and probability form the
//! prediction, and the full distribution is folded into per-category mass for
//! the triage policy.

use std::path::{Path, PathBuf};

use image::DynamicImage;

use crate::config::SemanticConfig;
use crate::error::PipelineError;
use crate::math;
use crate::taxonomy::{CategoryScores, RawLabel};
use crate::types::RawPrediction;

use super::preprocess::semantic_tensor;
use super::session::OnnxSession;
use super::text_encoder::TextEncoder;
use super::{BackendOutput, ClassificationBackend};

/// Backend name recorded in results.
pub const SEMANTIC_BACKEND: &str = "semantic";

/// The visual encoder ONNX filename.
const VISUAL_MODEL_FILENAME: &str = "visual.onnx";

/// Visual encoder output holding the cross-modal projection.
const EMBEDDING_OUTPUT: &str = "pooler_output";

/// Prompts and their pre-computed text embeddings.
pub(crate) struct PromptBank {
    labels: Vec<RawLabel>,
    texts: Vec<String>,
    embeddings: Vec<Vec<f32>>,
}

impl PromptBank {
    pub(crate) fn new(
        prompts: Vec<(String, RawLabel)>,
        embeddings: Vec<Vec<f32>>,
    ) -> Result<Self, String> {
        if prompts.is_empty() {
            return Err("No prompts configured".to_string());
        }
        if prompts.len() != embeddings.len() {
            return Err(format!(
                "{} prompts but {} embeddings",
                prompts.len(),
                embeddings.len()
            ));
        }
        let dim = embeddings[0].len();
        if dim == 0 || embeddings.iter().any(|e| e.len() != dim) {
            return Err("Prompt embeddings have inconsistent dimensions".to_string());
        }

        let (texts, labels) = prompts.into_iter().unzip();
        Ok(Self {
            labels,
            texts,
            embeddings,
        })
    }

    fn dim(&self) -> usize {
        self.embeddings[0].len()
    }

    /// Score a normalized image embedding against every prompt.
    pub(crate) fn classify(
        &self,
        image_embedding: &[f32],
        logit_scale: f32,
        temperature: f32,
    ) -> Result<BackendOutput, String> {
        if image_embedding.len() != self.dim() {
            return Err(format!(
                "Image embedding has {} dims, prompts have {}",
                image_embedding.len(),
                self.dim()
            ));
        }

        let logits: Vec<f32> = self
            .embeddings
            .iter()
            .map(|prompt| logit_scale * math::dot(image_embedding, prompt))
            .collect();
        let probabilities = math::softmax_with_temperature(&logits, temperature);

        let (best, confidence) =
            math::argmax(&probabilities).ok_or_else(|| "Empty prompt distribution".to_string())?;
        tracing::trace!("Best prompt: {:?} ({:.3})", self.texts[best], confidence);

        let scores = CategoryScores::from_pairs(
            self.labels
                .iter()
                .zip(&probabilities)
                .map(|(label, &p)| (label.canonical(), p)),
        );

        Ok(BackendOutput {
            prediction: RawPrediction::new(self.labels[best].as_str(), confidence),
            scores: Some(scores),
        })
    }
}

pub struct SemanticClassifier {
    visual: OnnxSession,
    prompts: PromptBank,
    image_size: u32,
    logit_scale: f32,
    temperature: f32,
}

impl SemanticClassifier {
    /// Load both encoders from `model_dir` and encode the configured prompts.
    ///
    /// Expects `visual.onnx`, `text_model.onnx` and `tokenizer.json`.
    pub fn load(config: &SemanticConfig, model_dir: &Path) -> Result<Self, PipelineError> {
        let visual_path = Self::visual_model_path(model_dir);
        if !visual_path.exists() {
            return Err(PipelineError::BackendUnavailable {
                backend: SEMANTIC_BACKEND.to_string(),
                message: format!("Visual encoder not found at {:?}", visual_path),
            });
        }

        let prompts = config
            .prompts
            .iter()
            .map(|p| {
                p.label
                    .parse::<RawLabel>()
                    .map(|label| (p.text.clone(), label))
                    .map_err(|_| PipelineError::UnmappedLabel {
                        backend: SEMANTIC_BACKEND.to_string(),
                        label: p.label.clone(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        tracing::info!("Loading zero-shot encoders from {:?}", model_dir);
        let text_encoder = TextEncoder::load(model_dir)?;
        let texts: Vec<String> = prompts.iter().map(|(text, _)| text.clone()).collect();
        let embeddings = text_encoder.encode_batch(&texts)?;

        let prompts = PromptBank::new(prompts, embeddings).map_err(|message| {
            PipelineError::BackendUnavailable {
                backend: SEMANTIC_BACKEND.to_string(),
                message,
            }
        })?;

        let visual = OnnxSession::load(&visual_path, Some(EMBEDDING_OUTPUT)).map_err(|message| {
            PipelineError::BackendUnavailable {
                backend: SEMANTIC_BACKEND.to_string(),
                message,
            }
        })?;
        tracing::info!(
            "Zero-shot classifier loaded ({} prompts, {}-dim embeddings)",
            texts.len(),
            prompts.dim()
        );

        Ok(Self {
            visual,
            prompts,
            image_size: config.image_size,
            logit_scale: config.logit_scale,
            temperature: config.temperature,
        })
    }

    /// Check whether all encoder files exist on disk.
    pub fn model_exists(model_dir: &Path) -> bool {
        Self::visual_model_path(model_dir).exists() && TextEncoder::model_exists(model_dir)
    }

    pub fn visual_model_path(model_dir: &Path) -> PathBuf {
        model_dir.join(VISUAL_MODEL_FILENAME)
    }
}

impl ClassificationBackend for SemanticClassifier {
    fn name(&self) -> &str {
        SEMANTIC_BACKEND
    }

    fn predict(&self, image: &DynamicImage, path: &Path) -> Result<BackendOutput, PipelineError> {
        let inference_error = |message: String| PipelineError::Inference {
            backend: SEMANTIC_BACKEND.to_string(),
            path: path.to_path_buf(),
            message,
        };

        let tensor = semantic_tensor(image, self.image_size);
        let output = self.visual.run(&tensor).map_err(inference_error)?;
        let embedding = math::l2_normalize(output.first_row().map_err(inference_error)?);

        let result = self
            .prompts
            .classify(&embedding, self.logit_scale, self.temperature)
            .map_err(inference_error)?;

        tracing::debug!(
            "Zero-shot prediction for {:?}: {} ({:.1}%)",
            path,
            result.prediction.raw_label,
            result.prediction.raw_confidence * 100.0
        );
        Ok(result)
    }
}
