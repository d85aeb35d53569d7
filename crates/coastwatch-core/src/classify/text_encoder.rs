//! Text encoder for the zero-shot prompts.
//!
//! Loads the text half of the dual encoder and its tokenizer, and encodes
//! prompt strings into vectors aligned with the visual encoder's space.
//! Prompts are encoded once at startup, so every failure here makes the
//! zero-shot backend unavailable.

use std::path::Path;
use std::sync::Mutex;

use ort::session::Session;
use ort::value::Value;

use crate::error::PipelineError;

use super::semantic::SEMANTIC_BACKEND;

/// Text encoder ONNX filename.
pub(crate) const TEXT_MODEL_FILENAME: &str = "text_model.onnx";

/// Tokenizer filename.
pub(crate) const TOKENIZER_FILENAME: &str = "tokenizer.json";

/// Default sequence length of the text tower.
const MAX_LENGTH: usize = 64;

fn unavailable(message: String) -> PipelineError {
    PipelineError::BackendUnavailable {
        backend: SEMANTIC_BACKEND.to_string(),
        message,
    }
}

pub struct TextEncoder {
    session: Mutex<Session>,
    tokenizer: tokenizers::Tokenizer,
}

impl TextEncoder {
    /// Load the text encoder from `model_dir`.
    pub fn load(model_dir: &Path) -> Result<Self, PipelineError> {
        let text_model_path = model_dir.join(TEXT_MODEL_FILENAME);
        let tokenizer_path = model_dir.join(TOKENIZER_FILENAME);

        if !text_model_path.exists() {
            return Err(unavailable(format!(
                "Text encoder not found at {:?}",
                text_model_path
            )));
        }
        if !tokenizer_path.exists() {
            return Err(unavailable(format!(
                "Tokenizer not found at {:?}",
                tokenizer_path
            )));
        }

        let session = Session::builder()
            .map_err(|e| unavailable(format!("Failed to create ONNX session builder: {e}")))?
            .commit_from_file(&text_model_path)
            .map_err(|e| unavailable(format!("Failed to load text encoder model: {e}")))?;

        let tokenizer = tokenizers::Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| unavailable(format!("Failed to load tokenizer: {e}")))?;

        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
        })
    }

    /// Encode a batch of prompts to L2-normalized embeddings, one per prompt.
    pub fn encode_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, PipelineError> {
        let batch_size = texts.len();
        if batch_size == 0 {
            return Ok(vec![]);
        }

        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| unavailable(format!("Tokenization failed: {e}")))?;

        // The text tower takes padded input_ids only (no attention_mask).
        let mut input_ids = vec![0i64; batch_size * MAX_LENGTH];
        for (i, encoding) in encodings.iter().enumerate() {
            for (j, &id) in encoding.get_ids().iter().take(MAX_LENGTH).enumerate() {
                input_ids[i * MAX_LENGTH + j] = id as i64;
            }
        }

        let input_ids_value =
            Value::from_array((vec![batch_size as i64, MAX_LENGTH as i64], input_ids))
                .map_err(|e| unavailable(format!("Failed to create input tensor: {e}")))?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| unavailable(format!("Text encoder lock poisoned: {e}")))?;

        let outputs = session
            .run(ort::inputs!["input_ids" => input_ids_value])
            .map_err(|e| unavailable(format!("Text encoder inference failed: {e}")))?;

        let pooled = outputs
            .iter()
            .find(|(name, _)| *name == "pooler_output")
            .ok_or_else(|| unavailable("Text encoder did not produce pooler_output".into()))?;

        let (_shape, data) = pooled
            .1
            .try_extract_tensor::<f32>()
            .map_err(|e| unavailable(format!("Failed to extract pooler_output: {e}")))?;

        if data.is_empty() || data.len() % batch_size != 0 {
            return Err(unavailable(format!(
                "Text encoder returned {} values for {} prompts",
                data.len(),
                batch_size
            )));
        }
        let dim = data.len() / batch_size;

        Ok(data.chunks(dim).map(crate::math::l2_normalize).collect())
    }

    /// Check whether the text encoder files exist.
    pub fn model_exists(model_dir: &Path) -> bool {
        model_dir.join(TEXT_MODEL_FILENAME).exists() && model_dir.join(TOKENIZER_FILENAME).exists()
    }
}
