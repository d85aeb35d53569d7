//! ONNX Runtime session wrapper shared by the classification backends.

use std::path::Path;
use std::sync::Mutex;

use ndarray::Array4;
use ort::session::Session;
use ort::value::Value;

/// Wraps an ONNX Runtime session for single-input image models.
///
/// Uses a `Mutex` because `Session::run` requires `&mut self`.
pub struct OnnxSession {
    session: Mutex<Session>,
    /// Name of the input tensor (detected from model metadata).
    input_name: String,
    /// Output to read, falling back to the first output when absent.
    preferred_output: Option<String>,
}

/// A flat f32 output tensor and its shape.
pub struct TensorOutput {
    pub shape: Vec<i64>,
    pub data: Vec<f32>,
}

impl OnnxSession {
    /// Load a model from an ONNX file.
    pub fn load(model_path: &Path, preferred_output: Option<&str>) -> Result<Self, String> {
        let session = Session::builder()
            .map_err(|e| format!("Failed to create ONNX session builder: {e}"))?
            .commit_from_file(model_path)
            .map_err(|e| format!("Failed to load ONNX model {model_path:?}: {e}"))?;

        let input_name = session
            .inputs()
            .first()
            .map(|i| i.name().to_string())
            .ok_or_else(|| format!("Model {model_path:?} declares no inputs"))?;

        tracing::debug!(
            "Loaded ONNX model from {:?} (input: {:?}, outputs: {:?})",
            model_path,
            input_name,
            session
                .outputs()
                .iter()
                .map(|o| o.name())
                .collect::<Vec<_>>()
        );

        Ok(Self {
            session: Mutex::new(session),
            input_name,
            preferred_output: preferred_output.map(str::to_string),
        })
    }

    /// Run the model on one image tensor and return the selected output.
    pub fn run(&self, tensor: &Array4<f32>) -> Result<TensorOutput, String> {
        let shape: Vec<i64> = tensor.shape().iter().map(|&d| d as i64).collect();
        let flat_data: Vec<f32> = tensor.iter().copied().collect();

        let input_value = Value::from_array((shape, flat_data))
            .map_err(|e| format!("Failed to create input tensor: {e}"))?;
        let inputs = ort::inputs![self.input_name.as_str() => input_value];

        let mut session = self
            .session
            .lock()
            .map_err(|e| format!("Session lock poisoned: {e}"))?;

        let outputs = session
            .run(inputs)
            .map_err(|e| format!("ONNX inference failed: {e}"))?;

        let selected = match &self.preferred_output {
            Some(name) => outputs.iter().find(|(n, _)| *n == name.as_str()),
            None => None,
        }
        .or_else(|| outputs.iter().next())
        .ok_or_else(|| "Model produced no outputs".to_string())?;

        let (shape, data) = selected
            .1
            .try_extract_tensor::<f32>()
            .map_err(|e| format!("Failed to extract output tensor {:?}: {e}", selected.0))?;

        Ok(TensorOutput {
            shape: shape.iter().copied().collect(),
            data: data.to_vec(),
        })
    }
}

impl TensorOutput {
    /// The first row of a `[1, N]` (or `[N]`) output.
    pub fn first_row(&self) -> Result<&[f32], String> {
        match self.shape.as_slice() {
            [_] => Ok(&self.data),
            [_, n] => {
                let n = *n as usize;
                self.data
                    .get(..n)
                    .ok_or_else(|| format!("Output shorter than declared shape {:?}", self.shape))
            }
            other => Err(format!("Unexpected output shape: {other:?}")),
        }
    }
}
