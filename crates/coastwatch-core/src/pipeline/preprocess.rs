//! Image loading and integrity checks ahead of classification.

use image::{DynamicImage, GenericImageView, ImageReader};
use std::path::Path;

use crate::config::{Config, LimitsConfig, ProcessingConfig};
use crate::error::PipelineError;

use super::validate::Validator;

/// A decoded upload that passed validation.
pub struct PreparedImage {
    /// The decoded image data
    pub image: DynamicImage,
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
    /// Shorter side fell under the minimum dimension
    pub is_suspicious: bool,
    /// Advisory confidence multiplier, set only for suspicious images
    pub confidence_penalty: Option<f32>,
}

/// Validates and decodes uploads.
///
/// Decoding is a full pixel decode, so truncated files are caught here rather
/// than inside a backend.
pub struct ImagePreprocessor {
    validator: Validator,
    limits: LimitsConfig,
}

impl ImagePreprocessor {
    /// A preprocessor accepting the default upload formats.
    pub fn new(limits: LimitsConfig) -> Self {
        Self::with_formats(limits, &ProcessingConfig::default().supported_formats)
    }

    pub fn from_config(config: &Config) -> Self {
        Self::with_formats(config.limits.clone(), &config.processing.supported_formats)
    }

    fn with_formats(limits: LimitsConfig, supported_formats: &[String]) -> Self {
        Self {
            validator: Validator::new(limits.clone(), supported_formats),
            limits,
        }
    }

    /// Validate and decode the image at `path`.
    ///
    /// Fails with `FileNotFound` when the path is not a file and with
    /// `CorruptImage` when the bytes do not decode.
    pub fn load_and_validate(&self, path: &Path) -> Result<PreparedImage, PipelineError> {
        let format = self.validator.validate(path)?;

        let mut reader = ImageReader::open(path).map_err(|e| PipelineError::CorruptImage {
            path: path.to_path_buf(),
            message: format!("Cannot open file: {e}"),
        })?;
        reader.set_format(format);
        let image = reader
            .decode()
            .map_err(|e| PipelineError::CorruptImage {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(PipelineError::CorruptImage {
                path: path.to_path_buf(),
                message: "Image has no pixels".to_string(),
            });
        }
        if width > self.limits.max_image_dimension || height > self.limits.max_image_dimension {
            return Err(PipelineError::ImageTooLarge {
                path: path.to_path_buf(),
                width,
                height,
                max_dim: self.limits.max_image_dimension,
            });
        }

        let is_suspicious = width.min(height) < self.limits.min_image_dimension;
        if is_suspicious {
            tracing::debug!(
                "{:?} is only {}x{}; flagging as suspicious",
                path,
                width,
                height
            );
        }

        Ok(PreparedImage {
            image,
            width,
            height,
            is_suspicious,
            confidence_penalty: is_suspicious.then_some(self.limits.small_image_penalty),
        })
    }
}
