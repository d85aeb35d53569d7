//! Cheap upload checks that run before a full decode.
//!
//! The container format is sniffed from the leading bytes, never from the
//! extension, and must be one of `processing.supported_formats`.

use std::io::Read;
use std::path::Path;

use image::ImageFormat;

use crate::config::LimitsConfig;
use crate::error::PipelineError;

/// Long enough for every signature `image::guess_format` knows.
const SNIFF_LEN: u64 = 32;

const MIB: u64 = 1024 * 1024;

/// Pre-decode gate for uploads.
pub(crate) struct Validator {
    limits: LimitsConfig,
    accepted: Vec<ImageFormat>,
}

impl Validator {
    pub(crate) fn new(limits: LimitsConfig, supported_formats: &[String]) -> Self {
        let mut accepted = Vec::new();
        for name in supported_formats {
            match ImageFormat::from_extension(name.trim_start_matches('.').to_ascii_lowercase()) {
                Some(format) if !accepted.contains(&format) => accepted.push(format),
                Some(_) => {}
                None => tracing::warn!("Ignoring unknown image format {:?}", name),
            }
        }
        Self { limits, accepted }
    }

    /// Check that `path` is a regular file within the size limit whose bytes
    /// start like an accepted format. Returns the sniffed format.
    pub(crate) fn validate(&self, path: &Path) -> Result<ImageFormat, PipelineError> {
        if !path.is_file() {
            return Err(PipelineError::FileNotFound(path.to_path_buf()));
        }
        let corrupt = |message: String| PipelineError::CorruptImage {
            path: path.to_path_buf(),
            message,
        };

        let size = std::fs::metadata(path)
            .map_err(|e| corrupt(format!("Cannot read metadata: {e}")))?
            .len();
        if size > self.limits.max_file_size_mb.saturating_mul(MIB) {
            return Err(PipelineError::FileTooLarge {
                path: path.to_path_buf(),
                size_mb: size / MIB,
                max_mb: self.limits.max_file_size_mb,
            });
        }

        let mut header = Vec::with_capacity(SNIFF_LEN as usize);
        std::fs::File::open(path)
            .and_then(|file| file.take(SNIFF_LEN).read_to_end(&mut header))
            .map_err(|e| corrupt(format!("Cannot read header: {e}")))?;

        let format = image::guess_format(&header)
            .map_err(|_| corrupt("Not a recognized image".to_string()))?;
        if !self.accepted.contains(&format) {
            return Err(corrupt(format!("{format:?} uploads are not accepted")));
        }
        Ok(format)
    }
}
