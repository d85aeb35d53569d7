//! Configuration validation with range checks.

use crate::error::ConfigError;
use crate::output::OutputFormat;
use crate::taxonomy::RawLabel;

use super::Config;

fn unit_range(name: &str, value: f32) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(format!(
            "{name} must be between 0.0 and 1.0"
        )))
    }
}

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.processing.parallel_workers == 0 {
            return Err(ConfigError::ValidationError(
                "processing.parallel_workers must be > 0".into(),
            ));
        }
        if self.limits.max_file_size_mb == 0 {
            return Err(ConfigError::ValidationError(
                "limits.max_file_size_mb must be > 0".into(),
            ));
        }
        if self.limits.max_image_dimension == 0 {
            return Err(ConfigError::ValidationError(
                "limits.max_image_dimension must be > 0".into(),
            ));
        }
        if self.limits.classify_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "limits.classify_timeout_ms must be > 0".into(),
            ));
        }
        unit_range("limits.small_image_penalty", self.limits.small_image_penalty)?;

        if self.grid.image_size == 0 || self.semantic.image_size == 0 {
            return Err(ConfigError::ValidationError(
                "grid.image_size and semantic.image_size must be > 0".into(),
            ));
        }
        let temperature = self.semantic.temperature;
        if !temperature.is_finite() || temperature <= 0.0 {
            return Err(ConfigError::ValidationError(
                "semantic.temperature must be > 0".into(),
            ));
        }
        if self.semantic.prompts.is_empty() {
            return Err(ConfigError::ValidationError(
                "semantic.prompts must contain at least one prompt".into(),
            ));
        }
        for prompt in &self.semantic.prompts {
            if prompt.label.parse::<RawLabel>().is_err() {
                return Err(ConfigError::ValidationError(format!(
                    "semantic.prompts: label {:?} for {:?} is not a known raw label",
                    prompt.label, prompt.text
                )));
            }
        }

        let t = &self.triage;
        unit_range("triage.high_threshold", t.high_threshold)?;
        unit_range("triage.medium_threshold", t.medium_threshold)?;
        unit_range("triage.override_certainty", t.override_certainty)?;
        unit_range("triage.clean_suspicion", t.clean_suspicion)?;
        unit_range("triage.review_threshold", t.review_threshold)?;
        if t.medium_threshold > t.high_threshold {
            return Err(ConfigError::ValidationError(
                "triage.medium_threshold must not exceed triage.high_threshold".into(),
            ));
        }

        self.output
            .format
            .parse::<OutputFormat>()
            .map_err(|e| ConfigError::ValidationError(format!("output.format: {e}")))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PromptConfig;

    #[test]
    fn test_default_config_passes_validation() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_parallel_workers() {
        let mut config = Config::default();
        config.processing.parallel_workers = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("parallel_workers"));
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let mut config = Config::default();
        config.limits.classify_timeout_ms = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("classify_timeout_ms"));
    }

    #[test]
    fn test_validate_rejects_unknown_prompt_label() {
        let mut config = Config::default();
        config.semantic.prompts.push(PromptConfig {
            text: "kelp on rocks".into(),
            label: "seaweed".into(),
        });
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("seaweed"));
    }

    #[test]
    fn test_validate_rejects_empty_prompts() {
        let mut config = Config::default();
        config.semantic.prompts.clear();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("semantic.prompts"));
    }

    #[test]
    fn test_validate_rejects_unknown_output_format() {
        let mut config = Config::default();
        config.output.format = "csv".into();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("output.format"));
    }

    #[test]
    fn test_validate_rejects_bad_temperature() {
        let mut config = Config::default();
        config.semantic.temperature = 0.0;
        assert!(config.validate().is_err());
        config.semantic.temperature = f32::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_out_of_range_thresholds() {
        let mut config = Config::default();
        config.triage.review_threshold = 1.5;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("review_threshold"));

        let mut config = Config::default();
        config.triage.medium_threshold = 0.9;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("medium_threshold"));
    }
}
