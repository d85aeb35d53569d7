//! The grid model's output-head vocabulary.
//!
//! The artifact is a JSON document that either lists class names in head
//! order (`{"classes": [...]}`) or maps names to head indices
//! (`{"class_to_idx": {...}}`). A missing or unreadable artifact falls back to
//! the vocabulary the shipped model was trained with.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::PipelineError;
use crate::taxonomy::RawLabel;

/// Head order of the default grid model.
pub const DEFAULT_CLASSES: [&str; 8] = [
    "cardboard",
    "clean_water",
    "glass",
    "marine_trash",
    "metal",
    "oil_spill",
    "paper",
    "plastic",
];

#[derive(Debug, Deserialize)]
struct MappingDocument {
    #[serde(default)]
    classes: Option<Vec<String>>,
    #[serde(default)]
    class_to_idx: Option<BTreeMap<String, i64>>,
}

/// Ordered class labels, one per output index.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelVocabulary {
    labels: Vec<RawLabel>,
}

impl LabelVocabulary {
    /// The built-in fallback vocabulary.
    pub fn fallback() -> Self {
        Self {
            labels: DEFAULT_CLASSES
                .iter()
                .filter_map(|name| name.parse().ok())
                .collect(),
        }
    }

    /// Build a vocabulary from names in head order.
    ///
    /// Every name must be a known raw label.
    pub fn from_names<S: AsRef<str>>(backend: &str, names: &[S]) -> Result<Self, PipelineError> {
        let labels = names
            .iter()
            .map(|name| {
                name.as_ref()
                    .parse::<RawLabel>()
                    .map_err(|_| PipelineError::UnmappedLabel {
                        backend: backend.to_string(),
                        label: name.as_ref().to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { labels })
    }

    /// Parse a mapping document. Returns `Ok(None)` when the document has
    /// neither recognized key.
    pub fn parse(backend: &str, json: &str) -> Result<Option<Self>, PipelineError> {
        let doc: MappingDocument =
            serde_json::from_str(json).map_err(|e| PipelineError::BackendUnavailable {
                backend: backend.to_string(),
                message: format!("Invalid class mapping: {e}"),
            })?;

        if let Some(classes) = doc.classes {
            return Self::from_names(backend, &classes).map(Some);
        }
        if let Some(class_to_idx) = doc.class_to_idx {
            let mut indexed: Vec<(i64, String)> =
                class_to_idx.into_iter().map(|(k, v)| (v, k)).collect();
            indexed.sort();
            let names: Vec<String> = indexed.into_iter().map(|(_, name)| name).collect();
            return Self::from_names(backend, &names).map(Some);
        }
        Ok(None)
    }

    /// Load the vocabulary artifact at `path`, falling back to the defaults
    /// when it is absent or unusable.
    ///
    /// Labels outside the taxonomy are an error, not a fallback: they would
    /// otherwise surface mid-request.
    pub fn load_or_default(backend: &str, path: &Path) -> Result<Self, PipelineError> {
        if !path.exists() {
            tracing::warn!(
                "Class mapping not found at {:?}; using built-in classes",
                path
            );
            return Ok(Self::fallback());
        }

        let json = match std::fs::read_to_string(path) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!("Cannot read class mapping {:?}: {}; using built-in classes", path, e);
                return Ok(Self::fallback());
            }
        };

        match Self::parse(backend, &json) {
            Ok(Some(vocab)) if !vocab.is_empty() => {
                tracing::info!("Class mapping loaded: {:?}", vocab.names());
                Ok(vocab)
            }
            Ok(_) => {
                tracing::warn!("Class mapping {:?} lists no classes; using built-in classes", path);
                Ok(Self::fallback())
            }
            Err(e @ PipelineError::UnmappedLabel { .. }) => Err(e),
            Err(e) => {
                tracing::warn!("{e}; using built-in classes");
                Ok(Self::fallback())
            }
        }
    }

    pub fn get(&self, index: usize) -> Option<RawLabel> {
        self.labels.get(index).copied()
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.labels.iter().map(|l| l.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_matches_default_classes() {
        let vocab = LabelVocabulary::fallback();
        assert_eq!(vocab.names(), DEFAULT_CLASSES.to_vec());
    }

    #[test]
    fn test_parse_explicit_list() {
        let vocab = LabelVocabulary::parse("grid", r#"{"classes": ["plastic", "oil_spill"]}"#)
            .unwrap()
            .unwrap();
        assert_eq!(vocab.names(), vec!["plastic", "oil_spill"]);
    }

    #[test]
    fn test_parse_index_table_is_inverted_by_index() {
        let vocab = LabelVocabulary::parse(
            "grid",
            r#"{"class_to_idx": {"plastic": 2, "glass": 0, "metal": 1}}"#,
        )
        .unwrap()
        .unwrap();
        assert_eq!(vocab.names(), vec!["glass", "metal", "plastic"]);
        assert_eq!(vocab.get(2), Some(RawLabel::Plastic));
        assert_eq!(vocab.get(3), None);
    }

    #[test]
    fn test_parse_prefers_explicit_list() {
        let vocab = LabelVocabulary::parse(
            "grid",
            r#"{"classes": ["paper"], "class_to_idx": {"glass": 0}}"#,
        )
        .unwrap()
        .unwrap();
        assert_eq!(vocab.names(), vec!["paper"]);
    }

    #[test]
    fn test_parse_unknown_shape_is_none() {
        assert!(LabelVocabulary::parse("grid", r#"{"labels": []}"#)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_parse_rejects_unmapped_label() {
        let err = LabelVocabulary::parse("grid", r#"{"classes": ["plastic", "seaweed"]}"#)
            .unwrap_err();
        assert!(matches!(err, PipelineError::UnmappedLabel { .. }));
    }

    #[test]
    fn test_missing_file_falls_back() {
        let vocab =
            LabelVocabulary::load_or_default("grid", Path::new("/nonexistent/mapping.json"))
                .unwrap();
        assert_eq!(vocab, LabelVocabulary::fallback());
    }

    #[test]
    fn test_malformed_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("class_mapping.json");
        std::fs::write(&path, "{ not json").unwrap();
        let vocab = LabelVocabulary::load_or_default("grid", &path).unwrap();
        assert_eq!(vocab, LabelVocabulary::fallback());
    }

    #[test]
    fn test_file_with_unmapped_label_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("class_mapping.json");
        std::fs::write(&path, r#"{"classes": ["kelp"]}"#).unwrap();
        assert!(LabelVocabulary::load_or_default("grid", &path).is_err());
    }
}
