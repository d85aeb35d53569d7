//! Finding uploads on disk for batch runs.

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::ProcessingConfig;

/// Outcome of scanning a path for uploads.
#[derive(Debug, Default)]
pub struct Discovery {
    /// Supported image files, sorted by path
    pub files: Vec<PathBuf>,
    /// Files passed over because of their extension or a hidden name
    pub skipped: usize,
}

/// Collects image files by extension.
pub struct FileDiscovery {
    extensions: Vec<String>,
}

impl FileDiscovery {
    pub fn new(config: &ProcessingConfig) -> Self {
        Self {
            extensions: config
                .supported_formats
                .iter()
                .map(|ext| ext.trim_start_matches('.').to_lowercase())
                .collect(),
        }
    }

    /// Scan `path`: a single file is taken as-is when supported, a directory
    /// is walked recursively. Hidden entries (`.DS_Store`, `._IMG_0001.jpg`)
    /// are skipped.
    pub fn discover(&self, path: &Path) -> Discovery {
        let mut discovery = Discovery::default();

        if path.is_file() {
            if self.accepts(path) {
                discovery.files.push(path.to_path_buf());
            } else {
                discovery.skipped += 1;
            }
            return discovery;
        }

        for entry in WalkDir::new(path)
            .follow_links(true)
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_hidden(e.path()))
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
        {
            if self.accepts(entry.path()) {
                discovery.files.push(entry.into_path());
            } else {
                discovery.skipped += 1;
            }
        }

        discovery.files.sort();
        tracing::debug!(
            "Found {} uploads under {:?} ({} skipped)",
            discovery.files.len(),
            path,
            discovery.skipped
        );
        discovery
    }

    fn accepts(&self, path: &Path) -> bool {
        if is_hidden(path) {
            return false;
        }
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                let ext = ext.to_lowercase();
                self.extensions.iter().any(|known| *known == ext)
            })
            .unwrap_or(false)
    }
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with('.'))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_configured_extensions() {
        let discovery = FileDiscovery::new(&ProcessingConfig::default());

        assert!(discovery.accepts(Path::new("beach.jpg")));
        assert!(discovery.accepts(Path::new("BEACH.JPG")));
        assert!(discovery.accepts(Path::new("slick.tiff")));
        assert!(!discovery.accepts(Path::new("report.pdf")));
        assert!(!discovery.accepts(Path::new("no_extension")));
        assert!(!discovery.accepts(Path::new("._beach.jpg")));
    }

    #[test]
    fn test_dotted_extensions_in_config() {
        let config = ProcessingConfig {
            supported_formats: vec![".PNG".to_string()],
            ..ProcessingConfig::default()
        };
        let discovery = FileDiscovery::new(&config);
        assert!(discovery.accepts(Path::new("a.png")));
        assert!(!discovery.accepts(Path::new("a.jpg")));
    }

    #[test]
    fn test_discover_walks_directories() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("2024").join("march");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(dir.path().join("b.jpg"), b"x").unwrap();
        std::fs::write(nested.join("a.png"), b"x").unwrap();
        std::fs::write(nested.join("notes.txt"), b"x").unwrap();
        std::fs::write(dir.path().join(".DS_Store"), b"x").unwrap();

        let found = FileDiscovery::new(&ProcessingConfig::default()).discover(dir.path());
        assert_eq!(
            found.files,
            vec![nested.join("a.png"), dir.path().join("b.jpg")]
        );
        assert_eq!(found.skipped, 1);
    }

    #[test]
    fn test_discover_single_file() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("upload.webp");
        let other = dir.path().join("upload.json");
        std::fs::write(&image, b"x").unwrap();
        std::fs::write(&other, b"{}").unwrap();

        let discovery = FileDiscovery::new(&ProcessingConfig::default());
        assert_eq!(discovery.discover(&image).files, vec![image.clone()]);
        let rejected = discovery.discover(&other);
        assert!(rejected.files.is_empty());
        assert_eq!(rejected.skipped, 1);
    }
}
