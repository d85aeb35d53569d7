//! Per-upload pipeline stages.
//!
//! - **validate**: cheap checks before decoding (existence, size, sniffed format)
//! - **preprocess**: full decode and dimension checks
//! - **geotag**: GPS position from EXIF
//! - **discovery**: find uploads in directories for batch runs
//! - **analyzer**: orchestrates classification for one upload

pub mod analyzer;
pub mod discovery;
pub mod geotag;
pub mod preprocess;
mod validate;

pub use analyzer::{Analysis, PollutionAnalyzer};
pub use discovery::{Discovery, FileDiscovery};
pub use geotag::GeoTagExtractor;
pub use preprocess::{ImagePreprocessor, PreparedImage};
