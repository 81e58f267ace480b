use std::path::{Path, PathBuf};

/// Immutable reference to a probed media file.
///
/// Clips share one `SourceMedia` through `Arc`; it lives as long as the
/// last clip referencing it.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceMedia {
    file_path: PathBuf,
    frame_count: u64,
    length: f64,
}

impl SourceMedia {
    pub fn new(file_path: impl Into<PathBuf>, frame_count: u64, length: f64) -> Self {
        Self {
            file_path: file_path.into(),
            frame_count,
            length,
        }
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Media length in seconds.
    pub fn length(&self) -> f64 {
        self.length
    }
}
