use std::fmt::{Display, Formatter};
use std::path::PathBuf;

use crate::clip::ClipKind;
use crate::project::MediaId;

/// Result type used by the engine crate.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors produced by engine commands and timeline operations.
#[derive(Debug)]
pub enum EngineError {
    PlacementConflict {
        clip: String,
        existing: String,
        track: String,
    },
    InvalidPlacement {
        clip: String,
        reason: &'static str,
    },
    InvalidFrameRate(f64),
    TrackNotFound {
        kind: ClipKind,
        index: usize,
    },
    MissingMedia {
        media_id: MediaId,
    },
    MissingVideoStream(PathBuf),
    MissingDuration(PathBuf),
    MissingFrameRate(PathBuf),
    Media(media_ffmpeg::MediaFfmpegError),
}

impl EngineError {
    /// Returns true for errors raised while probing a newly opened file.
    pub fn is_probe_failure(&self) -> bool {
        matches!(
            self,
            Self::MissingVideoStream(_)
                | Self::MissingDuration(_)
                | Self::MissingFrameRate(_)
                | Self::Media(_)
        )
    }
}

impl Display for EngineError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PlacementConflict {
                clip,
                existing,
                track,
            } => write!(
                f,
                "clip '{clip}' overlaps with existing clip '{existing}' on track '{track}'"
            ),
            Self::InvalidPlacement { clip, reason } => {
                write!(f, "invalid placement for clip '{clip}': {reason}")
            }
            Self::InvalidFrameRate(value) => write!(f, "invalid frame rate: {value}"),
            Self::TrackNotFound { kind, index } => {
                write!(f, "{kind} track not found: {index}")
            }
            Self::MissingMedia { media_id } => write!(f, "media not found: {media_id}"),
            Self::MissingVideoStream(path) => {
                write!(f, "no usable video stream: {}", path.display())
            }
            Self::MissingDuration(path) => {
                write!(f, "media duration is missing: {}", path.display())
            }
            Self::MissingFrameRate(path) => {
                write!(f, "video frame rate is missing: {}", path.display())
            }
            Self::Media(err) => write!(f, "media backend error: {err}"),
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Media(err) => Some(err),
            _ => None,
        }
    }
}

impl From<media_ffmpeg::MediaFfmpegError> for EngineError {
    fn from(value: media_ffmpeg::MediaFfmpegError) -> Self {
        Self::Media(value)
    }
}
