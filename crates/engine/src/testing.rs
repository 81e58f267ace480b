//! Shared fixtures for engine unit tests.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::clip::{AudioClip, ClipId, Placement, VideoClip};
use crate::error::{EngineError, Result};
use crate::media::{FrameDecoder, MediaProbe, PreviewFrame, ProbedMedia};
use crate::source::SourceMedia;
use crate::time::Fps;

pub(crate) fn source(path: &str, length: f64) -> Arc<SourceMedia> {
    Arc::new(SourceMedia::new(path, (length * 30.0).round() as u64, length))
}

pub(crate) fn placement(
    id: ClipId,
    name: &str,
    path: &str,
    source_start: f64,
    timeline_start: f64,
    length: f64,
) -> Placement {
    Placement::new(id, name, source_start, timeline_start, source(path, length))
        .expect("valid placement")
}

pub(crate) fn video_clip(
    id: ClipId,
    name: &str,
    path: &str,
    source_start: f64,
    timeline_start: f64,
    length: f64,
) -> VideoClip {
    VideoClip::new(placement(id, name, path, source_start, timeline_start, length))
}

pub(crate) fn audio_clip(id: ClipId, name: &str, timeline_start: f64, length: f64) -> AudioClip {
    AudioClip::new(placement(id, name, "audio.wav", 0.0, timeline_start, length))
}

pub(crate) fn probed(path: &str, duration_seconds: f64) -> ProbedMedia {
    ProbedMedia {
        path: PathBuf::from(path),
        frame_rate: Fps::new(25.0).expect("valid fps"),
        frame_count: (duration_seconds * 25.0).round() as u64,
        duration_seconds,
        has_audio: true,
    }
}

/// Encodes the requested source time in the frame width (milliseconds).
pub(crate) fn frame_millis(frame: &PreviewFrame) -> u32 {
    frame.width
}

/// Records every decode and probe call; optionally fails or sleeps.
#[derive(Debug, Clone, Default)]
pub(crate) struct MockDecoder {
    calls: Arc<Mutex<Vec<(PathBuf, f64)>>>,
    fail: bool,
    delays: Vec<(f64, Duration)>,
    probes: Vec<ProbedMedia>,
}

impl MockDecoder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Sleeps for `delay` whenever `source_seconds` is requested.
    pub(crate) fn with_delay(mut self, source_seconds: f64, delay: Duration) -> Self {
        self.delays.push((source_seconds, delay));
        self
    }

    pub(crate) fn with_probe(mut self, probed: ProbedMedia) -> Self {
        self.probes.push(probed);
        self
    }

    pub(crate) fn calls(&self) -> Vec<(PathBuf, f64)> {
        self.calls.lock().expect("lock decode calls").clone()
    }
}

impl FrameDecoder for MockDecoder {
    async fn decode_frame(&self, path: &Path, at_seconds: f64) -> Result<PreviewFrame> {
        self.calls
            .lock()
            .expect("lock decode calls")
            .push((path.to_path_buf(), at_seconds));

        let delay = self
            .delays
            .iter()
            .find(|(seconds, _)| (seconds - at_seconds).abs() < 1e-6)
            .map(|(_, delay)| *delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.fail {
            return Err(EngineError::MissingVideoStream(path.to_path_buf()));
        }
        Ok(PreviewFrame {
            width: (at_seconds * 1_000.0).round() as u32,
            height: 1,
            bytes: Arc::from(vec![0; 4]),
        })
    }
}

impl MediaProbe for MockDecoder {
    async fn probe(&self, path: &Path) -> Result<ProbedMedia> {
        self.probes
            .iter()
            .find(|probed| probed.path == path)
            .cloned()
            .ok_or_else(|| EngineError::MissingVideoStream(path.to_path_buf()))
    }
}
