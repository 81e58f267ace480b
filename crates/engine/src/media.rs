use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::error::{EngineError, Result};
use crate::time::Fps;

const DEFAULT_DECODE_WIDTH: u32 = 640;
const DEFAULT_DECODE_TIMEOUT: Duration = Duration::from_secs(10);

/// Decoded RGBA8 frame passed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewFrame {
    pub width: u32,
    pub height: u32,
    pub bytes: Arc<[u8]>,
}

/// Result of probing one media file for import.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbedMedia {
    pub path: PathBuf,
    pub frame_rate: Fps,
    pub frame_count: u64,
    pub duration_seconds: f64,
    pub has_audio: bool,
}

/// Reads the properties of a newly opened media file.
pub trait MediaProbe {
    /// Fails when the file cannot be probed or has no usable video stream.
    fn probe(&self, path: &Path) -> impl Future<Output = Result<ProbedMedia>> + Send;
}

/// Turns `(file, source timestamp)` into a decoded image.
pub trait FrameDecoder {
    fn decode_frame(
        &self,
        path: &Path,
        at_seconds: f64,
    ) -> impl Future<Output = Result<PreviewFrame>> + Send;
}

/// FFmpeg CLI-backed probe and decoder used by production wiring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FfmpegMediaBackend {
    decode_width: Option<u32>,
    decode_timeout: Option<Duration>,
}

impl Default for FfmpegMediaBackend {
    fn default() -> Self {
        Self {
            decode_width: Some(DEFAULT_DECODE_WIDTH),
            decode_timeout: Some(DEFAULT_DECODE_TIMEOUT),
        }
    }
}

impl FfmpegMediaBackend {
    /// Scales decoded frames to `width`; `None` keeps the native size.
    pub fn with_decode_width(mut self, width: Option<u32>) -> Self {
        self.decode_width = width;
        self
    }

    /// Kills a decode that has not finished after `timeout`.
    pub fn with_decode_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.decode_timeout = timeout;
        self
    }
}

impl MediaProbe for FfmpegMediaBackend {
    async fn probe(&self, path: &Path) -> Result<ProbedMedia> {
        let info = media_ffmpeg::probe_media(path).await?;
        let video = info
            .first_video()
            .ok_or_else(|| EngineError::MissingVideoStream(path.to_path_buf()))?;

        let duration_seconds = info
            .duration_seconds
            .or(video.duration_seconds)
            .filter(|seconds| seconds.is_finite() && *seconds >= 0.0)
            .ok_or_else(|| EngineError::MissingDuration(path.to_path_buf()))?;
        let frame_rate = video
            .frame_rate()
            .ok_or_else(|| EngineError::MissingFrameRate(path.to_path_buf()))
            .and_then(|rate| Fps::from_ratio(rate.num, rate.den))?;
        let frame_count = video
            .nb_frames
            .unwrap_or_else(|| (frame_rate.get() * duration_seconds).round() as u64);

        Ok(ProbedMedia {
            path: info.path.clone(),
            frame_rate,
            frame_count,
            duration_seconds,
            has_audio: info.first_audio().is_some(),
        })
    }
}

impl FrameDecoder for FfmpegMediaBackend {
    async fn decode_frame(&self, path: &Path, at_seconds: f64) -> Result<PreviewFrame> {
        let decoded = media_ffmpeg::decode_frame(&media_ffmpeg::DecodeRequest {
            path: path.to_path_buf(),
            at_seconds,
            width: self.decode_width,
            timeout: self.decode_timeout,
        })
        .await?;

        Ok(PreviewFrame {
            width: decoded.width,
            height: decoded.height,
            bytes: decoded.rgba.into(),
        })
    }
}
