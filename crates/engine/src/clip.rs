use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::error::{EngineError, Result};
use crate::media::{FrameDecoder, PreviewFrame};
use crate::source::SourceMedia;
use crate::time::Fps;

/// Opaque identifier for clips, unique within one timeline session.
pub type ClipId = u64;

/// Kind of clip a track holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClipKind {
    Video,
    Audio,
}

impl Display for ClipKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Video => write!(f, "video"),
            Self::Audio => write!(f, "audio"),
        }
    }
}

/// Placement of a source media excerpt at a timeline offset.
///
/// The clip spans the full source length starting at `timeline_start`;
/// `source_start` is the in-source offset matching `timeline_start`.
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    id: ClipId,
    name: String,
    source_start: f64,
    timeline_start: f64,
    source: Arc<SourceMedia>,
}

impl Placement {
    /// Creates a validated placement.
    ///
    /// Both offsets and the source length must be finite and non-negative.
    ///
    /// # Example
    /// ```
    /// use std::sync::Arc;
    ///
    /// use engine::{Placement, SourceMedia};
    ///
    /// let source = Arc::new(SourceMedia::new("a.mp4", 150, 5.0));
    /// let placement = Placement::new(1, "A", 0.0, 2.0, source).expect("valid");
    /// assert_eq!(placement.timeline_end(), 7.0);
    /// assert!(placement.contains(2.0));
    /// assert!(!placement.contains(7.0));
    /// ```
    pub fn new(
        id: ClipId,
        name: impl Into<String>,
        source_start: f64,
        timeline_start: f64,
        source: Arc<SourceMedia>,
    ) -> Result<Self> {
        let name = name.into();
        let reason = if !timeline_start.is_finite() || timeline_start < 0.0 {
            Some("timeline start must be a non-negative number of seconds")
        } else if !source_start.is_finite() || source_start < 0.0 {
            Some("source start must be a non-negative number of seconds")
        } else if !source.length().is_finite() || source.length() < 0.0 {
            Some("source length must be a non-negative number of seconds")
        } else {
            None
        };
        if let Some(reason) = reason {
            return Err(EngineError::InvalidPlacement { clip: name, reason });
        }

        Ok(Self {
            id,
            name,
            source_start,
            timeline_start,
            source,
        })
    }

    pub fn id(&self) -> ClipId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source_start(&self) -> f64 {
        self.source_start
    }

    pub fn timeline_start(&self) -> f64 {
        self.timeline_start
    }

    pub fn source(&self) -> &Arc<SourceMedia> {
        &self.source
    }

    /// Exclusive end of the clip on the timeline.
    pub fn timeline_end(&self) -> f64 {
        self.timeline_start + self.source.length()
    }

    /// Returns true when `timeline_seconds` lies in `[start, end)`.
    pub fn contains(&self, timeline_seconds: f64) -> bool {
        self.timeline_start <= timeline_seconds && timeline_seconds < self.timeline_end()
    }

    /// Half-open overlap test against `[start, end)`; touching is not overlap.
    pub fn overlaps(&self, start: f64, end: f64) -> bool {
        start < self.timeline_end() && end > self.timeline_start
    }
}

/// Clip types that can live on a [`crate::track::Track`].
pub trait PlacedClip {
    const KIND: ClipKind;

    fn placement(&self) -> &Placement;
}

/// Video placement that resolves to frame requests.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoClip {
    placement: Placement,
}

/// Audio placement. Carries no frame resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioClip {
    placement: Placement,
}

/// A clip of either kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Clip {
    Video(VideoClip),
    Audio(AudioClip),
}

/// Owned decode request for one timeline instant.
///
/// Holds no borrow of the timeline, so it can be resolved after the
/// timeline has been released to other writers.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameRequest {
    pub clip_id: ClipId,
    pub path: PathBuf,
    pub source_seconds: f64,
}

impl VideoClip {
    pub fn new(placement: Placement) -> Self {
        Self { placement }
    }

    /// Maps a timeline instant to the source timestamp to decode.
    ///
    /// Returns `None` when the source path is empty or the instant lies
    /// outside `[timeline_start, timeline_end)`. The source timestamp is
    /// clamped into `[source_start, source_start + length - 1 / fps]` so
    /// the decoder is never asked to seek to end-of-stream.
    ///
    /// # Example
    /// ```
    /// use std::sync::Arc;
    ///
    /// use engine::{Fps, Placement, SourceMedia, VideoClip};
    ///
    /// let source = Arc::new(SourceMedia::new("a.mp4", 90, 3.0));
    /// let clip = VideoClip::new(Placement::new(1, "A", 0.0, 10.0, source).unwrap());
    /// let fps = Fps::new(30.0).unwrap();
    ///
    /// let request = clip.frame_request_at(11.5, fps).unwrap();
    /// assert_eq!(request.source_seconds, 1.5);
    /// assert!(clip.frame_request_at(13.0, fps).is_none());
    /// ```
    pub fn frame_request_at(&self, timeline_seconds: f64, fps: Fps) -> Option<FrameRequest> {
        let placement = &self.placement;
        let source = placement.source();
        if source.file_path().as_os_str().is_empty() {
            return None;
        }
        if !placement.contains(timeline_seconds) {
            return None;
        }

        let source_seconds =
            timeline_seconds - placement.timeline_start() + placement.source_start();
        let max_source_seconds =
            placement.source_start() + source.length() - fps.frame_duration();
        let source_seconds = source_seconds
            .min(max_source_seconds)
            .max(placement.source_start());

        Some(FrameRequest {
            clip_id: placement.id(),
            path: source.file_path().to_path_buf(),
            source_seconds,
        })
    }

    /// Resolves and decodes the frame shown at `timeline_seconds`.
    pub async fn frame_at<D>(
        &self,
        timeline_seconds: f64,
        fps: Fps,
        decoder: &D,
    ) -> Option<PreviewFrame>
    where
        D: FrameDecoder,
    {
        let request = self.frame_request_at(timeline_seconds, fps)?;
        request.resolve(decoder).await
    }
}

impl AudioClip {
    pub fn new(placement: Placement) -> Self {
        Self { placement }
    }
}

impl PlacedClip for VideoClip {
    const KIND: ClipKind = ClipKind::Video;

    fn placement(&self) -> &Placement {
        &self.placement
    }
}

impl PlacedClip for AudioClip {
    const KIND: ClipKind = ClipKind::Audio;

    fn placement(&self) -> &Placement {
        &self.placement
    }
}

impl Clip {
    pub fn kind(&self) -> ClipKind {
        match self {
            Self::Video(_) => ClipKind::Video,
            Self::Audio(_) => ClipKind::Audio,
        }
    }

    pub fn placement(&self) -> &Placement {
        match self {
            Self::Video(clip) => clip.placement(),
            Self::Audio(clip) => clip.placement(),
        }
    }
}

impl FrameRequest {
    /// Asks `decoder` for the frame.
    ///
    /// Decoder failures are an expected outcome and resolve to `None`.
    pub async fn resolve<D>(&self, decoder: &D) -> Option<PreviewFrame>
    where
        D: FrameDecoder,
    {
        match decoder.decode_frame(&self.path, self.source_seconds).await {
            Ok(frame) => Some(frame),
            Err(error) => {
                debug!(
                    clip_id = self.clip_id,
                    source_seconds = self.source_seconds,
                    path = ?self.path,
                    %error,
                    "frame unavailable"
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::{ClipKind, Placement, VideoClip};
    use crate::error::EngineError;
    use crate::source::SourceMedia;
    use crate::testing::{MockDecoder, video_clip};
    use crate::time::Fps;

    fn fps30() -> Fps {
        Fps::new(30.0).expect("valid fps")
    }

    #[test]
    fn placement_rejects_negative_timeline_start() {
        let source = Arc::new(SourceMedia::new("a.mp4", 30, 1.0));
        let result = Placement::new(1, "A", 0.0, -0.5, source);
        assert!(matches!(
            result,
            Err(EngineError::InvalidPlacement { ref clip, .. }) if clip == "A"
        ));
    }

    #[test]
    fn placement_rejects_negative_source_length() {
        let source = Arc::new(SourceMedia::new("a.mp4", 0, -1.0));
        assert!(Placement::new(1, "A", 0.0, 0.0, source).is_err());
    }

    #[test]
    fn touching_intervals_do_not_overlap() {
        let clip = video_clip(1, "A", "a.mp4", 0.0, 0.0, 5.0);
        let placement = super::PlacedClip::placement(&clip);
        assert!(!placement.overlaps(5.0, 9.0));
        assert!(placement.overlaps(4.999, 9.0));
        assert!(!placement.overlaps(-3.0, 0.0));
    }

    #[test]
    fn maps_timeline_time_to_source_time_with_source_offset() {
        let clip = video_clip(1, "A", "a.mp4", 1.25, 4.0, 10.0);
        let request = clip.frame_request_at(6.0, fps30()).expect("inside clip");
        assert_eq!(request.clip_id, 1);
        assert!((request.source_seconds - 3.25).abs() < 1e-9);
    }

    #[test]
    fn instants_outside_the_clip_resolve_to_nothing() {
        let clip = video_clip(1, "A", "a.mp4", 0.0, 4.0, 2.0);
        assert!(clip.frame_request_at(3.999, fps30()).is_none());
        assert!(clip.frame_request_at(6.0, fps30()).is_none());
        assert!(clip.frame_request_at(4.0, fps30()).is_some());
    }

    #[test]
    fn last_instant_is_clamped_one_frame_before_end_of_media() {
        let clip = video_clip(1, "A", "a.mp4", 0.0, 0.0, 3.0);
        let fps = fps30();

        let request = clip
            .frame_request_at(3.0 - 1e-9, fps)
            .expect("last instant belongs to the clip");
        assert!(request.source_seconds <= 3.0 - fps.frame_duration() + 1e-12);
        assert!(request.source_seconds < 3.0);
    }

    #[test]
    fn clip_shorter_than_one_frame_requests_its_source_start() {
        let clip = video_clip(1, "A", "a.mp4", 2.0, 0.0, 0.01);
        let request = clip.frame_request_at(0.005, fps30()).expect("inside clip");
        assert_eq!(request.source_seconds, 2.0);
    }

    #[test]
    fn empty_source_path_resolves_to_nothing() {
        let clip = video_clip(1, "A", "", 0.0, 0.0, 3.0);
        assert!(clip.frame_request_at(1.0, fps30()).is_none());
    }

    #[test]
    fn clip_kind_is_displayed_in_lowercase() {
        assert_eq!(ClipKind::Video.to_string(), "video");
        assert_eq!(ClipKind::Audio.to_string(), "audio");
    }

    #[tokio::test]
    async fn frame_at_delegates_mapped_timestamp_to_decoder() {
        let decoder = MockDecoder::new();
        let clip = video_clip(1, "A", "a.mp4", 0.5, 1.0, 3.0);

        let frame = clip.frame_at(2.0, fps30(), &decoder).await;

        assert!(frame.is_some());
        let calls = decoder.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0.to_str(), Some("a.mp4"));
        assert!((calls[0].1 - 1.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn decoder_failure_resolves_to_no_frame() {
        let decoder = MockDecoder::failing();
        let clip = video_clip(1, "A", "a.mp4", 0.0, 0.0, 3.0);

        assert!(clip.frame_at(1.0, fps30(), &decoder).await.is_none());
        assert_eq!(decoder.calls().len(), 1);
    }

    #[tokio::test]
    async fn out_of_range_instant_never_reaches_decoder() {
        let decoder = MockDecoder::new();
        let clip: VideoClip = video_clip(1, "A", "a.mp4", 0.0, 0.0, 3.0);

        assert!(clip.frame_at(3.0, fps30(), &decoder).await.is_none());
        assert!(decoder.calls().is_empty());
    }
}
