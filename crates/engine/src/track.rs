use tracing::{debug, warn};

use crate::clip::{AudioClip, ClipId, ClipKind, FrameRequest, PlacedClip, Placement, VideoClip};
use crate::error::{EngineError, Result};
use crate::media::{FrameDecoder, PreviewFrame};
use crate::time::Fps;

/// Track of video clips.
pub type VideoTrack = Track<VideoClip>;
/// Track of audio clips.
pub type AudioTrack = Track<AudioClip>;

/// One lane of non-overlapping clips of a single kind.
///
/// Clips are kept ordered by `(timeline_start, timeline_end)`. Because no two
/// accepted clips overlap, their ends are non-decreasing in that order too,
/// which lets placement checks and lookups inspect a single neighbor.
#[derive(Debug, Clone, PartialEq)]
pub struct Track<C> {
    name: String,
    clips: Vec<C>,
}

impl<C> Track<C>
where
    C: PlacedClip,
{
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            clips: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ClipKind {
        C::KIND
    }

    /// Clips in timeline order.
    pub fn clips(&self) -> &[C] {
        &self.clips
    }

    pub fn len(&self) -> usize {
        self.clips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    pub fn clip(&self, id: ClipId) -> Option<&C> {
        self.clips.iter().find(|clip| clip.placement().id() == id)
    }

    /// Validates that `placement` fits without overlapping any clip.
    pub fn check_placement(&self, placement: &Placement) -> Result<()> {
        let start = placement.timeline_start();
        let end = placement.timeline_end();

        // Only clips starting before `end` can overlap; of those, the last one
        // reaches furthest.
        let candidates = self
            .clips
            .partition_point(|clip| clip.placement().timeline_start() < end);
        let Some(existing) = candidates.checked_sub(1).map(|index| &self.clips[index]) else {
            return Ok(());
        };
        if !existing.placement().overlaps(start, end) {
            return Ok(());
        }

        warn!(
            track = %self.name,
            clip = placement.name(),
            existing = existing.placement().name(),
            start,
            end,
            "placement rejected: overlap"
        );
        Err(EngineError::PlacementConflict {
            clip: placement.name().to_string(),
            existing: existing.placement().name().to_string(),
            track: self.name.clone(),
        })
    }

    /// Adds `clip`, or fails with `PlacementConflict` leaving the track unchanged.
    ///
    /// A clip starting exactly where another ends is accepted.
    ///
    /// # Example
    /// ```
    /// use std::sync::Arc;
    ///
    /// use engine::{Placement, SourceMedia, VideoClip, VideoTrack};
    ///
    /// let source = Arc::new(SourceMedia::new("a.mp4", 150, 5.0));
    /// let mut track = VideoTrack::new("V1");
    /// let first = Placement::new(1, "A", 0.0, 0.0, Arc::clone(&source)).unwrap();
    /// let touching = Placement::new(2, "B", 0.0, 5.0, Arc::clone(&source)).unwrap();
    /// let overlapping = Placement::new(3, "C", 0.0, 4.0, source).unwrap();
    ///
    /// track.add_clip(VideoClip::new(first)).unwrap();
    /// track.add_clip(VideoClip::new(touching)).unwrap();
    /// assert!(track.add_clip(VideoClip::new(overlapping)).is_err());
    /// assert_eq!(track.len(), 2);
    /// ```
    pub fn add_clip(&mut self, clip: C) -> Result<()> {
        let placement = clip.placement();
        self.check_placement(placement)?;

        let key = (placement.timeline_start(), placement.timeline_end());
        let index = self.clips.partition_point(|existing| {
            let existing = existing.placement();
            (existing.timeline_start(), existing.timeline_end()) < key
        });

        debug!(
            track = %self.name,
            clip_id = placement.id(),
            clip = placement.name(),
            start = key.0,
            end = key.1,
            index,
            "placement accepted"
        );
        self.clips.insert(index, clip);
        Ok(())
    }

    /// Removes the clip with `id`; returns `None` when it is not on the track.
    pub fn remove_clip(&mut self, id: ClipId) -> Option<C> {
        let index = self
            .clips
            .iter()
            .position(|clip| clip.placement().id() == id)?;
        let removed = self.clips.remove(index);
        debug!(track = %self.name, clip_id = id, "clip removed");
        Some(removed)
    }

    /// Returns the clip whose `[start, end)` contains `timeline_seconds`.
    pub fn clip_at(&self, timeline_seconds: f64) -> Option<&C> {
        let started = self
            .clips
            .partition_point(|clip| clip.placement().timeline_start() <= timeline_seconds);
        let candidate = &self.clips[started.checked_sub(1)?];
        candidate
            .placement()
            .contains(timeline_seconds)
            .then_some(candidate)
    }

    /// Largest clip end on the track, or 0 when empty.
    ///
    /// This is also the snap point for appending after the last clip.
    pub fn end(&self) -> f64 {
        self.clips
            .last()
            .map(|clip| clip.placement().timeline_end())
            .unwrap_or(0.0)
    }
}

impl VideoTrack {
    /// Computes the decode request for `timeline_seconds`; gaps yield `None`.
    pub fn frame_request_at(&self, timeline_seconds: f64, fps: Fps) -> Option<FrameRequest> {
        let Some(clip) = self.clip_at(timeline_seconds) else {
            debug!(track = %self.name, timeline_seconds, "no clip at timestamp");
            return None;
        };
        clip.frame_request_at(timeline_seconds, fps)
    }

    /// Decodes the frame shown at `timeline_seconds` on this track.
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
        let frame = request.resolve(decoder).await;
        if frame.is_some() {
            debug!(
                track = %self.name,
                clip_id = request.clip_id,
                timeline_seconds,
                "frame retrieved"
            );
        }
        frame
    }
}
