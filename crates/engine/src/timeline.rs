use tracing::debug;

use crate::clip::{Clip, ClipId, ClipKind, FrameRequest, PlacedClip, Placement};
use crate::error::{EngineError, Result};
use crate::media::{FrameDecoder, PreviewFrame};
use crate::time::Fps;
use crate::track::{AudioTrack, VideoTrack};

/// Parallel video and audio tracks for one editing session.
///
/// Video track 0 is the primary track used for frame resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct Timeline {
    fps: Fps,
    video_tracks: Vec<VideoTrack>,
    audio_tracks: Vec<AudioTrack>,
}

impl Timeline {
    /// Creates a timeline with one video track `V1` and one audio track `A1`.
    pub fn new(fps: Fps) -> Self {
        Self {
            fps,
            video_tracks: vec![VideoTrack::new("V1")],
            audio_tracks: vec![AudioTrack::new("A1")],
        }
    }

    pub fn fps(&self) -> Fps {
        self.fps
    }

    pub fn set_fps(&mut self, fps: Fps) {
        self.fps = fps;
    }

    pub fn video_tracks(&self) -> &[VideoTrack] {
        &self.video_tracks
    }

    pub fn audio_tracks(&self) -> &[AudioTrack] {
        &self.audio_tracks
    }

    pub fn primary_video_track(&self) -> &VideoTrack {
        &self.video_tracks[0]
    }

    pub fn video_track(&self, index: usize) -> Result<&VideoTrack> {
        self.video_tracks.get(index).ok_or(EngineError::TrackNotFound {
            kind: ClipKind::Video,
            index,
        })
    }

    pub fn video_track_mut(&mut self, index: usize) -> Result<&mut VideoTrack> {
        self.video_tracks
            .get_mut(index)
            .ok_or(EngineError::TrackNotFound {
                kind: ClipKind::Video,
                index,
            })
    }

    pub fn audio_track(&self, index: usize) -> Result<&AudioTrack> {
        self.audio_tracks.get(index).ok_or(EngineError::TrackNotFound {
            kind: ClipKind::Audio,
            index,
        })
    }

    pub fn audio_track_mut(&mut self, index: usize) -> Result<&mut AudioTrack> {
        self.audio_tracks
            .get_mut(index)
            .ok_or(EngineError::TrackNotFound {
                kind: ClipKind::Audio,
                index,
            })
    }

    /// Appends a video track and returns its index.
    pub fn add_video_track(&mut self, name: impl Into<String>) -> usize {
        self.video_tracks.push(VideoTrack::new(name));
        self.video_tracks.len() - 1
    }

    /// Appends an audio track and returns its index.
    pub fn add_audio_track(&mut self, name: impl Into<String>) -> usize {
        self.audio_tracks.push(AudioTrack::new(name));
        self.audio_tracks.len() - 1
    }

    /// Places `clip` on the track of matching kind at `track`.
    pub fn add_clip(&mut self, track: usize, clip: Clip) -> Result<()> {
        match clip {
            Clip::Video(clip) => self.video_track_mut(track)?.add_clip(clip),
            Clip::Audio(clip) => self.audio_track_mut(track)?.add_clip(clip),
        }
    }

    /// Removes a clip by id; `Ok(None)` when the track does not hold it.
    pub fn remove_clip(&mut self, kind: ClipKind, track: usize, id: ClipId) -> Result<Option<Clip>> {
        let removed = match kind {
            ClipKind::Video => self.video_track_mut(track)?.remove_clip(id).map(Clip::Video),
            ClipKind::Audio => self.audio_track_mut(track)?.remove_clip(id).map(Clip::Audio),
        };
        Ok(removed)
    }

    /// Returns the largest clip end over all video tracks, or 0 when empty.
    ///
    /// Recomputed on every call and never padded.
    ///
    /// # Example
    /// ```
    /// use engine::{Fps, Timeline};
    ///
    /// let timeline = Timeline::new(Fps::new(30.0).unwrap());
    /// assert_eq!(timeline.total_duration(), 0.0);
    /// ```
    pub fn total_duration(&self) -> f64 {
        self.video_tracks
            .iter()
            .map(|track| track.end())
            .fold(0.0, f64::max)
    }

    /// Insertion point that appends after the last clip of the primary track.
    pub fn snap_point(&self) -> f64 {
        self.primary_video_track().end()
    }

    /// Clamps a playhead position into `[0, total_duration]`.
    pub fn clamp_playhead(&self, seconds: f64) -> f64 {
        if !seconds.is_finite() {
            return 0.0;
        }
        seconds.clamp(0.0, self.total_duration())
    }

    /// Computes the decode request for `seconds` on the primary video track.
    pub fn frame_request_at(&self, seconds: f64) -> Option<FrameRequest> {
        self.primary_video_track()
            .frame_request_at(seconds, self.fps)
    }

    /// Decodes the frame to display at `seconds`.
    ///
    /// Only the primary video track is consulted.
    pub async fn frame_at<D>(&self, seconds: f64, decoder: &D) -> Option<PreviewFrame>
    where
        D: FrameDecoder,
    {
        self.primary_video_track()
            .frame_at(seconds, self.fps, decoder)
            .await
    }

    /// Iterates `(kind, track index, clip placement)` over all tracks.
    pub fn placements(&self) -> impl Iterator<Item = (ClipKind, usize, &Placement)> {
        let video = self.video_tracks.iter().enumerate().flat_map(|(index, track)| {
            track
                .clips()
                .iter()
                .map(move |clip| (ClipKind::Video, index, clip.placement()))
        });
        let audio = self.audio_tracks.iter().enumerate().flat_map(|(index, track)| {
            track
                .clips()
                .iter()
                .map(move |clip| (ClipKind::Audio, index, clip.placement()))
        });
        video.chain(audio)
    }

    pub(crate) fn log_layout(&self) {
        debug!(
            video_tracks = self.video_tracks.len(),
            audio_tracks = self.audio_tracks.len(),
            clip_count = self.placements().count(),
            total_duration = self.total_duration(),
            "timeline layout changed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::Timeline;
    use crate::clip::{Clip, ClipKind};
    use crate::error::EngineError;
    use crate::testing::{MockDecoder, audio_clip, frame_millis, video_clip};
    use crate::time::Fps;

    fn timeline() -> Timeline {
        Timeline::new(Fps::new(30.0).expect("valid fps"))
    }

    #[test]
    fn new_timeline_has_one_video_and_one_audio_track() {
        let timeline = timeline();
        assert_eq!(timeline.video_tracks().len(), 1);
        assert_eq!(timeline.audio_tracks().len(), 1);
        assert_eq!(timeline.primary_video_track().name(), "V1");
        assert_eq!(timeline.audio_tracks()[0].name(), "A1");
    }

    #[test]
    fn total_duration_is_max_end_over_all_video_tracks() {
        let mut timeline = timeline();
        let v2 = timeline.add_video_track("V2");
        timeline
            .add_clip(0, Clip::Video(video_clip(1, "A", "a.mp4", 0.0, 0.0, 5.0)))
            .expect("fits");
        timeline
            .add_clip(v2, Clip::Video(video_clip(2, "B", "b.mp4", 0.0, 3.0, 6.0)))
            .expect("fits");
        timeline
            .add_clip(0, Clip::Audio(audio_clip(3, "Long audio", 0.0, 60.0)))
            .expect("fits");

        assert_eq!(timeline.total_duration(), 9.0);
    }

    #[test]
    fn adding_clips_never_shrinks_duration() {
        let mut timeline = timeline();
        let mut previous = timeline.total_duration();
        for (id, start) in [(1, 4.0), (2, 0.0), (3, 10.0), (4, 6.0)] {
            timeline
                .add_clip(0, Clip::Video(video_clip(id, "c", "c.mp4", 0.0, start, 2.0)))
                .expect("fits");
            let duration = timeline.total_duration();
            assert!(duration >= previous);
            previous = duration;
        }
        assert_eq!(previous, 12.0);
    }

    #[test]
    fn removing_the_last_clip_recomputes_duration() {
        let mut timeline = timeline();
        timeline
            .add_clip(0, Clip::Video(video_clip(1, "A", "a.mp4", 0.0, 0.0, 5.0)))
            .expect("fits");
        timeline
            .add_clip(0, Clip::Video(video_clip(2, "B", "b.mp4", 0.0, 5.0, 4.0)))
            .expect("fits");

        let removed = timeline
            .remove_clip(ClipKind::Video, 0, 2)
            .expect("track exists")
            .expect("clip exists");
        assert_eq!(removed.kind(), ClipKind::Video);
        assert_eq!(timeline.total_duration(), 5.0);

        timeline
            .remove_clip(ClipKind::Video, 0, 1)
            .expect("track exists");
        assert_eq!(timeline.total_duration(), 0.0);
    }

    #[test]
    fn unknown_track_index_is_reported() {
        let mut timeline = timeline();
        let result = timeline.add_clip(3, Clip::Audio(audio_clip(1, "A", 0.0, 1.0)));
        assert!(matches!(
            result,
            Err(EngineError::TrackNotFound {
                kind: ClipKind::Audio,
                index: 3
            })
        ));
    }

    #[test]
    fn snap_point_appends_after_last_clip() {
        let mut timeline = timeline();
        assert_eq!(timeline.snap_point(), 0.0);
        timeline
            .add_clip(0, Clip::Video(video_clip(1, "A", "a.mp4", 0.0, 2.0, 3.0)))
            .expect("fits");
        let snap = timeline.snap_point();
        assert_eq!(snap, 5.0);
        timeline
            .add_clip(0, Clip::Video(video_clip(2, "B", "b.mp4", 0.0, snap, 1.0)))
            .expect("snapped clip touches A");
    }

    #[test]
    fn playhead_is_clamped_into_timeline_bounds() {
        let mut timeline = timeline();
        assert_eq!(timeline.clamp_playhead(3.0), 0.0);
        timeline
            .add_clip(0, Clip::Video(video_clip(1, "A", "a.mp4", 0.0, 0.0, 5.0)))
            .expect("fits");
        assert_eq!(timeline.clamp_playhead(-1.0), 0.0);
        assert_eq!(timeline.clamp_playhead(2.5), 2.5);
        assert_eq!(timeline.clamp_playhead(8.0), 5.0);
        assert_eq!(timeline.clamp_playhead(f64::NAN), 0.0);
    }

    #[tokio::test]
    async fn empty_timeline_resolves_no_frame() {
        let decoder = MockDecoder::new();
        let timeline = timeline();

        assert!(timeline.frame_at(0.0, &decoder).await.is_none());
        assert!(timeline.frame_at(12.5, &decoder).await.is_none());
        assert!(decoder.calls().is_empty());
    }

    #[tokio::test]
    async fn frame_resolution_only_consults_primary_video_track() {
        let decoder = MockDecoder::new();
        let mut timeline = timeline();
        let v2 = timeline.add_video_track("V2");
        timeline
            .add_clip(v2, Clip::Video(video_clip(1, "Overlay", "o.mp4", 0.0, 0.0, 5.0)))
            .expect("fits");
        timeline
            .add_clip(0, Clip::Video(video_clip(2, "Main", "m.mp4", 1.0, 2.0, 5.0)))
            .expect("fits");

        assert!(timeline.frame_at(1.0, &decoder).await.is_none());
        let frame = timeline.frame_at(3.0, &decoder).await.expect("inside Main");
        assert_eq!(frame_millis(&frame), 2_000);
        assert_eq!(decoder.calls().len(), 1);
    }

    #[tokio::test]
    async fn frame_at_uses_timeline_fps_for_the_end_margin() {
        let decoder = MockDecoder::new();
        let mut timeline = Timeline::new(Fps::new(10.0).expect("valid fps"));
        timeline
            .add_clip(0, Clip::Video(video_clip(1, "A", "a.mp4", 0.0, 0.0, 3.0)))
            .expect("fits");

        let frame = timeline
            .frame_at(2.95, &decoder)
            .await
            .expect("inside A");
        assert_eq!(frame_millis(&frame), 2_900);
    }
}
