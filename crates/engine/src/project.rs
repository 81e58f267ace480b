use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use crate::clip::{AudioClip, Clip, ClipId, ClipKind, PlacedClip, Placement, VideoClip};
use crate::error::{EngineError, Result};
use crate::media::ProbedMedia;
use crate::source::SourceMedia;
use crate::time::Fps;
use crate::timeline::Timeline;
use crate::track::Track;

/// Opaque identifier for imported media.
pub type MediaId = u64;

/// Editing session state: imported media and the timeline using it.
#[derive(Debug, Clone, PartialEq)]
pub struct Project {
    media: Vec<MediaAsset>,
    timeline: Timeline,
}

/// Imported media tracked by the project.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaAsset {
    pub id: MediaId,
    pub source: Arc<SourceMedia>,
    pub frame_rate: Fps,
    pub has_audio: bool,
}

/// Ids assigned by a successful import.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImportedClips {
    pub media_id: MediaId,
    pub video_clip: ClipId,
    pub audio_clip: Option<ClipId>,
    pub timeline_start: f64,
}

/// Immutable project snapshot consumed by the UI.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectSnapshot {
    pub media: Vec<MediaSummary>,
    pub video_tracks: Vec<TrackSummary>,
    pub audio_tracks: Vec<TrackSummary>,
    pub fps: Fps,
    pub total_duration: f64,
}

/// Snapshot representation of one imported media file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MediaSummary {
    pub id: MediaId,
    pub path: PathBuf,
    pub frame_count: u64,
    pub length: f64,
    pub frame_rate: Fps,
}

/// Snapshot representation of one track.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackSummary {
    pub name: String,
    pub kind: ClipKind,
    pub clips: Vec<ClipSummary>,
}

/// Snapshot representation of one placed clip.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClipSummary {
    pub id: ClipId,
    pub name: String,
    pub path: PathBuf,
    pub source_start: f64,
    pub timeline_start: f64,
    pub timeline_end: f64,
}

impl Project {
    pub fn new(fps: Fps) -> Self {
        Self {
            media: Vec::new(),
            timeline: Timeline::new(fps),
        }
    }

    pub fn media(&self) -> &[MediaAsset] {
        &self.media
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn timeline_mut(&mut self) -> &mut Timeline {
        &mut self.timeline
    }

    pub fn media_by_id(&self, media_id: MediaId) -> Result<&MediaAsset> {
        self.media
            .iter()
            .find(|asset| asset.id == media_id)
            .ok_or(EngineError::MissingMedia { media_id })
    }

    /// Registers probed media and appends it at the primary track's snap point.
    ///
    /// A video clip goes on `V1`; when the file has audio, an audio clip goes
    /// on `A1` at the same start. Both placements are validated before either
    /// track is touched. The first import adopts the probed frame rate as the
    /// timeline frame rate.
    pub fn import(
        &mut self,
        media_id: MediaId,
        video_clip: ClipId,
        audio_clip: ClipId,
        probed: ProbedMedia,
    ) -> Result<ImportedClips> {
        let name = clip_name(&probed.path);
        let source = Arc::new(SourceMedia::new(
            probed.path.clone(),
            probed.frame_count,
            probed.duration_seconds,
        ));
        let timeline_start = self.timeline.snap_point();

        let video = Placement::new(video_clip, name.clone(), 0.0, timeline_start, Arc::clone(&source))?;
        self.timeline.primary_video_track().check_placement(&video)?;
        let audio = if probed.has_audio {
            let audio = Placement::new(audio_clip, name, 0.0, timeline_start, Arc::clone(&source))?;
            self.timeline.audio_track(0)?.check_placement(&audio)?;
            Some(audio)
        } else {
            None
        };

        let audio_clip = audio.as_ref().map(Placement::id);
        self.timeline.add_clip(0, Clip::Video(VideoClip::new(video)))?;
        if let Some(audio) = audio {
            self.timeline.add_clip(0, Clip::Audio(AudioClip::new(audio)))?;
        }
        if self.media.is_empty() {
            self.timeline.set_fps(probed.frame_rate);
        }
        self.media.push(MediaAsset {
            id: media_id,
            source,
            frame_rate: probed.frame_rate,
            has_audio: probed.has_audio,
        });

        info!(
            media_id,
            path = ?probed.path,
            timeline_start,
            length = probed.duration_seconds,
            "media imported"
        );
        Ok(ImportedClips {
            media_id,
            video_clip,
            audio_clip,
            timeline_start,
        })
    }

    /// Places another clip cut from already imported media.
    pub fn place(
        &mut self,
        clip_id: ClipId,
        media_id: MediaId,
        kind: ClipKind,
        track: usize,
        timeline_start: f64,
        source_start: f64,
    ) -> Result<()> {
        let source = Arc::clone(&self.media_by_id(media_id)?.source);
        let placement = Placement::new(
            clip_id,
            clip_name(source.file_path()),
            source_start,
            timeline_start,
            source,
        )?;
        let clip = match kind {
            ClipKind::Video => Clip::Video(VideoClip::new(placement)),
            ClipKind::Audio => Clip::Audio(AudioClip::new(placement)),
        };
        self.timeline.add_clip(track, clip)
    }

    /// Creates an immutable snapshot for the UI.
    pub fn snapshot(&self) -> ProjectSnapshot {
        ProjectSnapshot {
            media: self
                .media
                .iter()
                .map(|asset| MediaSummary {
                    id: asset.id,
                    path: asset.source.file_path().to_path_buf(),
                    frame_count: asset.source.frame_count(),
                    length: asset.source.length(),
                    frame_rate: asset.frame_rate,
                })
                .collect(),
            video_tracks: self
                .timeline
                .video_tracks()
                .iter()
                .map(track_summary)
                .collect(),
            audio_tracks: self
                .timeline
                .audio_tracks()
                .iter()
                .map(track_summary)
                .collect(),
            fps: self.timeline.fps(),
            total_duration: self.timeline.total_duration(),
        }
    }
}

fn track_summary<C>(track: &Track<C>) -> TrackSummary
where
    C: PlacedClip,
{
    TrackSummary {
        name: track.name().to_string(),
        kind: track.kind(),
        clips: track
            .clips()
            .iter()
            .map(|clip| {
                let placement = clip.placement();
                ClipSummary {
                    id: placement.id(),
                    name: placement.name().to_string(),
                    path: placement.source().file_path().to_path_buf(),
                    source_start: placement.source_start(),
                    timeline_start: placement.timeline_start(),
                    timeline_end: placement.timeline_end(),
                }
            })
            .collect(),
    }
}

fn clip_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
