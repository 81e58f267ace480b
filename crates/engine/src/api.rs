use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info};

use crate::cache::{CachedDecoder, PreviewFrameCache};
use crate::clip::{ClipId, ClipKind, FrameRequest};
use crate::error::{EngineError, Result};
use crate::media::{FfmpegMediaBackend, FrameDecoder, MediaProbe, PreviewFrame};
use crate::project::{MediaId, Project, ProjectSnapshot};
use crate::time::Fps;

/// Commands accepted by the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Probes a file and appends it at the end of the primary video track.
    ///
    /// # Example
    /// ```no_run
    /// use std::path::PathBuf;
    /// use engine::{Command, Engine};
    ///
    /// # async fn run() -> engine::Result<()> {
    /// let mut engine = Engine::with_ffmpeg();
    /// let events = engine
    ///     .handle_command(Command::Import {
    ///         path: PathBuf::from("demo.mp4"),
    ///     })
    ///     .await?;
    /// assert!(!events.is_empty());
    /// # Ok(())
    /// # }
    /// ```
    Import {
        path: PathBuf,
    },
    /// Places another clip cut from already imported media.
    AddClip {
        media_id: MediaId,
        kind: ClipKind,
        track: usize,
        timeline_start: f64,
        source_start: f64,
    },
    /// Removes a clip by id; an unknown id leaves the track unchanged.
    RemoveClip {
        kind: ClipKind,
        track: usize,
        clip_id: ClipId,
    },
    AddTrack {
        kind: ClipKind,
        name: String,
    },
    SetFps {
        fps: f64,
    },
    SetPlayhead {
        seconds: f64,
    },
    StepFrame {
        direction: StepDirection,
    },
}

/// Direction of a single-frame playhead step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepDirection {
    Forward,
    Backward,
}

/// Events emitted by the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    ProjectChanged(ProjectSnapshot),
    PlayheadChanged {
        seconds: f64,
    },
    /// `frame` is `None` inside gaps and when decoding fails; render blank.
    PreviewFrameReady {
        seconds: f64,
        frame: Option<PreviewFrame>,
    },
    Error(EngineErrorEvent),
}

/// Category of a failed command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineErrorKind {
    PlacementConflict,
    ProbeFailure,
    NotFound,
    Other,
}

impl From<&EngineError> for EngineErrorKind {
    fn from(value: &EngineError) -> Self {
        match value {
            EngineError::PlacementConflict { .. } => Self::PlacementConflict,
            EngineError::TrackNotFound { .. } | EngineError::MissingMedia { .. } => Self::NotFound,
            error if error.is_probe_failure() => Self::ProbeFailure,
            _ => Self::Other,
        }
    }
}

/// User-facing error payload emitted as an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineErrorEvent {
    pub kind: EngineErrorKind,
    pub message: String,
}

impl EngineErrorEvent {
    pub fn from_error(error: &EngineError) -> Self {
        Self {
            kind: EngineErrorKind::from(error),
            message: error.to_string(),
        }
    }
}

/// State changes of one command, with the preview decode still pending.
#[derive(Debug, Clone, PartialEq)]
pub struct Applied {
    pub events: Vec<Event>,
    pub preview: Option<PreviewJob>,
}

/// Preview decode owed for a playhead position.
///
/// Owns its request so it can run after the engine has moved on.
#[derive(Debug, Clone, PartialEq)]
pub struct PreviewJob {
    pub seconds: f64,
    pub request: Option<FrameRequest>,
}

impl PreviewJob {
    /// Decodes the frame and wraps it in [`Event::PreviewFrameReady`].
    pub async fn run<D>(self, decoder: &D) -> Event
    where
        D: FrameDecoder,
    {
        let frame = match &self.request {
            Some(request) => request.resolve(decoder).await,
            None => None,
        };
        Event::PreviewFrameReady {
            seconds: self.seconds,
            frame,
        }
    }
}

/// Editing engine for import/placement/scrub commands.
#[derive(Debug)]
pub struct Engine<M> {
    media: Arc<CachedDecoder<M>>,
    project: Project,
    playhead: f64,
    next_media_id: MediaId,
    next_clip_id: ClipId,
}

impl<M> Engine<M>
where
    M: MediaProbe + FrameDecoder + Sync,
{
    /// Creates a new engine with the provided media backend.
    ///
    /// # Example
    /// ```
    /// use engine::{Engine, FfmpegMediaBackend};
    ///
    /// let engine = Engine::new(FfmpegMediaBackend::default());
    /// assert_eq!(engine.playhead(), 0.0);
    /// ```
    pub fn new(media: M) -> Self {
        Self::with_cache(media, PreviewFrameCache::default())
    }

    pub fn with_cache(media: M, cache: PreviewFrameCache) -> Self {
        Self {
            media: Arc::new(CachedDecoder::new(media, cache)),
            project: Project::new(Fps::default()),
            playhead: 0.0,
            next_media_id: 1,
            next_clip_id: 1,
        }
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    pub fn playhead(&self) -> f64 {
        self.playhead
    }

    /// Shared handle to the caching decoder, for decodes run off the engine.
    pub fn decoder(&self) -> Arc<CachedDecoder<M>> {
        Arc::clone(&self.media)
    }

    /// Applies one command and returns emitted events, preview included.
    pub async fn handle_command(&mut self, command: Command) -> Result<Vec<Event>> {
        let Applied {
            mut events,
            preview,
        } = self.apply(command).await?;
        if let Some(job) = preview {
            events.push(job.run(self.media.as_ref()).await);
        }
        Ok(events)
    }

    /// Applies one command, leaving any preview decode to the caller.
    ///
    /// On error the engine state is unchanged.
    pub async fn apply(&mut self, command: Command) -> Result<Applied> {
        match command {
            Command::Import { path } => self.import(path).await,
            Command::AddClip {
                media_id,
                kind,
                track,
                timeline_start,
                source_start,
            } => self.add_clip(media_id, kind, track, timeline_start, source_start),
            Command::RemoveClip {
                kind,
                track,
                clip_id,
            } => self.remove_clip(kind, track, clip_id),
            Command::AddTrack { kind, name } => Ok(self.add_track(kind, name)),
            Command::SetFps { fps } => self.set_fps(fps),
            Command::SetPlayhead { seconds } => Ok(self.set_playhead(seconds)),
            Command::StepFrame { direction } => Ok(self.step_frame(direction)),
        }
    }

    async fn import(&mut self, path: PathBuf) -> Result<Applied> {
        let probed = self.media.probe(&path).await?;
        let media_id = self.next_media_id;
        let video_clip = self.next_clip_id;
        let audio_clip = self.next_clip_id + 1;

        let imported = self
            .project
            .import(media_id, video_clip, audio_clip, probed)?;
        self.next_media_id += 1;
        self.next_clip_id += if imported.audio_clip.is_some() { 2 } else { 1 };
        self.project.timeline().log_layout();

        let mut applied = self.set_playhead(imported.timeline_start);
        applied.events.insert(0, self.project_changed());
        Ok(applied)
    }

    fn add_clip(
        &mut self,
        media_id: MediaId,
        kind: ClipKind,
        track: usize,
        timeline_start: f64,
        source_start: f64,
    ) -> Result<Applied> {
        let clip_id = self.next_clip_id;
        self.project
            .place(clip_id, media_id, kind, track, timeline_start, source_start)?;
        self.next_clip_id += 1;

        info!(clip_id, media_id, %kind, track, timeline_start, "clip added");
        Ok(self.edited())
    }

    fn remove_clip(&mut self, kind: ClipKind, track: usize, clip_id: ClipId) -> Result<Applied> {
        let removed = self.project.timeline_mut().remove_clip(kind, track, clip_id)?;
        if removed.is_some() {
            info!(clip_id, %kind, track, "clip removed");
        } else {
            debug!(clip_id, %kind, track, "remove ignored for unknown clip");
        }
        Ok(self.edited())
    }

    fn add_track(&mut self, kind: ClipKind, name: String) -> Applied {
        let timeline = self.project.timeline_mut();
        let index = match kind {
            ClipKind::Video => timeline.add_video_track(name),
            ClipKind::Audio => timeline.add_audio_track(name),
        };
        info!(%kind, index, "track added");
        self.edited()
    }

    fn set_fps(&mut self, fps: f64) -> Result<Applied> {
        let fps = Fps::new(fps)?;
        self.project.timeline_mut().set_fps(fps);
        info!(fps = fps.get(), "timeline frame rate changed");
        Ok(self.edited())
    }

    fn set_playhead(&mut self, seconds: f64) -> Applied {
        let timeline = self.project.timeline();
        let clamped = timeline.clamp_playhead(seconds);
        self.playhead = clamped;

        Applied {
            events: vec![Event::PlayheadChanged { seconds: clamped }],
            preview: Some(PreviewJob {
                seconds: clamped,
                request: timeline.frame_request_at(clamped),
            }),
        }
    }

    fn step_frame(&mut self, direction: StepDirection) -> Applied {
        let step = self.project.timeline().fps().frame_duration();
        let target = match direction {
            StepDirection::Forward => self.playhead + step,
            StepDirection::Backward => self.playhead - step,
        };
        self.set_playhead(target)
    }

    /// Re-clamps the playhead after an edit and reports the new project state.
    fn edited(&mut self) -> Applied {
        self.playhead = self.project.timeline().clamp_playhead(self.playhead);
        Applied {
            events: vec![self.project_changed()],
            preview: None,
        }
    }

    fn project_changed(&self) -> Event {
        Event::ProjectChanged(self.project.snapshot())
    }
}

impl Engine<FfmpegMediaBackend> {
    /// Creates an engine wired to the FFmpeg backend.
    pub fn with_ffmpeg() -> Self {
        Self::new(FfmpegMediaBackend::default())
    }
}
