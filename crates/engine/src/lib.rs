//! UI-agnostic timeline and frame-preview engine.

pub mod api;
pub mod bridge;
pub mod cache;
pub mod clip;
pub mod error;
pub mod media;
pub mod project;
pub mod sequence;
pub mod source;
pub mod time;
pub mod timeline;
pub mod track;

#[cfg(test)]
mod testing;

pub use api::{
    Applied, Command, Engine, EngineErrorEvent, EngineErrorKind, Event, PreviewJob,
    StepDirection,
};
pub use bridge::{
    EngineCommandSender, EngineEventReceiver, spawn_engine_bridge, spawn_ffmpeg_bridge,
};
pub use cache::{CachedDecoder, PreviewFrameCache};
pub use clip::{
    AudioClip, Clip, ClipId, ClipKind, FrameRequest, PlacedClip, Placement, VideoClip,
};
pub use error::{EngineError, Result};
pub use media::{FfmpegMediaBackend, FrameDecoder, MediaProbe, PreviewFrame, ProbedMedia};
pub use project::{MediaId, Project, ProjectSnapshot};
pub use sequence::{FrameSequencer, FrameTicket};
pub use source::SourceMedia;
pub use time::Fps;
pub use timeline::Timeline;
pub use track::{AudioTrack, Track, VideoTrack};
