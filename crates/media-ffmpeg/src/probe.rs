use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tokio::process::Command;

use crate::command::run_tool;
use crate::error::{MediaFfmpegError, Result};
use crate::time::Rational;

const STREAM_ENTRIES: &str = "stream=index,codec_type,codec_name,width,height,r_frame_rate,avg_frame_rate,nb_frames,duration,sample_rate,channels";

/// Stream kind discovered by probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Video,
    Audio,
    Other,
}

/// Stream metadata read from `ffprobe`.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamInfo {
    pub index: u32,
    pub kind: StreamKind,
    pub codec_name: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub r_frame_rate: Option<Rational>,
    pub avg_frame_rate: Option<Rational>,
    pub nb_frames: Option<u64>,
    pub duration_seconds: Option<f64>,
    pub sample_rate: Option<u32>,
    pub channels: Option<u16>,
}

impl StreamInfo {
    /// Returns the most reliable frame rate reported for this stream.
    ///
    /// `avg_frame_rate` is preferred; `r_frame_rate` is the fallback for
    /// containers that leave the average unset.
    pub fn frame_rate(&self) -> Option<Rational> {
        self.avg_frame_rate.or(self.r_frame_rate)
    }
}

/// Media probe result.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaInfo {
    pub path: PathBuf,
    pub streams: Vec<StreamInfo>,
    pub duration_seconds: Option<f64>,
}

impl MediaInfo {
    /// Returns the first video stream.
    pub fn first_video(&self) -> Option<&StreamInfo> {
        self.streams
            .iter()
            .find(|stream| stream.kind == StreamKind::Video)
    }

    /// Returns the first audio stream.
    pub fn first_audio(&self) -> Option<&StreamInfo> {
        self.streams
            .iter()
            .find(|stream| stream.kind == StreamKind::Audio)
    }
}

/// Probes a media file via `ffprobe`.
///
/// # Example
/// ```no_run
/// # async fn run() {
/// use media_ffmpeg::probe_media;
///
/// let info = probe_media("sample.mp4").await.expect("probe should succeed");
/// assert!(!info.streams.is_empty());
/// # }
/// ```
pub async fn probe_media(path: impl AsRef<Path>) -> Result<MediaInfo> {
    let path = path.as_ref();

    let mut command = Command::new("ffprobe");
    command
        .args([
            "-v",
            "error",
            "-show_entries",
            STREAM_ENTRIES,
            "-of",
            "compact=p=0:nk=0",
        ])
        .arg(path);

    let stdout = run_tool(
        command,
        "run ffprobe stream probe",
        command_for_display("ffprobe stream probe", path),
        None,
    )
    .await?;

    let stdout = String::from_utf8(stdout)?;
    let streams = parse_stream_lines(&stdout)?;
    if streams.is_empty() {
        return Err(MediaFfmpegError::Parse {
            context: "streams",
            value: "no streams found".to_string(),
        });
    }

    let duration_seconds = probe_duration_seconds(path).await?;
    Ok(MediaInfo {
        path: path.to_path_buf(),
        streams,
        duration_seconds,
    })
}

fn parse_stream_lines(stdout: &str) -> Result<Vec<StreamInfo>> {
    stdout
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(parse_stream_line)
        .collect()
}

fn parse_stream_line(line: &str) -> Result<StreamInfo> {
    let mut map = HashMap::<&str, &str>::new();
    for field in line.split('|') {
        let (key, value) = field
            .split_once('=')
            .ok_or_else(|| MediaFfmpegError::Parse {
                context: "stream field",
                value: field.to_string(),
            })?;
        map.insert(key.trim(), unquote(value.trim()));
    }

    let codec_type = map
        .get("codec_type")
        .copied()
        .ok_or_else(|| MediaFfmpegError::Parse {
            context: "codec_type",
            value: line.to_string(),
        })?;
    let kind = match codec_type {
        "video" => StreamKind::Video,
        "audio" => StreamKind::Audio,
        _ => StreamKind::Other,
    };

    let index = parse_optional(map.get("index").copied(), "stream index")?.ok_or_else(|| {
        MediaFfmpegError::Parse {
            context: "stream index",
            value: line.to_string(),
        }
    })?;

    Ok(StreamInfo {
        index,
        kind,
        codec_name: map
            .get("codec_name")
            .filter(|value| !value.is_empty() && **value != "N/A")
            .map(|value| value.to_string()),
        width: parse_optional(map.get("width").copied(), "width")?,
        height: parse_optional(map.get("height").copied(), "height")?,
        r_frame_rate: parse_optional_rational(map.get("r_frame_rate").copied(), "r_frame_rate")?,
        avg_frame_rate: parse_optional_rational(
            map.get("avg_frame_rate").copied(),
            "avg_frame_rate",
        )?,
        nb_frames: parse_optional(map.get("nb_frames").copied(), "nb_frames")?,
        duration_seconds: parse_optional(map.get("duration").copied(), "stream duration")?,
        sample_rate: parse_optional(map.get("sample_rate").copied(), "sample_rate")?,
        channels: parse_optional(map.get("channels").copied(), "channels")?,
    })
}

async fn probe_duration_seconds(path: &Path) -> Result<Option<f64>> {
    let mut command = Command::new("ffprobe");
    command
        .args([
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=nokey=1:noprint_wrappers=1",
        ])
        .arg(path);

    let stdout = run_tool(
        command,
        "run ffprobe duration probe",
        command_for_display("ffprobe duration probe", path),
        None,
    )
    .await?;

    let stdout = String::from_utf8(stdout)?;
    parse_optional(Some(stdout.trim()), "format duration seconds")
}

fn parse_optional_rational(value: Option<&str>, context: &'static str) -> Result<Option<Rational>> {
    let Some(raw) = value else {
        return Ok(None);
    };
    if raw.is_empty() || raw == "N/A" || raw == "0/0" {
        return Ok(None);
    }

    Rational::parse(raw)
        .map(Some)
        .map_err(|_| MediaFfmpegError::Parse {
            context,
            value: raw.to_string(),
        })
}

fn parse_optional<T>(value: Option<&str>, context: &'static str) -> Result<Option<T>>
where
    T: std::str::FromStr,
{
    let Some(raw) = value else {
        return Ok(None);
    };
    if raw.is_empty() || raw == "N/A" {
        return Ok(None);
    }

    raw.parse::<T>()
        .map(Some)
        .map_err(|_| MediaFfmpegError::Parse {
            context,
            value: raw.to_string(),
        })
}

fn unquote(value: &str) -> &str {
    value.trim_matches('"')
}

fn command_for_display(context: &str, path: &Path) -> String {
    format!("{context}: ffprobe {}", path.display())
}
