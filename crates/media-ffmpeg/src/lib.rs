//! FFmpeg CLI adapters for media probing and single-frame decoding.

mod command;
mod decode;
mod error;
mod probe;
mod time;

pub use decode::{DecodeRequest, DecodedFrame, decode_frame, parse_ppm};
pub use error::{MediaFfmpegError, Result};
pub use probe::{MediaInfo, StreamInfo, StreamKind, probe_media};
pub use time::Rational;
