use std::path::PathBuf;
use std::time::Duration;

use tokio::process::Command;

use crate::command::run_tool;
use crate::error::{MediaFfmpegError, Result};

/// One single-frame decode job.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodeRequest {
    pub path: PathBuf,
    pub at_seconds: f64,
    /// Output width; height follows the source aspect ratio. `None` keeps the
    /// native size.
    pub width: Option<u32>,
    pub timeout: Option<Duration>,
}

/// A decoded video frame in RGBA format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedFrame {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

/// Decodes the first video frame at-or-after `request.at_seconds`.
///
/// The frame is piped out of `ffmpeg` as a binary PPM and converted to RGBA,
/// so no temporary files are involved.
///
/// # Example
/// ```no_run
/// # async fn run() {
/// use media_ffmpeg::{DecodeRequest, decode_frame};
///
/// let frame = decode_frame(&DecodeRequest {
///     path: "sample.mp4".into(),
///     at_seconds: 0.5,
///     width: Some(640),
///     timeout: None,
/// })
/// .await
/// .expect("decode should succeed");
/// assert_eq!(frame.width, 640);
/// # }
/// ```
pub async fn decode_frame(request: &DecodeRequest) -> Result<DecodedFrame> {
    let at_seconds = request.at_seconds;
    if !at_seconds.is_finite() || at_seconds < 0.0 {
        return Err(MediaFfmpegError::InvalidTimestampSeconds(at_seconds));
    }

    let mut command = Command::new("ffmpeg");
    command
        .args(["-hide_banner", "-v", "error", "-ss"])
        .arg(format!("{at_seconds:.6}"))
        .arg("-i")
        .arg(&request.path)
        .args(["-frames:v", "1"]);
    if let Some(width) = request.width {
        command.arg("-vf").arg(format!("scale={width}:-2"));
    }
    command.args(["-c:v", "ppm", "-f", "image2pipe", "-"]);

    let stdout = run_tool(
        command,
        "run ffmpeg decode frame",
        format!(
            "ffmpeg decode frame at {at_seconds:.6}s {}",
            request.path.display()
        ),
        request.timeout,
    )
    .await?;

    parse_ppm(&stdout)
}

/// Parses one binary PPM (`P6`, 8-bit) image into RGBA.
///
/// # Example
/// ```
/// use media_ffmpeg::parse_ppm;
///
/// let mut bytes = b"P6\n1 1\n255\n".to_vec();
/// bytes.extend_from_slice(&[10, 20, 30]);
/// let frame = parse_ppm(&bytes).expect("valid ppm");
/// assert_eq!(frame.rgba, vec![10, 20, 30, 255]);
/// ```
pub fn parse_ppm(bytes: &[u8]) -> Result<DecodedFrame> {
    if bytes.is_empty() {
        return Err(malformed("empty output"));
    }

    let mut cursor = PpmCursor { bytes, position: 0 };
    if cursor.token()? != b"P6" {
        return Err(malformed("missing P6 magic"));
    }
    let width = cursor.number("width")?;
    let height = cursor.number("height")?;
    let max_value = cursor.number("max value")?;
    if width == 0 || height == 0 {
        return Err(malformed("zero-sized image"));
    }
    if max_value == 0 || max_value > 255 {
        return Err(malformed(format!("unsupported max value {max_value}")));
    }

    // Exactly one whitespace byte separates the header from the raster.
    let raster = bytes
        .get(cursor.position + 1..)
        .ok_or_else(|| malformed("missing raster"))?;
    let pixel_count = (width as usize)
        .checked_mul(height as usize)
        .ok_or_else(|| malformed("image too large"))?;
    let expected = pixel_count
        .checked_mul(3)
        .ok_or_else(|| malformed("image too large"))?;
    let capacity = pixel_count
        .checked_mul(4)
        .ok_or_else(|| malformed("image too large"))?;
    if raster.len() < expected {
        return Err(malformed(format!(
            "expected {expected} raster bytes, got {}",
            raster.len()
        )));
    }

    let mut rgba = Vec::with_capacity(capacity);
    for rgb in raster[..expected].chunks_exact(3) {
        rgba.extend_from_slice(rgb);
        rgba.push(u8::MAX);
    }

    Ok(DecodedFrame {
        width,
        height,
        rgba,
    })
}

struct PpmCursor<'a> {
    bytes: &'a [u8],
    position: usize,
}

impl<'a> PpmCursor<'a> {
    fn token(&mut self) -> Result<&'a [u8]> {
        loop {
            match self.bytes.get(self.position) {
                Some(byte) if byte.is_ascii_whitespace() => self.position += 1,
                Some(b'#') => {
                    while let Some(byte) = self.bytes.get(self.position) {
                        self.position += 1;
                        if *byte == b'\n' {
                            break;
                        }
                    }
                }
                Some(_) => break,
                None => return Err(malformed("truncated header")),
            }
        }

        let start = self.position;
        while self
            .bytes
            .get(self.position)
            .is_some_and(|byte| !byte.is_ascii_whitespace())
        {
            self.position += 1;
        }
        Ok(&self.bytes[start..self.position])
    }

    fn number(&mut self, context: &'static str) -> Result<u32> {
        let token = self.token()?;
        std::str::from_utf8(token)
            .ok()
            .and_then(|text| text.parse::<u32>().ok())
            .ok_or_else(|| MediaFfmpegError::Parse {
                context,
                value: String::from_utf8_lossy(token).into_owned(),
            })
    }
}

fn malformed(reason: impl Into<String>) -> MediaFfmpegError {
    MediaFfmpegError::MalformedFrame {
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::{DecodeRequest, decode_frame, parse_ppm};
    use crate::error::MediaFfmpegError;

    fn ppm(width: u32, height: u32, header_extra: &str, raster: &[u8]) -> Vec<u8> {
        let mut bytes = format!("P6\n{header_extra}{width} {height}\n255\n").into_bytes();
        bytes.extend_from_slice(raster);
        bytes
    }

    #[test]
    fn converts_rgb_raster_to_rgba() {
        let frame = parse_ppm(&ppm(2, 1, "", &[1, 2, 3, 4, 5, 6])).expect("valid ppm");
        assert_eq!(frame.width, 2);
        assert_eq!(frame.height, 1);
        assert_eq!(frame.rgba, vec![1, 2, 3, 255, 4, 5, 6, 255]);
    }

    #[test]
    fn header_comments_are_skipped() {
        let frame =
            parse_ppm(&ppm(1, 1, "# written by ffmpeg\n", &[7, 8, 9])).expect("valid ppm");
        assert_eq!(frame.rgba, vec![7, 8, 9, 255]);
    }

    #[test]
    fn raster_starting_with_whitespace_byte_is_preserved() {
        let frame = parse_ppm(&ppm(1, 1, "", &[b'\n', b' ', 0])).expect("valid ppm");
        assert_eq!(frame.rgba, vec![b'\n', b' ', 0, 255]);
    }

    #[test]
    fn empty_and_truncated_outputs_are_rejected() {
        assert!(matches!(
            parse_ppm(&[]),
            Err(MediaFfmpegError::MalformedFrame { .. })
        ));
        assert!(matches!(
            parse_ppm(&ppm(2, 2, "", &[0; 5])),
            Err(MediaFfmpegError::MalformedFrame { .. })
        ));
        assert!(parse_ppm(b"P5\n1 1\n255\n\0").is_err());
        assert!(parse_ppm(b"P6\n1").is_err());
    }

    #[test]
    fn oversized_dimensions_are_rejected_without_overflow() {
        let result = parse_ppm(b"P6\n4294967295 4294967295\n255\n\0\0\0");
        let Err(MediaFfmpegError::MalformedFrame { reason }) = &result else {
            panic!("expected MalformedFrame, got {result:?}");
        };
        assert_eq!(reason, "image too large");
    }

    #[tokio::test]
    async fn negative_timestamp_is_rejected_before_spawning() {
        let result = decode_frame(&DecodeRequest {
            path: PathBuf::from("missing.mp4"),
            at_seconds: -0.5,
            width: None,
            timeout: None,
        })
        .await;
        assert!(matches!(
            result,
            Err(MediaFfmpegError::InvalidTimestampSeconds(_))
        ));
    }
}
