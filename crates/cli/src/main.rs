//! Imports media onto a fresh timeline, prints the project as JSON and
//! optionally resolves the frame shown at one timeline instant.
//!
//! ```bash
//! timeline-preview [--at SECONDS] [--width PIXELS] [--out FRAME.ppm] <media>...
//! ```

use std::env;
use std::error::Error;
use std::fs;
use std::path::PathBuf;
use std::process;

use engine::{Command, Engine, Event, FfmpegMediaBackend, PreviewFrame};

#[derive(Debug, Default)]
struct Args {
    media: Vec<PathBuf>,
    at: Option<f64>,
    width: Option<u32>,
    out: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    init_tracing();

    let args = match parse_args(env::args().skip(1)) {
        Ok(args) => args,
        Err(message) => {
            eprintln!("error: {message}");
            eprintln!(
                "usage: timeline-preview [--at SECONDS] [--width PIXELS] [--out FRAME.ppm] <media>..."
            );
            process::exit(2);
        }
    };

    if let Err(error) = run(args).await {
        eprintln!("error: {error}");
        process::exit(1);
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .try_init();
}

async fn run(args: Args) -> Result<(), Box<dyn Error>> {
    let backend = FfmpegMediaBackend::default().with_decode_width(args.width);
    let mut engine = Engine::new(backend);

    for path in args.media {
        engine.handle_command(Command::Import { path }).await?;
    }
    println!(
        "{}",
        serde_json::to_string_pretty(&engine.project().snapshot())?
    );

    let Some(at) = args.at else {
        return Ok(());
    };
    let events = engine
        .handle_command(Command::SetPlayhead { seconds: at })
        .await?;
    for event in events {
        let Event::PreviewFrameReady { seconds, frame } = event else {
            continue;
        };
        match frame {
            Some(frame) => {
                eprintln!("frame at {seconds:.3}s: {}x{}", frame.width, frame.height);
                if let Some(out) = &args.out {
                    fs::write(out, encode_ppm(&frame))?;
                    eprintln!("wrote {}", out.display());
                }
            }
            None => eprintln!("frame at {seconds:.3}s: blank"),
        }
    }
    Ok(())
}

fn parse_args(mut raw: impl Iterator<Item = String>) -> Result<Args, String> {
    let mut args = Args::default();
    while let Some(arg) = raw.next() {
        match arg.as_str() {
            "--at" => {
                let value = raw.next().ok_or("--at needs a value")?;
                let seconds = value
                    .parse::<f64>()
                    .map_err(|_| format!("invalid --at value: {value}"))?;
                args.at = Some(seconds);
            }
            "--width" => {
                let value = raw.next().ok_or("--width needs a value")?;
                let width = value
                    .parse::<u32>()
                    .map_err(|_| format!("invalid --width value: {value}"))?;
                args.width = Some(width);
            }
            "--out" => {
                let value = raw.next().ok_or("--out needs a value")?;
                args.out = Some(PathBuf::from(value));
            }
            flag if flag.starts_with("--") => return Err(format!("unknown option: {flag}")),
            path => args.media.push(PathBuf::from(path)),
        }
    }
    if args.media.is_empty() {
        return Err("no media given".to_string());
    }
    if args.out.is_some() && args.at.is_none() {
        return Err("--out requires --at".to_string());
    }
    Ok(args)
}

/// Encodes an RGBA frame as binary PPM, dropping alpha.
fn encode_ppm(frame: &PreviewFrame) -> Vec<u8> {
    let header = format!("P6\n{} {}\n255\n", frame.width, frame.height);
    let mut bytes = Vec::with_capacity(header.len() + frame.bytes.len() / 4 * 3);
    bytes.extend_from_slice(header.as_bytes());
    for pixel in frame.bytes.chunks_exact(4) {
        bytes.extend_from_slice(&pixel[..3]);
    }
    bytes
}
