use std::time::Duration;

use tokio::process::Command;

use crate::error::{MediaFfmpegError, Result};

/// Runs one prepared FFmpeg tool invocation to completion and returns its stdout.
///
/// The child is killed when the timeout elapses.
pub(crate) async fn run_tool(
    mut command: Command,
    context: &'static str,
    display: String,
    timeout: Option<Duration>,
) -> Result<Vec<u8>> {
    let output = command.kill_on_drop(true).output();

    let output = match timeout {
        Some(after) => tokio::time::timeout(after, output)
            .await
            .map_err(|_| MediaFfmpegError::TimedOut {
                command: display.clone(),
                after,
            })?,
        None => output.await,
    }
    .map_err(|source| MediaFfmpegError::Io { context, source })?;

    if !output.status.success() {
        return Err(MediaFfmpegError::CommandFailed {
            command: display,
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }

    Ok(output.stdout)
}
