//! External tool invocation with a wall-clock bound.
//!
//! The child is spawned and polled with `try_wait`; once the deadline
//! passes it is killed and reaped. On failure or timeout any partial
//! output file is removed so the output tree never holds truncated media.

use std::path::Path;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tracing::info;

use crate::config::{ImageToolConfig, VideoToolConfig};

const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Outcome of one tool invocation
#[derive(Debug)]
pub enum ToolOutcome {
    /// Tool exited zero
    Success,
    /// Tool exited non-zero or could not run; carries a diagnostic message
    Failed(String),
    /// Tool exceeded its deadline and was killed
    TimedOut,
}

/// Compress an image with the configured tool
pub fn compress_image(config: &ImageToolConfig, input: &Path, output: &Path) -> ToolOutcome {
    let args = build_image_args(config, input, output);
    info!("Compressing image {} to {}", input.display(), output.display());
    run_tool(&config.tool, &args, output, Duration::from_secs(config.timeout_secs))
}

/// Compress a video with the configured tool
pub fn compress_video(config: &VideoToolConfig, input: &Path, output: &Path) -> ToolOutcome {
    let args = build_video_args(config, input, output);
    info!("Compressing video {} to {}", input.display(), output.display());
    run_tool(&config.tool, &args, output, Duration::from_secs(config.timeout_secs))
}

fn build_image_args(config: &ImageToolConfig, input: &Path, output: &Path) -> Vec<String> {
    vec![
        input.display().to_string(),
        "-quality".to_string(),
        config.quality.to_string(),
        output.display().to_string(),
    ]
}

fn build_video_args(config: &VideoToolConfig, input: &Path, output: &Path) -> Vec<String> {
    vec![
        "-y".to_string(),
        "-i".to_string(),
        input.display().to_string(),
        "-c:v".to_string(),
        config.codec.clone(),
        "-preset".to_string(),
        config.preset.clone(),
        "-crf".to_string(),
        config.crf.to_string(),
        "-c:a".to_string(),
        config.audio_codec.clone(),
        "-b:a".to_string(),
        config.audio_bitrate.clone(),
        output.display().to_string(),
    ]
}

/// Run a tool to completion or deadline, cleaning up partial output
fn run_tool(program: &str, args: &[String], output: &Path, timeout: Duration) -> ToolOutcome {
    let mut child = match Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
    {
        Ok(c) => c,
        Err(e) => return ToolOutcome::Failed(format!("Failed to start {}: {}", program, e)),
    };

    // Drain stderr while the tool runs: a chatty tool (ffmpeg stats lines)
    // fills the pipe buffer and blocks on write if nobody reads it.
    let stderr_thread = child.stderr.take().map(|mut pipe| {
        thread::spawn(move || {
            use std::io::Read;
            let mut buf = String::new();
            let _ = pipe.read_to_string(&mut buf);
            buf
        })
    });

    let deadline = Instant::now() + timeout;

    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break Some(status),
            Ok(None) => {
                if Instant::now() >= deadline {
                    let _ = child.kill();
                    let _ = child.wait();
                    break None;
                }
                thread::sleep(POLL_INTERVAL);
            }
            Err(e) => {
                let _ = child.kill();
                let _ = child.wait();
                let _ = std::fs::remove_file(output);
                return ToolOutcome::Failed(format!("Failed to check {} status: {}", program, e));
            }
        }
    };

    // The pipe is closed once the child is gone, so the reader has hit EOF.
    let stderr = stderr_thread
        .and_then(|handle| handle.join().ok())
        .unwrap_or_default();

    match status {
        Some(status) if status.success() => ToolOutcome::Success,
        Some(status) => {
            let _ = std::fs::remove_file(output);
            let message = if stderr.is_empty() {
                format!("{} failed with status: {}", program, status)
            } else {
                let last_lines: Vec<&str> = stderr.lines().rev().take(5).collect();
                format!(
                    "{} failed: {}",
                    program,
                    last_lines.into_iter().rev().collect::<Vec<_>>().join("\n")
                )
            };
            ToolOutcome::Failed(message)
        }
        None => {
            let _ = std::fs::remove_file(output);
            ToolOutcome::TimedOut
        }
    }
}
