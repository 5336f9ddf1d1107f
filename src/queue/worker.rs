//! The background worker: claims pending jobs one at a time and drives
//! each through `Pending -> Processing -> Completed | Error`.
//!
//! Per-job failures are recorded on the job and broadcast; they never
//! terminate the loop. Store-level failures abort the cycle, which is
//! retried after a backoff.

use std::fs;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::broadcast::{Broadcaster, ProgressStatus, ProgressUpdate};
use crate::compressor::{self, ToolOutcome};
use crate::config::AppConfig;
use crate::error::Result;
use crate::media::{self, MediaKind};
use crate::queue::job::{FailureReason, Job};
use crate::store::JobStore;
use crate::utils::format_file_size;

/// Run the worker forever on the calling thread.
///
/// Jobs admitted mid-cycle are picked up in the next cycle.
pub fn run_worker(store: &JobStore, config: &AppConfig, broadcaster: &Broadcaster) -> ! {
    loop {
        match run_cycle(store, config, broadcaster) {
            Ok(()) => thread::sleep(Duration::from_secs(config.worker.poll_interval_secs)),
            Err(e) => {
                error!("Worker cycle failed: {}", e);
                thread::sleep(Duration::from_secs(config.worker.error_backoff_secs));
            }
        }
    }
}

/// One pass over the queue: fetch the whole pending batch, then process it
/// strictly in insertion order.
pub fn run_cycle(store: &JobStore, config: &AppConfig, broadcaster: &Broadcaster) -> Result<()> {
    let batch = store.pending()?;
    if batch.is_empty() {
        return Ok(());
    }

    broadcaster.publish_counts(store.counts()?);

    for job in batch {
        if let Err(e) = process_job(store, config, broadcaster, &job) {
            // The store itself failed mid-job; keep going with the rest of
            // the batch, the row is still in a legal state.
            error!("Failed to process {}: {}", job.input_path.display(), e);
        }
    }

    Ok(())
}

fn process_job(
    store: &JobStore,
    config: &AppConfig,
    broadcaster: &Broadcaster,
    job: &Job,
) -> Result<()> {
    broadcaster.publish_progress(ProgressUpdate {
        job_id: job.id,
        status: ProgressStatus::Processing,
        message: format!("Processing {}", job.filename()),
    });

    if !store.claim(job.id)? {
        warn!("Job {} is no longer pending, skipping", job.id);
        return Ok(());
    }
    broadcaster.publish_counts(store.counts()?);

    match execute(config, job) {
        Ok(actual_output) => {
            store.complete(job.id, &actual_output)?;
            log_completion(job, &actual_output);
            broadcaster.publish_progress(ProgressUpdate {
                job_id: job.id,
                status: ProgressStatus::Completed,
                message: format!("Completed: {}", job.filename()),
            });
        }
        Err(reason) => {
            let message = reason.describe(&job.input_path);
            match &reason {
                FailureReason::ToolFailure(detail) => {
                    warn!("Failed to compress {}: {}", job.input_path.display(), detail)
                }
                _ => warn!("{}", message),
            }
            store.fail(job.id, &message)?;
            broadcaster.publish_progress(ProgressUpdate {
                job_id: job.id,
                status: ProgressStatus::Error,
                message,
            });
        }
    }

    broadcaster.publish_counts(store.counts()?);
    Ok(())
}

/// Run one job through verification and compression. Returns the actual
/// output path on success.
fn execute(config: &AppConfig, job: &Job) -> std::result::Result<PathBuf, FailureReason> {
    let input = &job.input_path;

    if !input.exists() {
        return Err(FailureReason::InputMissing);
    }

    // Admission filters unsupported extensions, but rows can predate a
    // table change, so classify again.
    let kind = MediaKind::from_path(input).ok_or(FailureReason::UnsupportedType)?;

    if !media::content_matches(input, kind) {
        return Err(FailureReason::InvalidContent(kind));
    }

    let output = media::final_output_path(&job.output_path, input, kind);
    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent).map_err(|e| FailureReason::Internal(e.to_string()))?;
    }

    let outcome = match kind {
        MediaKind::Image => compressor::compress_image(&config.image, input, &output),
        MediaKind::Video => compressor::compress_video(&config.video, input, &output),
    };

    match outcome {
        ToolOutcome::Success => Ok(output),
        ToolOutcome::Failed(detail) => Err(FailureReason::ToolFailure(detail)),
        ToolOutcome::TimedOut => Err(FailureReason::Timeout),
    }
}

fn log_completion(job: &Job, output: &PathBuf) {
    match (fs::metadata(&job.input_path), fs::metadata(output)) {
        (Ok(source), Ok(compressed)) => info!(
            "Successfully compressed {} to {} ({} -> {})",
            job.input_path.display(),
            output.display(),
            format_file_size(source.len()),
            format_file_size(compressed.len()),
        ),
        _ => info!(
            "Successfully compressed {} to {}",
            job.input_path.display(),
            output.display()
        ),
    }
}
