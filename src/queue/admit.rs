use std::fs;
use std::path::Path;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::broadcast::Broadcaster;
use crate::error::{AppError, Result};
use crate::media::MediaKind;
use crate::store::JobStore;

/// Result of scanning a folder into the queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AdmissionReport {
    /// New pending jobs created
    pub queued: usize,
    /// Unsupported files plus paths already in the queue
    pub skipped: usize,
}

/// Walk `input_root` recursively and queue every supported media file.
///
/// Output paths mirror the input layout under `output_root`; the final
/// extension is decided later by the worker. Re-admitting a known path is
/// counted as skipped. Ends with a single counts broadcast.
pub fn admit_folder(
    store: &JobStore,
    broadcaster: &Broadcaster,
    input_root: &Path,
    output_root: &Path,
) -> Result<AdmissionReport> {
    if !input_root.exists() {
        return Err(AppError::InvalidInput(format!(
            "input folder does not exist: {}",
            input_root.display()
        )));
    }
    fs::create_dir_all(output_root)?;

    let mut report = AdmissionReport::default();

    for entry in WalkDir::new(input_root).into_iter().filter_map(|e| e.ok()) {
        if !entry.file_type().is_file() {
            continue;
        }
        let input_path = entry.path();

        if MediaKind::from_path(input_path).is_none() {
            debug!("Skipping unsupported file: {}", input_path.display());
            report.skipped += 1;
            continue;
        }

        let relative = input_path.strip_prefix(input_root).unwrap_or(input_path);
        let output_path = output_root.join(relative);

        match store.insert(input_path, &output_path)? {
            Some(id) => {
                debug!(id, "Queued {}", input_path.display());
                report.queued += 1;
            }
            None => {
                debug!("Already queued, skipping: {}", input_path.display());
                report.skipped += 1;
            }
        }
    }

    info!(
        "Queued {} files from {} ({} skipped)",
        report.queued,
        input_root.display(),
        report.skipped
    );
    broadcaster.publish_counts(store.counts()?);

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcast::Event;
    use crate::queue::job::JobState;
    use std::path::PathBuf;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"data").unwrap();
    }

    #[test]
    fn queues_supported_files_and_skips_the_rest() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in");
        let output = dir.path().join("out");
        touch(&input.join("photo.jpg"));
        touch(&input.join("movie.avi"));
        touch(&input.join("notes.txt"));

        let store = JobStore::in_memory().unwrap();
        let broadcaster = Broadcaster::new();
        let events = broadcaster.subscribe();

        let report = admit_folder(&store, &broadcaster, &input, &output).unwrap();
        assert_eq!(report.queued, 2);
        assert_eq!(report.skipped, 1);

        let jobs = store.list().unwrap();
        assert_eq!(jobs.len(), 2);
        assert!(jobs.iter().all(|j| j.state == JobState::Pending));
        assert!(jobs.iter().all(|j| j.filename() != "notes.txt"));

        // One counts broadcast after completion.
        let received: Vec<Event> = events.try_iter().collect();
        assert_eq!(received.len(), 1);
        assert!(matches!(received[0], Event::QueueCounts(c) if c.pending == 2));
    }

    #[test]
    fn output_paths_mirror_the_input_layout() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in");
        let output = dir.path().join("out");
        touch(&input.join("sub/deep/photo.png"));

        let store = JobStore::in_memory().unwrap();
        admit_folder(&store, &Broadcaster::new(), &input, &output).unwrap();

        let jobs = store.list().unwrap();
        assert_eq!(
            jobs[0].output_path,
            output.join(PathBuf::from("sub/deep/photo.png"))
        );
    }

    #[test]
    fn readmission_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in");
        let output = dir.path().join("out");
        touch(&input.join("photo.jpg"));

        let store = JobStore::in_memory().unwrap();
        let broadcaster = Broadcaster::new();

        let first = admit_folder(&store, &broadcaster, &input, &output).unwrap();
        assert_eq!(first.queued, 1);

        let second = admit_folder(&store, &broadcaster, &input, &output).unwrap();
        assert_eq!(second.queued, 0);
        assert_eq!(second.skipped, 1);
        assert_eq!(store.list().unwrap().len(), 1);
    }

    #[test]
    fn missing_input_root_is_invalid_input() {
        let dir = tempfile::tempdir().unwrap();
        let store = JobStore::in_memory().unwrap();

        let err = admit_folder(
            &store,
            &Broadcaster::new(),
            &dir.path().join("nope"),
            &dir.path().join("out"),
        )
        .unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[test]
    fn creates_the_output_root() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in");
        let output = dir.path().join("does/not/exist/yet");
        touch(&input.join("photo.jpg"));

        let store = JobStore::in_memory().unwrap();
        admit_folder(&store, &Broadcaster::new(), &input, &output).unwrap();
        assert!(output.is_dir());
    }
}
