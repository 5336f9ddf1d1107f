use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::media::MediaKind;

/// State of a job in the compression queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    /// Waiting to be picked up by the worker
    Pending,
    /// Currently being compressed
    Processing,
    /// Successfully compressed
    Completed,
    /// Compression failed; the row stays until cleared manually
    Error,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Pending => "pending",
            JobState::Processing => "processing",
            JobState::Completed => "completed",
            JobState::Error => "error",
        }
    }

    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "pending" => Some(JobState::Pending),
            "processing" => Some(JobState::Processing),
            "completed" => Some(JobState::Completed),
            "error" => Some(JobState::Error),
            _ => None,
        }
    }
}

/// Why a job ended in the error state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// Input file vanished between admission and processing
    InputMissing,
    /// Extension not in either media table (defensive; admission filters these)
    UnsupportedType,
    /// Guessed MIME type disagrees with the extension-implied category
    InvalidContent(MediaKind),
    /// Tool exited non-zero; carries a stderr tail for the log
    ToolFailure(String),
    /// Tool exceeded its wall-clock bound and was killed
    Timeout,
    /// Unexpected fault while handling the job
    Internal(String),
}

impl FailureReason {
    /// Human-readable message recorded on the job and broadcast to observers
    pub fn describe(&self, input: &Path) -> String {
        let name = filename(input);
        match self {
            FailureReason::InputMissing => format!("File not found: {}", input.display()),
            FailureReason::UnsupportedType => format!("Unsupported file type: {}", name),
            FailureReason::InvalidContent(kind) => {
                format!("Invalid {} file: {}", kind, name)
            }
            FailureReason::ToolFailure(_) => format!("Compression failed: {}", name),
            FailureReason::Timeout => format!("Timeout: {}", name),
            FailureReason::Internal(detail) => format!("Error: {}", detail),
        }
    }
}

/// A file queued for compression
#[derive(Debug, Clone, Serialize)]
pub struct Job {
    pub id: i64,
    pub input_path: PathBuf,
    /// Proposed at admission; replaced with the actual path on success
    pub output_path: PathBuf,
    pub state: JobState,
    /// Set on error rows only
    pub error_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Job {
    /// Get the input filename
    pub fn filename(&self) -> String {
        filename(&self.input_path)
    }
}

fn filename(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "Unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_roundtrips_through_text() {
        for state in [
            JobState::Pending,
            JobState::Processing,
            JobState::Completed,
            JobState::Error,
        ] {
            assert_eq!(JobState::parse(state.as_str()), Some(state));
        }
        assert_eq!(JobState::parse("done"), None);
    }

    #[test]
    fn failure_messages_name_the_file() {
        let input = Path::new("/media/photos/cat.jpg");
        assert_eq!(
            FailureReason::InputMissing.describe(input),
            "File not found: /media/photos/cat.jpg"
        );
        assert_eq!(
            FailureReason::InvalidContent(MediaKind::Image).describe(input),
            "Invalid image file: cat.jpg"
        );
        assert_eq!(
            FailureReason::Timeout.describe(input),
            "Timeout: cat.jpg"
        );
    }
}
