use std::path::{Path, PathBuf};

/// Image extensions eligible for compression (includes camera raw formats)
pub const IMAGE_EXTENSIONS: [&str; 19] = [
    "jpg", "jpeg", "png", "gif", "bmp", "tiff", "tif", "webp", "dng", "raw", "cr2", "nef", "arw",
    "orf", "sr2", "raf", "rw2", "pef", "srw",
];

/// Video extensions eligible for compression
pub const VIDEO_EXTENSIONS: [&str; 11] = [
    "mp4", "mov", "avi", "mkv", "webm", "flv", "wmv", "m4v", "3gp", "mpeg", "mpg",
];

/// Category a file is compressed as
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// Classify a path by its extension (case-insensitive)
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            Some(MediaKind::Image)
        } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            Some(MediaKind::Video)
        } else {
            None
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
        }
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Check that the guessed MIME type of a path agrees with the expected kind.
///
/// The guess is extension-based, so this is a coarse gate: extensions the
/// MIME registry does not know (several camera raw formats) fail the check.
pub fn content_matches(path: &Path, kind: MediaKind) -> bool {
    let Some(mime) = mime_guess::from_path(path).first() else {
        return false;
    };
    match kind {
        MediaKind::Image => mime.type_() == mime_guess::mime::IMAGE,
        MediaKind::Video => mime.type_() == mime_guess::mime::VIDEO,
    }
}

/// Final output path for a job.
///
/// PNG sources keep their lossless extension, every other image becomes
/// WebP, and video is always put into an MKV container.
pub fn final_output_path(proposed: &Path, input: &Path, kind: MediaKind) -> PathBuf {
    match kind {
        MediaKind::Image => {
            let source_ext = input
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e.to_lowercase());
            if source_ext.as_deref() == Some("png") {
                proposed.with_extension("png")
            } else {
                proposed.with_extension("webp")
            }
        }
        MediaKind::Video => proposed.with_extension("mkv"),
    }
}
