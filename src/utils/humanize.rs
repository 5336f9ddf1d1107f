use humansize::{DECIMAL, format_size};

/// Format a byte count for log output
pub fn format_file_size(bytes: u64) -> String {
    format_size(bytes, DECIMAL)
}
