pub mod deps;
pub mod humanize;
pub mod logger;

pub use deps::check_tools;
pub use humanize::format_file_size;
pub use logger::init_logging;
