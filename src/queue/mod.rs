pub mod admit;
pub mod job;
pub mod worker;

pub use admit::{AdmissionReport, admit_folder};
pub use job::{FailureReason, Job, JobState};
pub use worker::{run_cycle, run_worker};
