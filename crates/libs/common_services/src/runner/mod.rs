pub mod error;
pub mod pipeline;
pub mod scheduler;

pub use error::PipelineError;
pub use pipeline::process_job;
pub use scheduler::{JobHandle, JobRequest, JobScheduler};
