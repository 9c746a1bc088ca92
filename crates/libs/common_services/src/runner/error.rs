use crate::inference::InferenceError;
use crate::job_store::JobStoreError;
use common_types::Stage;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("no images found")]
    NoImagesFound,

    #[error("detection failed for {image}: {source}")]
    DetectionFailure {
        image: String,
        #[source]
        source: InferenceError,
    },

    #[error("failed to write results: {0}")]
    SerializationFailure(#[source] JobStoreError),

    #[error("job store error: {0}")]
    Store(#[from] JobStoreError),

    #[error("pipeline task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl PipelineError {
    /// Stage recorded in the status file when a job fails with this error.
    #[must_use]
    pub const fn stage(&self) -> Stage {
        match self {
            Self::NoImagesFound => Stage::Segmentation,
            _ => Stage::Processing,
        }
    }
}
