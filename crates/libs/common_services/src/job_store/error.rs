use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum JobStoreError {
    #[error("Job not found: {0}")]
    NotFound(String),

    #[error("Job store I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Job document is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to move job document into place: {0}")]
    Persist(#[from] tempfile::PersistError),
}
