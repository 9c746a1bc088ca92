use crate::archive::ArchiveError;
use crate::inference::InferenceError;
use crate::job_store::JobStoreError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use color_eyre::eyre;
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

#[derive(Debug, Error)]
pub enum JobsError {
    #[error("Job not found: {0}")]
    NotFound(String),

    #[error("File not found")]
    FileNotFound,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("{0}")]
    Archive(#[from] ArchiveError),

    #[error("Job store error: {0}")]
    Store(JobStoreError),

    #[error("Model reload failed: {0}")]
    Inference(#[from] InferenceError),

    #[error("internal error")]
    Internal(#[from] eyre::Report),
}

impl From<JobStoreError> for JobsError {
    fn from(err: JobStoreError) -> Self {
        match err {
            JobStoreError::NotFound(job_id) => Self::NotFound(job_id),
            other => Self::Store(other),
        }
    }
}

impl From<std::io::Error> for JobsError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal(eyre::Report::new(err))
    }
}

impl From<tokio::task::JoinError> for JobsError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Internal(eyre::Report::new(err).wrap_err("Blocking task failed"))
    }
}

fn log_error(error: &JobsError) {
    match error {
        JobsError::NotFound(id) => warn!("Job not found: {id}"),
        JobsError::FileNotFound => warn!("Job file not found"),
        JobsError::BadRequest(message) => warn!("Jobs -> Bad request: {message}"),
        JobsError::Archive(e) => warn!("Rejected archive: {e}"),
        JobsError::Store(e) => error!("Job store failure: {e}"),
        JobsError::Inference(e) => error!("Model reload failure: {e}"),
        JobsError::Internal(e) => error!("Internal error: {e:?}"),
    }
}

impl IntoResponse for JobsError {
    fn into_response(self) -> Response {
        log_error(&self);

        let (status, error_message) = match self {
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "job not found".to_owned()),
            Self::FileNotFound => (StatusCode::NOT_FOUND, "file not found".to_owned()),
            Self::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            Self::Archive(ArchiveError::Io(_)) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to read the uploaded archive.".to_owned(),
            ),
            Self::Archive(e) => (StatusCode::BAD_REQUEST, e.to_string()),
            Self::Store(_) | Self::Inference(_) | Self::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "An unexpected internal error occurred.".to_owned(),
            ),
        };

        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}
