use common_types::JobStatus;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SubmitJobResponse {
    pub job_id: String,
    pub status: JobStatus,
}

#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct ListJobsParams {
    /// Number of jobs to skip, newest first. Defaults to 0.
    pub offset: Option<usize>,
    /// Page size. Defaults to 50, capped at 500.
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ReloadResponse {
    /// Increases by one with every successful reload.
    pub generation: u64,
}

/// An uploaded file, spooled to disk by the transport.
#[derive(Debug)]
pub struct Upload {
    /// File name the client sent, if any.
    pub file_name: Option<String>,
    pub file: NamedTempFile,
}
