use crate::api_state::ApiContext;
use crate::jobs::upload::{UploadRequest, read_upload_form};
use axum::Json;
use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::response::Response;
use common_services::api::jobs::error::JobsError;
use common_services::api::jobs::interfaces::{ListJobsParams, SubmitJobResponse};
use common_services::api::jobs::service::{
    delete_job, job_results, job_status, list_jobs, stream_job_file, submit_archive, submit_image,
};
use common_types::{JobPage, JobResults, StatusRecord};
use serde_json::Value;
use tracing::instrument;

/// Submit a single shelf photo.
///
/// Multipart form with a `file` part and an optional `planogram` text part holding
/// `{"planogram": [[label, ...], ...]}`. The job runs in the background.
#[utoipa::path(
    post,
    path = "/v1/infer/image",
    tag = "Jobs",
    request_body(content = UploadRequest, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Job queued.", body = SubmitJobResponse),
        (status = 400, description = "The form has no `file` part."),
        (status = 500, description = "The upload could not be stored."),
    )
)]
#[instrument(skip(context, multipart), err(Debug))]
pub async fn infer_image_handler(
    State(context): State<ApiContext>,
    multipart: Multipart,
) -> Result<Json<SubmitJobResponse>, JobsError> {
    let jobs_dir = &context.settings.jobs.jobs_dir;
    let form = read_upload_form(jobs_dir, multipart).await?;
    let response = submit_image(jobs_dir, &context.scheduler, form.upload, form.planogram).await?;
    Ok(Json(response))
}

/// Submit a zip bundle of shelf photos.
///
/// The bundle is unpacked before this returns. Bundles that are not zips, or whose entries
/// would land outside the job, are rejected with 400 and the job is left `FAILED`.
#[utoipa::path(
    post,
    path = "/v1/infer/zip",
    tag = "Jobs",
    request_body(content = UploadRequest, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Job queued.", body = SubmitJobResponse),
        (status = 400, description = "Missing file, not a zip, or unsafe entry paths."),
        (status = 500, description = "The upload could not be stored."),
    )
)]
#[instrument(skip(context, multipart), err(Debug))]
pub async fn infer_zip_handler(
    State(context): State<ApiContext>,
    multipart: Multipart,
) -> Result<Json<SubmitJobResponse>, JobsError> {
    let jobs_dir = &context.settings.jobs.jobs_dir;
    let form = read_upload_form(jobs_dir, multipart).await?;
    let response = submit_archive(jobs_dir, &context.scheduler, form.upload, form.planogram).await?;
    Ok(Json(response))
}

/// List jobs, newest first.
#[utoipa::path(
    get,
    path = "/v1/jobs",
    tag = "Jobs",
    params(ListJobsParams),
    responses(
        (status = 200, description = "One page of job statuses.", body = JobPage),
        (status = 500, description = "The jobs directory could not be read."),
    )
)]
#[instrument(skip(context), err(Debug))]
pub async fn list_jobs_handler(
    State(context): State<ApiContext>,
    Query(params): Query<ListJobsParams>,
) -> Result<Json<JobPage>, JobsError> {
    Ok(Json(list_jobs(&context.settings.jobs.jobs_dir, &params)?))
}

#[utoipa::path(
    get,
    path = "/v1/jobs/{job_id}",
    tag = "Jobs",
    params(("job_id" = String, Path, description = "Job id")),
    responses(
        (status = 200, description = "Current status record.", body = StatusRecord),
        (status = 404, description = "Job not found."),
    )
)]
#[instrument(skip(context), err(Debug))]
pub async fn get_job_handler(
    State(context): State<ApiContext>,
    Path(job_id): Path<String>,
) -> Result<Json<StatusRecord>, JobsError> {
    Ok(Json(job_status(&context.settings.jobs.jobs_dir, &job_id)?))
}

#[utoipa::path(
    get,
    path = "/v1/jobs/{job_id}/results",
    tag = "Jobs",
    params(("job_id" = String, Path, description = "Job id")),
    responses(
        (status = 200, description = "Per-image detections, shelves and compliance.", body = Value),
        (status = 404, description = "Job not found or not finished."),
    )
)]
#[instrument(skip(context), err(Debug))]
pub async fn get_job_results_handler(
    State(context): State<ApiContext>,
    Path(job_id): Path<String>,
) -> Result<Json<JobResults>, JobsError> {
    Ok(Json(job_results(&context.settings.jobs.jobs_dir, &job_id)?))
}

/// Download a job artifact such as a crop or the annotated photo.
///
/// `path` is relative to the job directory, e.g. `crops/001_shelf_obj001_can.jpg`.
#[utoipa::path(
    get,
    path = "/v1/jobs/{job_id}/files/{path}",
    tag = "Jobs",
    params(
        ("job_id" = String, Path, description = "Job id"),
        ("path" = String, Path, description = "Path relative to the job directory"),
    ),
    responses(
        (status = 200, description = "The file contents."),
        (status = 404, description = "No such file in this job."),
    )
)]
#[instrument(skip(context), err(Debug))]
pub async fn get_job_file_handler(
    State(context): State<ApiContext>,
    Path((job_id, path)): Path<(String, String)>,
) -> Result<Response, JobsError> {
    stream_job_file(&context.settings.jobs.jobs_dir, &job_id, &path).await
}

#[utoipa::path(
    delete,
    path = "/v1/jobs/{job_id}",
    tag = "Jobs",
    params(("job_id" = String, Path, description = "Job id")),
    responses(
        (status = 204, description = "Job and all its files removed."),
        (status = 404, description = "Job not found."),
    )
)]
#[instrument(skip(context), err(Debug))]
pub async fn delete_job_handler(
    State(context): State<ApiContext>,
    Path(job_id): Path<String>,
) -> Result<StatusCode, JobsError> {
    delete_job(&context.settings.jobs.jobs_dir, &job_id)?;
    Ok(StatusCode::NO_CONTENT)
}
