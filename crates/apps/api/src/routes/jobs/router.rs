use crate::api_state::ApiContext;
use crate::jobs::handlers::{
    delete_job_handler, get_job_file_handler, get_job_handler, get_job_results_handler,
    infer_image_handler, infer_zip_handler, list_jobs_handler,
};
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;

pub fn jobs_router(max_upload_bytes: usize) -> Router<ApiContext> {
    let uploads = Router::new()
        .route("/v1/infer/image", post(infer_image_handler))
        .route("/v1/infer/zip", post(infer_zip_handler))
        .layer(DefaultBodyLimit::max(max_upload_bytes));

    Router::new()
        .merge(uploads)
        .route("/v1/jobs", get(list_jobs_handler))
        .route("/v1/jobs/{job_id}", get(get_job_handler).delete(delete_job_handler))
        .route("/v1/jobs/{job_id}/results", get(get_job_results_handler))
        .route("/v1/jobs/{job_id}/files/{*path}", get(get_job_file_handler))
}
