use crate::routes::{admin, jobs, root};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        root::handlers::root,
        root::handlers::health_check,
        // Job handlers
        jobs::handlers::infer_image_handler,
        jobs::handlers::infer_zip_handler,
        jobs::handlers::list_jobs_handler,
        jobs::handlers::get_job_handler,
        jobs::handlers::get_job_results_handler,
        jobs::handlers::get_job_file_handler,
        jobs::handlers::delete_job_handler,
        // Admin handlers
        admin::handlers::reload_models_handler,
    ),
    tags(
        (name = "Jobs", description = "Submit shelf photos and read job status, results and artifacts"),
        (name = "Admin", description = "Operational endpoints"),
        (name = "System", description = "Health check"),
    )
)]
pub struct ApiDoc;
