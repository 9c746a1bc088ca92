use crate::api_state::ApiContext;
use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde_json::{Value, json};
use tracing::error;

#[utoipa::path(
    get,
    path = "/",
    tag = "System",
    responses(
        (status = 200, description = "Root message")
    )
)]
pub async fn root() -> &'static str {
    "Shelf analysis API"
}

/// Reports whether jobs can be accepted.
///
/// The jobs directory must exist; the loaded model generation is included for operators.
#[utoipa::path(
    get,
    path = "/health",
    tag = "System",
    responses(
        (status = 200, description = "API is healthy and ready to accept jobs", body = Value),
        (status = 503, description = "The jobs directory is not available.")
    )
)]
pub async fn health_check(State(context): State<ApiContext>) -> Result<Json<Value>, StatusCode> {
    let jobs_dir = &context.settings.jobs.jobs_dir;
    if !jobs_dir.is_dir() {
        error!("Health check failed: jobs directory {} is missing", jobs_dir.display());
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }
    Ok(Json(json!({
        "status": "ok",
        "models_generation": context.inference().generation(),
    })))
}
