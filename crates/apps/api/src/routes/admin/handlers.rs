use crate::api_state::ApiContext;
use axum::Json;
use axum::extract::State;
use common_services::api::jobs::error::JobsError;
use common_services::api::jobs::interfaces::ReloadResponse;
use common_services::api::jobs::service::reload_models;
use tracing::instrument;

/// Reload the inference models.
///
/// Jobs that are already running keep the models they started with.
#[utoipa::path(
    post,
    path = "/v1/admin/models/reload",
    tag = "Admin",
    responses(
        (status = 200, description = "Models swapped.", body = ReloadResponse),
        (status = 500, description = "The new models could not be set up."),
    )
)]
#[instrument(skip(context), err(Debug))]
pub async fn reload_models_handler(State(context): State<ApiContext>) -> Result<Json<ReloadResponse>, JobsError> {
    Ok(Json(reload_models(context.inference(), &context.settings.inference)?))
}
