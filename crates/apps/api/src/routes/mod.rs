pub mod admin;
mod api_doc;
pub mod jobs;
pub mod root;

use crate::admin::router::admin_router;
use crate::api_state::ApiContext;
use crate::jobs::router::jobs_router;
use crate::root::router::root_public_router;
use crate::routes::api_doc::ApiDoc;
use axum::Router;
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

// --- Router Construction ---
pub fn create_router(api_state: ApiContext) -> Router {
    let max_upload_bytes = api_state.settings.api.max_upload_mb.saturating_mul(1024 * 1024);
    Router::new()
        .merge(Scalar::with_url("/docs", ApiDoc::openapi()))
        .merge(root_public_router())
        .merge(jobs_router(max_upload_bytes))
        .merge(admin_router())
        .with_state(api_state)
}
