use crate::admin::handlers::reload_models_handler;
use crate::api_state::ApiContext;
use axum::{Router, routing::post};

pub fn admin_router() -> Router<ApiContext> {
    Router::new().route("/v1/admin/models/reload", post(reload_models_handler))
}
