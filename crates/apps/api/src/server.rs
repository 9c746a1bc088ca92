use crate::api_state::ApiContext;
use crate::create_router;
use app_state::AppSettings;
use color_eyre::Result;
use color_eyre::eyre::eyre;
use common_services::inference::InferenceHandle;
use http::{HeaderValue, header};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

pub async fn serve(settings: AppSettings) -> Result<()> {
    // --- Server Startup ---
    info!("Initializing server, jobs under {}", settings.jobs.jobs_dir.display());
    let inference = Arc::new(InferenceHandle::from_settings(&settings.inference)?);
    info!("Using model server at {}", settings.inference.base_url);
    let api_state = ApiContext::new(settings.clone(), inference);

    // --- CORS Configuration ---
    let allowed_origins: Vec<HeaderValue> = settings
        .api
        .allowed_origins
        .iter()
        .filter_map(|s| match s.parse() {
            Ok(hv) => Some(hv),
            Err(e) => {
                error!("Invalid CORS origin configured: {} - Error: {}", s, e);
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_methods(cors::Any)
        .allow_origin(allowed_origins)
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT, header::ORIGIN]);

    // --- Create Router ---
    let app = create_router(api_state)
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    let addr: SocketAddr = format!("{}:{}", settings.api.host, settings.api.port)
        .parse()
        .map_err(|e| eyre!("Invalid address: {}", e))?;
    let listener = TcpListener::bind(addr).await?;

    info!("Server listening on http://{}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}
