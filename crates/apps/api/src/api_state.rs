use app_state::AppSettings;
use axum::extract::FromRef;
use common_services::inference::InferenceHandle;
use common_services::runner::JobScheduler;
use std::sync::Arc;

#[derive(Clone)]
pub struct ApiContext {
    pub settings: AppSettings,
    pub scheduler: JobScheduler,
}

impl ApiContext {
    /// Builds the context around an already constructed inference handle.
    pub fn new(settings: AppSettings, inference: Arc<InferenceHandle>) -> Self {
        let scheduler = JobScheduler::new(inference, settings.analysis.clone());
        Self { settings, scheduler }
    }

    pub fn inference(&self) -> &Arc<InferenceHandle> {
        self.scheduler.inference()
    }
}

impl FromRef<ApiContext> for AppSettings {
    fn from_ref(state: &ApiContext) -> Self {
        state.settings.clone()
    }
}

impl FromRef<ApiContext> for JobScheduler {
    fn from_ref(state: &ApiContext) -> Self {
        state.scheduler.clone()
    }
}
