use crate::inference::InferenceHandle;
use crate::job_store::write_status;
use crate::runner::pipeline::process_job;
use app_state::AnalysisSettings;
use common_types::{JobStatus, Stage};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// A job whose input is in place and whose status is `QUEUED`.
#[derive(Debug, Clone)]
pub struct JobRequest {
    pub job_id: String,
    pub job_dir: PathBuf,
    pub input_dir: PathBuf,
    /// Raw planogram JSON text, if the caller sent one.
    pub planogram: Option<String>,
}

/// A scheduled job. Dropping it detaches the job, which keeps running.
pub struct JobHandle {
    pub job_id: String,
    handle: JoinHandle<JobStatus>,
}

impl JobHandle {
    /// Waits for the job to reach its terminal status.
    pub async fn wait(self) -> JobStatus {
        self.handle.await.unwrap_or(JobStatus::Failed)
    }
}

/// Hands jobs off to the tokio runtime, one task per job.
#[derive(Clone)]
pub struct JobScheduler {
    inference: Arc<InferenceHandle>,
    analysis: Arc<AnalysisSettings>,
}

impl JobScheduler {
    pub fn new(inference: Arc<InferenceHandle>, analysis: AnalysisSettings) -> Self {
        Self {
            inference,
            analysis: Arc::new(analysis),
        }
    }

    pub const fn inference(&self) -> &Arc<InferenceHandle> {
        &self.inference
    }

    /// Starts `request` in the background and returns immediately.
    ///
    /// The job uses the detector that is current at this moment for its whole run. A panic
    /// inside the run is recorded as `FAILED` rather than leaving the job `RUNNING`.
    pub fn schedule(&self, request: JobRequest) -> JobHandle {
        let detector = self.inference.current();
        let analysis = Arc::clone(&self.analysis);
        let job_id = request.job_id.clone();
        let job_dir = request.job_dir.clone();

        let handle = tokio::spawn(async move {
            let run = tokio::spawn(async move {
                process_job(
                    detector,
                    &analysis,
                    &request.job_dir,
                    &request.input_dir,
                    request.planogram.as_deref(),
                )
                .await
            });
            match run.await {
                Ok(status) => status,
                Err(e) => {
                    error!("Job task for {} died: {e}", job_dir.display());
                    let message = format!("job task failed: {e}");
                    if let Err(write_err) = write_status(&job_dir, JobStatus::Failed, Stage::Processing, Some(message)) {
                        error!("Could not record failure of {}: {write_err}", job_dir.display());
                    }
                    JobStatus::Failed
                }
            }
        });

        info!("Scheduled job {job_id}");
        JobHandle { job_id, handle }
    }
}
