use crate::input::stage_input;
use app_state::AnalysisSettings;
use color_eyre::Result;
use color_eyre::eyre::Context;
use common_services::inference::ShelfDetector;
use common_services::job_store::{INPUT_DIR, create_job, write_status};
use common_services::runner::process_job;
use common_types::{JobStatus, Stage};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task;
use tracing::{error, info};

/// A finished local run.
#[derive(Debug)]
pub struct LocalRun {
    pub job_id: String,
    pub job_dir: PathBuf,
    pub status: JobStatus,
}

/// Creates a job under `jobs_root`, stages `source` into it and runs it to completion.
///
/// Input that cannot be staged leaves the job `FAILED` at `extract_zip`.
pub async fn run_local_job(
    detector: Arc<dyn ShelfDetector>,
    analysis: &AnalysisSettings,
    jobs_root: &Path,
    source: &Path,
    planogram_file: Option<&Path>,
) -> Result<LocalRun> {
    let planogram = planogram_file
        .map(|path| fs::read_to_string(path).wrap_err_with(|| format!("Failed to read {}", path.display())))
        .transpose()?;

    fs::create_dir_all(jobs_root)?;
    let (job_id, job_dir) = create_job(jobs_root)?;
    let input_dir = job_dir.join(INPUT_DIR);
    write_status(&job_dir, JobStatus::Queued, Stage::Upload, None)?;
    info!("Created job {job_id} in {}", job_dir.display());

    let staged = {
        let source = source.to_path_buf();
        let input_dir = input_dir.clone();
        let analysis = analysis.clone();
        task::spawn_blocking(move || stage_input(&source, &input_dir, &analysis)).await?
    };
    if let Err(e) = staged {
        error!("Could not stage {}: {e}", source.display());
        write_status(&job_dir, JobStatus::Failed, Stage::ExtractZip, Some(e.to_string()))?;
        return Ok(LocalRun {
            job_id,
            job_dir,
            status: JobStatus::Failed,
        });
    }

    let status = process_job(detector, analysis, &job_dir, &input_dir, planogram.as_deref()).await;
    Ok(LocalRun {
        job_id,
        job_dir,
        status,
    })
}
