use app_state::load_app_settings;
use clap::Parser;
use color_eyre::Result;
use color_eyre::eyre::bail;
use common_services::inference::InferenceHandle;
use common_services::job_store::{RESULTS_FILE, read_status};
use common_types::JobStatus;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use worker::run::run_local_job;

/// Runs one shelf analysis job on local photos, without the HTTP server.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// A photo, a directory of photos or a zip bundle.
    input: PathBuf,

    /// JSON file with `{"planogram": [[label, ...], ...]}`.
    #[clap(long)]
    planogram: Option<PathBuf>,

    /// Overrides `jobs.jobs_dir` from the settings.
    #[clap(long)]
    jobs_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Args::parse();
    let settings = load_app_settings()?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| settings.logging.level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let jobs_root = args.jobs_dir.unwrap_or_else(|| settings.jobs.jobs_dir.clone());
    let detector = InferenceHandle::from_settings(&settings.inference)?.current();

    let run = run_local_job(
        detector,
        &settings.analysis,
        &jobs_root,
        &args.input,
        args.planogram.as_deref(),
    )
    .await?;

    if run.status == JobStatus::Succeeded {
        info!(
            "Job {} succeeded, results in {}",
            run.job_id,
            run.job_dir.join(RESULTS_FILE).display()
        );
        return Ok(());
    }

    let record = read_status(&run.job_dir)?;
    error!(
        "Job {} failed at {}: {}",
        run.job_id,
        record.stage.as_deref().unwrap_or("unknown stage"),
        record.error.as_deref().unwrap_or("no error recorded")
    );
    bail!("job {} failed", run.job_id)
}
