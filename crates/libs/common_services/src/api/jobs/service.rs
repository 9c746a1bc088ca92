//! Request-facing job operations. The HTTP layer only parses input and calls into here.

use crate::api::jobs::error::JobsError;
use crate::api::jobs::interfaces::{ListJobsParams, ReloadResponse, SubmitJobResponse, Upload};
use crate::archive::extract_archive;
use crate::inference::InferenceHandle;
use crate::job_store::{
    INPUT_DIR, create_job, delete_job as remove_job, existing_job_dir, list_jobs as list_job_page,
    read_results, read_status, write_status,
};
use crate::runner::{JobRequest, JobScheduler};
use app_state::InferenceSettings;
use axum::body::Body;
use axum::http::{Response, header};
use color_eyre::eyre::{self, Report};
use common_types::{JobPage, JobResults, JobStatus, Stage, StatusRecord};
use std::path::{Path, PathBuf};
use tokio::fs::{self, File};
use tokio::task;
use tokio_util::codec::{BytesCodec, FramedRead};
use tracing::{debug, info, warn};

pub const DEFAULT_PAGE_SIZE: usize = 50;
pub const MAX_PAGE_SIZE: usize = 500;
const DEFAULT_IMAGE_NAME: &str = "image";

/// Base name of a client-supplied file name, never a path.
fn upload_file_name(name: Option<&str>) -> String {
    name.map(|n| n.replace('\\', "/"))
        .and_then(|n| Path::new(&n).file_name().map(|f| f.to_string_lossy().into_owned()))
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_IMAGE_NAME.to_owned())
}

fn schedule(scheduler: &JobScheduler, job_id: String, job_dir: PathBuf, planogram: Option<String>) {
    let input_dir = job_dir.join(INPUT_DIR);
    // Detached: the job reports through its status file.
    drop(scheduler.schedule(JobRequest {
        job_id,
        job_dir,
        input_dir,
        planogram,
    }));
}

/// Stores a single photo as a new job and queues it.
pub async fn submit_image(
    jobs_root: &Path,
    scheduler: &JobScheduler,
    upload: Upload,
    planogram: Option<String>,
) -> Result<SubmitJobResponse, JobsError> {
    let (job_id, job_dir) = create_job(jobs_root)?;
    let input_dir = job_dir.join(INPUT_DIR);
    fs::create_dir_all(&input_dir).await?;

    let destination = input_dir.join(upload_file_name(upload.file_name.as_deref()));
    upload
        .file
        .persist(&destination)
        .map_err(|e| Report::new(e.error).wrap_err("Failed to store uploaded image"))?;
    debug!("Stored upload at {}", destination.display());

    write_status(&job_dir, JobStatus::Queued, Stage::Upload, None)?;
    schedule(scheduler, job_id.clone(), job_dir, planogram);

    Ok(SubmitJobResponse {
        job_id,
        status: JobStatus::Queued,
    })
}

/// Unpacks a zip bundle into a new job and queues it.
///
/// A bundle that is not a zip or that tries to write outside the job is rejected here: the
/// job is marked `FAILED` at `extract_zip` and never scheduled.
pub async fn submit_archive(
    jobs_root: &Path,
    scheduler: &JobScheduler,
    upload: Upload,
    planogram: Option<String>,
) -> Result<SubmitJobResponse, JobsError> {
    let (job_id, job_dir) = create_job(jobs_root)?;
    let input_dir = job_dir.join(INPUT_DIR);
    fs::create_dir_all(&input_dir).await?;
    write_status(&job_dir, JobStatus::Queued, Stage::Upload, None)?;

    let extracted = {
        let archive = upload.file;
        let input_dir = input_dir.clone();
        task::spawn_blocking(move || extract_archive(archive.path(), &input_dir)).await?
    };
    match extracted {
        Ok(count) => info!("Job {job_id}: extracted {count} files"),
        Err(e) => {
            write_status(&job_dir, JobStatus::Failed, Stage::ExtractZip, Some(e.to_string()))?;
            return Err(e.into());
        }
    }

    write_status(&job_dir, JobStatus::Queued, Stage::ExtractZip, None)?;
    schedule(scheduler, job_id.clone(), job_dir, planogram);

    Ok(SubmitJobResponse {
        job_id,
        status: JobStatus::Queued,
    })
}

pub fn job_status(jobs_root: &Path, job_id: &str) -> Result<StatusRecord, JobsError> {
    let dir = existing_job_dir(jobs_root, job_id)?;
    Ok(read_status(&dir)?)
}

pub fn job_results(jobs_root: &Path, job_id: &str) -> Result<JobResults, JobsError> {
    let dir = existing_job_dir(jobs_root, job_id)?;
    Ok(read_results(&dir)?)
}

pub fn list_jobs(jobs_root: &Path, params: &ListJobsParams) -> Result<JobPage, JobsError> {
    let offset = params.offset.unwrap_or(0);
    let limit = params.limit.unwrap_or(DEFAULT_PAGE_SIZE).min(MAX_PAGE_SIZE);
    Ok(list_job_page(jobs_root, offset, limit)?)
}

pub fn delete_job(jobs_root: &Path, job_id: &str) -> Result<(), JobsError> {
    Ok(remove_job(jobs_root, job_id)?)
}

/// Resolves `rel_path` inside the job directory.
///
/// Anything that does not exist, is not a regular file, or resolves outside the job (through
/// `..` or a symlink) is `FileNotFound`.
pub fn resolve_job_file(jobs_root: &Path, job_id: &str, rel_path: &str) -> Result<PathBuf, JobsError> {
    let dir = existing_job_dir(jobs_root, job_id)?;
    let dir_canon = dir
        .canonicalize()
        .map_err(|e| Report::new(e).wrap_err("Failed to canonicalize job directory"))?;

    let Ok(file_canon) = dir.join(rel_path).canonicalize() else {
        debug!("Job file not found: {rel_path}");
        return Err(JobsError::FileNotFound);
    };
    if !file_canon.starts_with(&dir_canon) {
        warn!("Blocked directory traversal attempt for job {job_id}: {rel_path}");
        return Err(JobsError::FileNotFound);
    }
    if !file_canon.is_file() {
        return Err(JobsError::FileNotFound);
    }
    Ok(file_canon)
}

/// Streams a job artifact with a content type guessed from its extension.
pub async fn stream_job_file(jobs_root: &Path, job_id: &str, rel_path: &str) -> Result<Response<Body>, JobsError> {
    let path = resolve_job_file(jobs_root, job_id, rel_path)?;
    let file = File::open(&path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => JobsError::FileNotFound,
        _ => Report::new(e).wrap_err("Failed to open job file").into(),
    })?;

    let stream = FramedRead::new(file, BytesCodec::new());
    let mime_type = mime_guess::from_path(&path).first_or_octet_stream();
    let filename = path.file_name().and_then(|n| n.to_str()).unwrap_or("file");
    let disposition = header::HeaderValue::from_str(&format!("inline; filename=\"{filename}\""))
        .unwrap_or(header::HeaderValue::from_static("inline"));

    Response::builder()
        .header(header::CONTENT_TYPE, mime_type.as_ref())
        .header(header::CONTENT_DISPOSITION, disposition)
        .body(Body::from_stream(stream))
        .map_err(|e| eyre::eyre!("Failed to build file response: {e}").into())
}

/// Swaps in a freshly configured detector for jobs scheduled from now on.
pub fn reload_models(handle: &InferenceHandle, settings: &InferenceSettings) -> Result<ReloadResponse, JobsError> {
    let generation = handle.reload(settings)?;
    Ok(ReloadResponse { generation })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job_store::write_results;
    use std::fs as std_fs;

    #[test]
    fn upload_names_are_reduced_to_base_names() {
        assert_eq!(upload_file_name(Some("shelf.jpg")), "shelf.jpg");
        assert_eq!(upload_file_name(Some("../../etc/shelf.jpg")), "shelf.jpg");
        assert_eq!(upload_file_name(Some("C:\\photos\\shelf.png")), "shelf.png");
        assert_eq!(upload_file_name(Some("..")), DEFAULT_IMAGE_NAME);
        assert_eq!(upload_file_name(Some("")), DEFAULT_IMAGE_NAME);
        assert_eq!(upload_file_name(None), DEFAULT_IMAGE_NAME);
    }

    #[test]
    fn resolves_only_files_inside_the_job() -> color_eyre::Result<()> {
        let root = tempfile::tempdir()?;
        let (job_id, dir) = create_job(root.path())?;
        std_fs::create_dir_all(dir.join("crops"))?;
        std_fs::write(dir.join("crops/a.jpg"), b"x")?;
        std_fs::write(root.path().join("secret.txt"), b"x")?;

        let found = resolve_job_file(root.path(), &job_id, "crops/a.jpg")?;
        assert!(found.ends_with("crops/a.jpg"));

        for rel in ["../secret.txt", "crops/../../secret.txt", "/etc/passwd", "crops", "", "missing.jpg"] {
            assert!(
                matches!(resolve_job_file(root.path(), &job_id, rel), Err(JobsError::FileNotFound)),
                "{rel}"
            );
        }
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn symlinks_out_of_the_job_are_not_found() -> color_eyre::Result<()> {
        let root = tempfile::tempdir()?;
        let (job_id, dir) = create_job(root.path())?;
        std_fs::write(root.path().join("secret.txt"), b"x")?;
        std::os::unix::fs::symlink(root.path().join("secret.txt"), dir.join("link.txt"))?;

        assert!(matches!(
            resolve_job_file(root.path(), &job_id, "link.txt"),
            Err(JobsError::FileNotFound)
        ));
        Ok(())
    }

    #[test]
    fn status_and_results_of_unknown_jobs_are_not_found() -> color_eyre::Result<()> {
        let root = tempfile::tempdir()?;
        let missing = uuid::Uuid::new_v4().to_string();
        assert!(matches!(job_status(root.path(), &missing), Err(JobsError::NotFound(_))));
        assert!(matches!(job_status(root.path(), "not-a-uuid"), Err(JobsError::NotFound(_))));

        let (job_id, dir) = create_job(root.path())?;
        assert_eq!(job_status(root.path(), &job_id)?.status, JobStatus::Unknown);
        assert!(matches!(job_results(root.path(), &job_id), Err(JobsError::NotFound(_))));

        write_results(
            &dir,
            &JobResults {
                job_id: job_id.clone(),
                status: JobStatus::Succeeded,
                total_images: 0,
                images: vec![],
            },
        )?;
        assert_eq!(job_results(root.path(), &job_id)?.job_id, job_id);
        Ok(())
    }

    #[test]
    fn page_size_is_defaulted_and_capped() -> color_eyre::Result<()> {
        let root = tempfile::tempdir()?;
        let page = list_jobs(root.path(), &ListJobsParams::default())?;
        assert_eq!((page.offset, page.limit), (0, DEFAULT_PAGE_SIZE));

        let capped = list_jobs(
            root.path(),
            &ListJobsParams {
                offset: Some(3),
                limit: Some(10_000),
            },
        )?;
        assert_eq!((capped.offset, capped.limit), (3, MAX_PAGE_SIZE));
        Ok(())
    }
}
