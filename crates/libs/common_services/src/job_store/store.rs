//! On-disk job directories under the configured jobs root.
//!
//! Layout of one job:
//! ```text
//! {jobs_dir}/{job_id}/status.json
//!                    /results.json
//!                    /input/...
//!                    /crops/...
//!                    /annotated/...
//! ```

use crate::job_store::error::JobStoreError;
use common_types::{JobPage, JobResults, JobStatus, Stage, StatusRecord};
use serde::Serialize;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub const STATUS_FILE: &str = "status.json";
pub const RESULTS_FILE: &str = "results.json";
pub const INPUT_DIR: &str = "input";
pub const CROPS_DIR: &str = "crops";
pub const ANNOTATED_DIR: &str = "annotated";

/// Creates a fresh job directory and returns its id and path.
pub fn create_job(root: &Path) -> Result<(String, PathBuf), JobStoreError> {
    fs::create_dir_all(root)?;
    let job_id = Uuid::new_v4().to_string();
    let dir = root.join(&job_id);
    fs::create_dir(&dir)?;
    info!("Created job {job_id}");
    Ok((job_id, dir))
}

/// Path of a job directory. Ids that are not canonical lowercase UUIDs are `NotFound`, which
/// also keeps path separators and `..` out of the result.
pub fn job_dir(root: &Path, job_id: &str) -> Result<PathBuf, JobStoreError> {
    let parsed = Uuid::parse_str(job_id).map_err(|_| JobStoreError::NotFound(job_id.to_owned()))?;
    if parsed.hyphenated().to_string() != job_id {
        return Err(JobStoreError::NotFound(job_id.to_owned()));
    }
    Ok(root.join(job_id))
}

/// Like [`job_dir`], but the directory must exist.
pub fn existing_job_dir(root: &Path, job_id: &str) -> Result<PathBuf, JobStoreError> {
    let dir = job_dir(root, job_id)?;
    if !dir.is_dir() {
        return Err(JobStoreError::NotFound(job_id.to_owned()));
    }
    Ok(dir)
}

/// The job id is the name of its directory.
pub fn job_id_of(dir: &Path) -> String {
    dir.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Serializes `value` next to its final location and renames it into place, so readers see
/// either the old document or the new one.
fn write_json_atomic<T: Serialize>(dir: &Path, file_name: &str, value: &T) -> Result<(), JobStoreError> {
    let bytes = serde_json::to_vec_pretty(value)?;
    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(&bytes)?;
    temp.as_file().sync_all()?;
    temp.persist(dir.join(file_name))?;
    Ok(())
}

/// Overwrites the job's status record.
pub fn write_status(
    dir: &Path,
    status: JobStatus,
    stage: Stage,
    error: Option<String>,
) -> Result<StatusRecord, JobStoreError> {
    let record = StatusRecord::new(job_id_of(dir), status, stage, error);
    write_json_atomic(dir, STATUS_FILE, &record)?;
    debug!("Job {} -> {} ({})", record.job_id, record.status, stage);
    Ok(record)
}

/// Reads the job's status record. A missing record is `UNKNOWN`, never an error.
pub fn read_status(dir: &Path) -> Result<StatusRecord, JobStoreError> {
    let bytes = match fs::read(dir.join(STATUS_FILE)) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(StatusRecord::unknown(job_id_of(dir))),
        Err(e) => return Err(e.into()),
    };
    Ok(serde_json::from_slice(&bytes)?)
}

pub fn write_results(dir: &Path, results: &JobResults) -> Result<(), JobStoreError> {
    write_json_atomic(dir, RESULTS_FILE, results)
}

/// Reads `results.json`. Jobs that have not succeeded have none and yield `NotFound`.
pub fn read_results(dir: &Path) -> Result<JobResults, JobStoreError> {
    let bytes = match fs::read(dir.join(RESULTS_FILE)) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(JobStoreError::NotFound(job_id_of(dir))),
        Err(e) => return Err(e.into()),
    };
    Ok(serde_json::from_slice(&bytes)?)
}

fn created_at(path: &Path) -> SystemTime {
    fs::metadata(path)
        .and_then(|meta| meta.created().or_else(|_| meta.modified()))
        .unwrap_or(SystemTime::UNIX_EPOCH)
}

/// One page of jobs, newest directory first. Unreadable status files are listed as `UNKNOWN`.
pub fn list_jobs(root: &Path, offset: usize, limit: usize) -> Result<JobPage, JobStoreError> {
    let entries = match fs::read_dir(root) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Ok(JobPage {
                total: 0,
                offset,
                limit,
                jobs: vec![],
            });
        }
        Err(e) => return Err(e.into()),
    };

    let mut dirs: Vec<(SystemTime, String, PathBuf)> = entries
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_ok_and(|t| t.is_dir()))
        .filter_map(|entry| {
            let name = entry.file_name().to_str()?.to_owned();
            Uuid::parse_str(&name).ok()?;
            let path = entry.path();
            Some((created_at(&path), name, path))
        })
        .collect();
    dirs.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));

    let total = dirs.len();
    let jobs = dirs
        .into_iter()
        .skip(offset)
        .take(limit)
        .map(|(_, name, path)| {
            read_status(&path).unwrap_or_else(|e| {
                warn!("Unreadable status for job {name}: {e}");
                StatusRecord::unknown(name)
            })
        })
        .collect();

    Ok(JobPage {
        total,
        offset,
        limit,
        jobs,
    })
}

/// Removes a job directory and everything in it.
pub fn delete_job(root: &Path, job_id: &str) -> Result<(), JobStoreError> {
    let dir = existing_job_dir(root, job_id)?;
    fs::remove_dir_all(&dir)?;
    info!("Deleted job {job_id}");
    Ok(())
}
