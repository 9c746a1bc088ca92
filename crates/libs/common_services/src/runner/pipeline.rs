//! Runs one job from its input directory to `results.json`.

use crate::inference::{DetectionRequest, ShelfDetector};
use crate::job_store::{ANNOTATED_DIR, CROPS_DIR, JobStoreError, job_id_of, write_results, write_status};
use crate::runner::error::PipelineError;
use crate::shelves::{cluster_shelves, score_compliance};
use crate::utils::{list_images, rel_or_abs};
use app_state::AnalysisSettings;
use common_types::{ImageResult, JobResults, JobStatus, Planogram, Stage};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task;
use tracing::{debug, error, info, warn};

/// Caller-supplied planogram, kept verbatim for the results plus its parsed rows.
struct PlanogramInput {
    document: Value,
    parsed: Option<Planogram>,
}

impl PlanogramInput {
    /// Text that is empty or not JSON counts as no planogram.
    fn parse(text: Option<&str>) -> Option<Self> {
        let text = text.map(str::trim).filter(|t| !t.is_empty())?;
        let document: Value = serde_json::from_str(text)
            .inspect_err(|e| warn!("Ignoring planogram that is not valid JSON: {e}"))
            .ok()?;
        let parsed = Planogram::from_value(&document);
        if parsed.is_none() {
            warn!("Planogram has no `planogram` list, compliance will not be scored");
        }
        Some(Self { document, parsed })
    }
}

/// Processes every image under `input_dir` and records the outcome in the job directory.
///
/// Never fails: every error ends up as a `FAILED` status with its message. Returns the
/// terminal status.
pub async fn process_job(
    detector: Arc<dyn ShelfDetector>,
    analysis: &AnalysisSettings,
    job_dir: &Path,
    input_dir: &Path,
    planogram: Option<&str>,
) -> JobStatus {
    let job_id = job_id_of(job_dir);
    match run(detector.as_ref(), analysis, job_dir, input_dir, planogram).await {
        Ok(total_images) => {
            info!("Job {job_id} succeeded ({total_images} images)");
            JobStatus::Succeeded
        }
        Err(e) => {
            error!("Job {job_id} failed: {e}");
            if let Err(write_err) = write_status(job_dir, JobStatus::Failed, e.stage(), Some(e.to_string())) {
                error!("Could not record failure of job {job_id}: {write_err}");
            }
            JobStatus::Failed
        }
    }
}

async fn run(
    detector: &dyn ShelfDetector,
    analysis: &AnalysisSettings,
    job_dir: &Path,
    input_dir: &Path,
    planogram: Option<&str>,
) -> Result<usize, PipelineError> {
    write_status(job_dir, JobStatus::Running, Stage::Segmentation, None)?;
    fs::create_dir_all(job_dir.join(CROPS_DIR)).map_err(JobStoreError::from)?;

    let images = {
        let input_dir = input_dir.to_path_buf();
        let analysis = analysis.clone();
        task::spawn_blocking(move || list_images(&input_dir, &analysis)).await?
    };
    if images.is_empty() {
        return Err(PipelineError::NoImagesFound);
    }
    info!("Job {} processing {} images", job_id_of(job_dir), images.len());

    let planogram = PlanogramInput::parse(planogram);
    let mut results = JobResults {
        job_id: job_id_of(job_dir),
        status: JobStatus::Succeeded,
        total_images: images.len(),
        images: Vec::with_capacity(images.len()),
    };
    for (position, image) in images.iter().enumerate() {
        let result = process_image(detector, analysis, job_dir, image, position + 1, planogram.as_ref()).await?;
        results.images.push(result);
    }

    write_results(job_dir, &results).map_err(PipelineError::SerializationFailure)?;
    write_status(job_dir, JobStatus::Succeeded, Stage::Done, None)?;
    Ok(results.total_images)
}

/// `{NNN}_{file stem}`, so same-named photos in different folders get distinct artifacts.
fn artifact_stem(image: &Path, position: usize) -> String {
    let stem = image
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!("{position:03}_{stem}")
}

async fn process_image(
    detector: &dyn ShelfDetector,
    analysis: &AnalysisSettings,
    job_dir: &Path,
    image: &Path,
    position: usize,
    planogram: Option<&PlanogramInput>,
) -> Result<ImageResult, PipelineError> {
    let detection_failure = |source| PipelineError::DetectionFailure {
        image: image.display().to_string(),
        source,
    };

    let request = DetectionRequest {
        image: image.to_path_buf(),
        artifact_stem: artifact_stem(image, position),
        crops_dir: job_dir.join(CROPS_DIR),
        annotated_dir: job_dir.join(ANNOTATED_DIR),
    };
    let output = detector.detect(&request).await.map_err(detection_failure)?;
    debug!(
        "{}: {} objects in {}x{}",
        image.display(),
        output.objects.len(),
        output.image_width,
        output.image_height
    );

    let mut objects = output.objects;
    for object in &mut objects {
        let crop = match object.crop.as_deref().map(PathBuf::from) {
            Some(path) if tokio::fs::try_exists(&path).await.unwrap_or(false) => Some(path),
            _ => None,
        };
        object.crop_rel = object.crop.as_deref().map(|c| rel_or_abs(Path::new(c), job_dir));
        let prediction = match crop {
            Some(crop) => detector.classify(&crop).await.map_err(detection_failure)?,
            None => None,
        };
        (object.pred_label, object.pred_confidence) = match prediction {
            Some(p) => (Some(p.label), p.confidence),
            None => (None, 0.0),
        };
    }

    let shelves = cluster_shelves(&mut objects, &analysis.shelves);
    let compliance = score_compliance(&shelves, planogram.and_then(|p| p.parsed.as_ref()));

    Ok(ImageResult {
        image: image.to_string_lossy().into_owned(),
        image_rel: rel_or_abs(image, job_dir),
        annotated: output.annotated.as_deref().map(|p| p.to_string_lossy().into_owned()),
        annotated_rel: output.annotated.as_deref().map(|p| rel_or_abs(p, job_dir)),
        objects,
        shelves,
        planogram: planogram.map(|p| p.document.clone()),
        compliance,
    })
}
