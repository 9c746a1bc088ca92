use app_state::AnalysisSettings;
use async_trait::async_trait;
use color_eyre::Result;
use common_services::inference::artifacts::{RawDetection, write_artifacts};
use common_services::inference::{DetectionOutput, DetectionRequest, InferenceError, InferenceHandle, ShelfDetector};
use common_services::job_store::{INPUT_DIR, RESULTS_FILE, create_job, read_results, read_status, write_status};
use common_services::runner::{JobRequest, JobScheduler, process_job};
use common_types::{DetectedObject, JobStatus, Prediction, Stage};
use image::{Rgb, RgbImage};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Pretends to be the model server: every photo holds the same shelf layout.
struct StubDetector {
    /// `(x1, y1, x2, y2, label)`; the label is what the classifier will answer for the crop.
    layout: Vec<(f32, f32, f32, f32, &'static str)>,
}

impl StubDetector {
    fn new(layout: Vec<(f32, f32, f32, f32, &'static str)>) -> Self {
        Self { layout }
    }

    /// Two shelves: A, B on top and C below.
    fn two_bands() -> Self {
        Self::new(vec![
            (220.0, 20.0, 300.0, 90.0, "B"),
            (120.0, 240.0, 200.0, 310.0, "C"),
            (20.0, 25.0, 100.0, 95.0, "A"),
        ])
    }
}

#[async_trait]
impl ShelfDetector for StubDetector {
    async fn detect(&self, request: &DetectionRequest) -> Result<DetectionOutput, InferenceError> {
        let detections = self
            .layout
            .iter()
            .map(|&(x1, y1, x2, y2, label)| RawDetection {
                xyxy: [x1, y1, x2, y2],
                confidence: 0.9,
                class_id: 0,
                label: label.to_owned(),
            })
            .collect();
        write_artifacts(request, detections)
    }

    /// Reads the label back out of `{stem}_obj{NNN}_{label}.jpg`; `none` declines.
    async fn classify(&self, crop: &Path) -> Result<Option<Prediction>, InferenceError> {
        let stem = crop.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
        let label = stem
            .rsplit_once("_obj")
            .and_then(|(_, rest)| rest.split_once('_'))
            .map(|(_, label)| label.to_owned());
        Ok(label.filter(|l| l != "none").map(|label| Prediction {
            label,
            confidence: 0.8,
        }))
    }
}

struct FailingDetector;

#[async_trait]
impl ShelfDetector for FailingDetector {
    async fn detect(&self, _request: &DetectionRequest) -> Result<DetectionOutput, InferenceError> {
        Err(InferenceError::UnexpectedStatus {
            url: "http://models/detect".to_owned(),
            status: 503,
            body: "model not loaded".to_owned(),
        })
    }

    async fn classify(&self, _crop: &Path) -> Result<Option<Prediction>, InferenceError> {
        Ok(None)
    }
}

/// Reports crops that were never written; any classify call would label them `ghost`.
struct MissingCropDetector;

#[async_trait]
impl ShelfDetector for MissingCropDetector {
    async fn detect(&self, request: &DetectionRequest) -> Result<DetectionOutput, InferenceError> {
        let mut object = DetectedObject::new("can", 0, 0.9, [10, 10, 60, 60]);
        object.crop = Some(request.crops_dir.join("gone.jpg").to_string_lossy().into_owned());
        Ok(DetectionOutput {
            objects: vec![object],
            annotated: None,
            image_width: 320,
            image_height: 340,
        })
    }

    async fn classify(&self, _crop: &Path) -> Result<Option<Prediction>, InferenceError> {
        Ok(Some(Prediction {
            label: "ghost".to_owned(),
            confidence: 0.99,
        }))
    }
}

fn write_photo(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    RgbImage::from_pixel(320, 340, Rgb([180, 180, 180])).save(path)?;
    Ok(())
}

/// A queued job with the given photos (relative to `input/`).
fn queued_job(root: &Path, photos: &[&str]) -> Result<(String, PathBuf)> {
    let (job_id, dir) = create_job(root)?;
    fs::create_dir_all(dir.join(INPUT_DIR))?;
    for photo in photos {
        write_photo(&dir.join(INPUT_DIR).join(photo))?;
    }
    write_status(&dir, JobStatus::Queued, Stage::Upload, None)?;
    Ok((job_id, dir))
}

#[tokio::test]
async fn three_photos_with_two_bands_give_two_shelves_each() -> Result<()> {
    let root = tempfile::tempdir()?;
    let (job_id, dir) = queued_job(root.path(), &["c.jpg", "aisle/a.png", "b.jpg"])?;

    let status = process_job(
        Arc::new(StubDetector::two_bands()),
        &AnalysisSettings::default(),
        &dir,
        &dir.join(INPUT_DIR),
        None,
    )
    .await;

    assert_eq!(status, JobStatus::Succeeded);
    let record = read_status(&dir)?;
    assert_eq!(record.status, JobStatus::Succeeded);
    assert_eq!(record.stage.as_deref(), Some("done"));
    assert_eq!(record.error, None);

    let results = read_results(&dir)?;
    assert_eq!(results.job_id, job_id);
    assert_eq!(results.total_images, 3);
    let order: Vec<&str> = results.images.iter().map(|i| i.image_rel.as_str()).collect();
    assert_eq!(order, vec!["input/aisle/a.png", "input/b.jpg", "input/c.jpg"]);

    for image in &results.images {
        assert_eq!(image.shelves.shelves.len(), 2);
        assert_eq!(image.shelves.shelves[0].classes_left_to_right, vec!["A", "B"]);
        assert_eq!(image.shelves.shelves[1].classes_left_to_right, vec!["C"]);
        assert_eq!(image.shelves.total_objects, 3);
        assert!(image.compliance.is_none());
        assert!(image.planogram.is_none());
        for object in &image.objects {
            assert!(object.shelf_index.is_some() && object.index_in_shelf.is_some());
            let crop_rel = object.crop_rel.as_deref().unwrap_or_default();
            assert!(crop_rel.starts_with("crops/"), "{crop_rel}");
            assert!(dir.join(crop_rel).is_file());
        }
    }

    let first = &results.images[0];
    assert_eq!(first.annotated_rel.as_deref(), Some("annotated/001_a_annotated.jpg"));
    assert_eq!(first.objects[2].crop_rel.as_deref(), Some("crops/001_a_obj003_A.jpg"));
    assert_eq!(first.objects[2].pred_label.as_deref(), Some("A"));
    Ok(())
}

#[tokio::test]
async fn job_without_images_fails_at_segmentation() -> Result<()> {
    let root = tempfile::tempdir()?;
    let (_, dir) = queued_job(root.path(), &[])?;
    fs::write(dir.join(INPUT_DIR).join("notes.txt"), b"not a photo")?;

    let status = process_job(
        Arc::new(StubDetector::two_bands()),
        &AnalysisSettings::default(),
        &dir,
        &dir.join(INPUT_DIR),
        None,
    )
    .await;

    assert_eq!(status, JobStatus::Failed);
    let record = read_status(&dir)?;
    assert_eq!(record.status, JobStatus::Failed);
    assert_eq!(record.stage.as_deref(), Some("segmentation"));
    assert!(record.error.is_some_and(|e| !e.is_empty()));
    assert!(!dir.join(RESULTS_FILE).exists());
    Ok(())
}

#[tokio::test]
async fn planogram_scores_two_of_three_positions() -> Result<()> {
    let root = tempfile::tempdir()?;
    let (_, dir) = queued_job(root.path(), &["shelf.jpg"])?;
    let detector = StubDetector::new(vec![
        (20.0, 20.0, 100.0, 90.0, "A"),
        (220.0, 20.0, 300.0, 90.0, "X"),
        (20.0, 240.0, 100.0, 310.0, "C"),
    ]);

    let status = process_job(
        Arc::new(detector),
        &AnalysisSettings::default(),
        &dir,
        &dir.join(INPUT_DIR),
        Some(r#"{"planogram": [["A", "B"], ["C"]]}"#),
    )
    .await;

    assert_eq!(status, JobStatus::Succeeded);
    let results = read_results(&dir)?;
    let image = &results.images[0];
    let compliance = image.compliance.as_ref().expect("planogram was scored");
    assert_eq!(compliance.total_expected, 3);
    assert_eq!(compliance.total_matched, 2);
    assert!((compliance.match_percent - 66.67).abs() < f64::EPSILON);
    assert_eq!(
        image.planogram.as_ref().map(|p| p["planogram"][1][0].clone()),
        Some(serde_json::json!("C"))
    );
    Ok(())
}

#[tokio::test]
async fn invalid_planogram_is_ignored() -> Result<()> {
    let root = tempfile::tempdir()?;
    let (_, dir) = queued_job(root.path(), &["shelf.jpg"])?;

    let status = process_job(
        Arc::new(StubDetector::two_bands()),
        &AnalysisSettings::default(),
        &dir,
        &dir.join(INPUT_DIR),
        Some("[[\"A\""),
    )
    .await;

    assert_eq!(status, JobStatus::Succeeded);
    let results = read_results(&dir)?;
    assert!(results.images[0].compliance.is_none());
    assert!(results.images[0].planogram.is_none());
    Ok(())
}

#[tokio::test]
async fn declined_predictions_are_unknown() -> Result<()> {
    let root = tempfile::tempdir()?;
    let (_, dir) = queued_job(root.path(), &["shelf.jpg"])?;
    let detector = StubDetector::new(vec![(20.0, 20.0, 100.0, 90.0, "none"), (220.0, 20.0, 300.0, 90.0, "A")]);

    process_job(Arc::new(detector), &AnalysisSettings::default(), &dir, &dir.join(INPUT_DIR), None).await;

    let results = read_results(&dir)?;
    let image = &results.images[0];
    assert_eq!(image.objects[0].pred_label, None);
    assert!(image.objects[0].pred_confidence.abs() < f32::EPSILON);
    assert_eq!(image.shelves.shelves[0].classes_left_to_right, vec!["UNKNOWN", "A"]);
    assert_eq!((image.shelves.total_known, image.shelves.total_unknown), (1, 1));
    Ok(())
}

#[tokio::test]
async fn missing_crops_are_not_classified() -> Result<()> {
    let root = tempfile::tempdir()?;
    let (_, dir) = queued_job(root.path(), &["shelf.jpg"])?;

    let status = process_job(
        Arc::new(MissingCropDetector),
        &AnalysisSettings::default(),
        &dir,
        &dir.join(INPUT_DIR),
        None,
    )
    .await;

    assert_eq!(status, JobStatus::Succeeded);
    let results = read_results(&dir)?;
    let object = &results.images[0].objects[0];
    assert_eq!(object.crop_rel.as_deref(), Some("crops/gone.jpg"));
    assert_eq!(object.pred_label, None);
    assert!(object.pred_confidence.abs() < f32::EPSILON);
    assert_eq!(results.images[0].shelves.shelves[0].classes_left_to_right, vec!["UNKNOWN"]);
    Ok(())
}

#[tokio::test]
async fn detector_errors_fail_the_job_at_processing() -> Result<()> {
    let root = tempfile::tempdir()?;
    let (_, dir) = queued_job(root.path(), &["shelf.jpg"])?;

    let status = process_job(
        Arc::new(FailingDetector),
        &AnalysisSettings::default(),
        &dir,
        &dir.join(INPUT_DIR),
        None,
    )
    .await;

    assert_eq!(status, JobStatus::Failed);
    let record = read_status(&dir)?;
    assert_eq!(record.stage.as_deref(), Some("processing"));
    assert!(record.error.is_some_and(|e| e.contains("model not loaded")));
    assert!(!dir.join(RESULTS_FILE).exists());
    Ok(())
}

#[tokio::test]
async fn deleted_job_directory_fails_without_panicking() -> Result<()> {
    let root = tempfile::tempdir()?;
    let (_, dir) = queued_job(root.path(), &["shelf.jpg"])?;
    fs::remove_dir_all(&dir)?;

    let status = process_job(
        Arc::new(StubDetector::two_bands()),
        &AnalysisSettings::default(),
        &dir,
        &dir.join(INPUT_DIR),
        None,
    )
    .await;

    assert_eq!(status, JobStatus::Failed);
    assert!(!dir.exists());
    Ok(())
}

#[tokio::test]
async fn scheduled_jobs_run_in_the_background() -> Result<()> {
    let root = tempfile::tempdir()?;
    let (job_id, dir) = queued_job(root.path(), &["shelf.jpg"])?;
    let inference = Arc::new(InferenceHandle::new(Arc::new(StubDetector::two_bands())));
    let scheduler = JobScheduler::new(inference, AnalysisSettings::default());

    let handle = scheduler.schedule(JobRequest {
        job_id: job_id.clone(),
        job_dir: dir.clone(),
        input_dir: dir.join(INPUT_DIR),
        planogram: None,
    });

    assert_eq!(handle.job_id, job_id);
    assert_eq!(handle.wait().await, JobStatus::Succeeded);
    assert_eq!(read_status(&dir)?.status, JobStatus::Succeeded);
    Ok(())
}
