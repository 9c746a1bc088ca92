//! The seam between the job runner and the detection/classification models.

pub mod artifacts;
pub mod error;
pub mod handle;
pub mod remote;

pub use error::InferenceError;
pub use handle::InferenceHandle;
pub use remote::RemoteDetector;

use async_trait::async_trait;
use common_types::{DetectedObject, Prediction};
use std::path::{Path, PathBuf};

/// Everything a detector needs to process one photo of a job.
#[derive(Debug, Clone)]
pub struct DetectionRequest {
    pub image: PathBuf,
    /// Prefix for every artifact written for this photo, unique within the job.
    pub artifact_stem: String,
    pub crops_dir: PathBuf,
    pub annotated_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DetectionOutput {
    /// Detections with clamped boxes and `crop` pointing at the written crop.
    pub objects: Vec<DetectedObject>,
    /// Annotated rendering, absent when it could not be produced.
    pub annotated: Option<PathBuf>,
    pub image_width: u32,
    pub image_height: u32,
}

/// Object detector plus crop classifier.
#[async_trait]
pub trait ShelfDetector: Send + Sync {
    async fn detect(&self, request: &DetectionRequest) -> Result<DetectionOutput, InferenceError>;

    /// Predicts the product label of one crop. `Ok(None)` means the model declined.
    async fn classify(&self, crop: &Path) -> Result<Option<Prediction>, InferenceError>;
}
