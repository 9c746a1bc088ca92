use crate::inference::error::InferenceError;
use crate::inference::remote::RemoteDetector;
use crate::inference::ShelfDetector;
use app_state::InferenceSettings;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::info;

/// The detector currently used for new jobs.
///
/// The lock only guards cloning or swapping the `Arc`, never a model call. Running jobs keep
/// the snapshot they started with when the detector is swapped.
pub struct InferenceHandle {
    current: RwLock<Arc<dyn ShelfDetector>>,
    generation: AtomicU64,
}

impl InferenceHandle {
    pub fn new(detector: Arc<dyn ShelfDetector>) -> Self {
        Self {
            current: RwLock::new(detector),
            generation: AtomicU64::new(1),
        }
    }

    pub fn from_settings(settings: &InferenceSettings) -> Result<Self, InferenceError> {
        Ok(Self::new(Arc::new(RemoteDetector::new(settings)?)))
    }

    /// Snapshot of the current detector.
    pub fn current(&self) -> Arc<dyn ShelfDetector> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Installs `detector` for all jobs scheduled from now on and returns the new generation.
    pub fn replace(&self, detector: Arc<dyn ShelfDetector>) -> u64 {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = detector;
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        info!("Inference models swapped, generation {generation}");
        generation
    }

    /// Rebuilds the remote detector from `settings` and swaps it in.
    pub fn reload(&self, settings: &InferenceSettings) -> Result<u64, InferenceError> {
        let detector = RemoteDetector::new(settings)?;
        Ok(self.replace(Arc::new(detector)))
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::{DetectionOutput, DetectionRequest};
    use async_trait::async_trait;
    use common_types::Prediction;
    use std::path::Path;

    struct Named(&'static str);

    #[async_trait]
    impl ShelfDetector for Named {
        async fn detect(&self, _request: &DetectionRequest) -> Result<DetectionOutput, InferenceError> {
            Ok(DetectionOutput {
                objects: vec![],
                annotated: None,
                image_width: 1,
                image_height: 1,
            })
        }

        async fn classify(&self, _crop: &Path) -> Result<Option<Prediction>, InferenceError> {
            Ok(Some(Prediction {
                label: self.0.to_owned(),
                confidence: 1.0,
            }))
        }
    }

    #[tokio::test]
    async fn snapshots_survive_a_swap() -> Result<(), InferenceError> {
        let handle = InferenceHandle::new(Arc::new(Named("old")));
        let snapshot = handle.current();
        assert_eq!(handle.generation(), 1);

        let generation = handle.replace(Arc::new(Named("new")));

        assert_eq!(generation, 2);
        assert_eq!(handle.generation(), 2);
        let old = snapshot.classify(Path::new("crop.jpg")).await?;
        let new = handle.current().classify(Path::new("crop.jpg")).await?;
        assert_eq!(old.map(|p| p.label).as_deref(), Some("old"));
        assert_eq!(new.map(|p| p.label).as_deref(), Some("new"));
        Ok(())
    }

    #[test]
    fn reload_builds_a_remote_detector() -> Result<(), InferenceError> {
        let handle = InferenceHandle::from_settings(&InferenceSettings::default())?;
        assert_eq!(handle.reload(&InferenceSettings::default())?, 2);
        Ok(())
    }
}
