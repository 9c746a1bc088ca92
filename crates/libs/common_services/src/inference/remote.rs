//! HTTP client for the external model server that hosts the detector and the crop classifier.

use crate::inference::artifacts::{RawDetection, write_artifacts};
use crate::inference::error::InferenceError;
use crate::inference::{DetectionOutput, DetectionRequest, ShelfDetector};
use app_state::InferenceSettings;
use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose};
use common_types::Prediction;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use tokio::{fs, task};
use tracing::debug;

#[derive(Serialize)]
struct DetectBody<'a> {
    image_b64: String,
    filename: &'a str,
    conf: f32,
    iou: f32,
    imgsz: u32,
    max_det: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    device: Option<&'a str>,
}

#[derive(Deserialize)]
struct DetectResponse {
    #[serde(default)]
    boxes: Vec<RemoteBox>,
    /// Class id (as a string key) to class name.
    #[serde(default)]
    names: HashMap<String, String>,
}

#[derive(Deserialize)]
struct RemoteBox {
    xyxy: [f32; 4],
    #[serde(default)]
    confidence: f32,
    #[serde(default = "missing_class")]
    class_id: i64,
    #[serde(default)]
    label: Option<String>,
}

const fn missing_class() -> i64 {
    -1
}

#[derive(Serialize)]
struct ClassifyBody {
    image_b64: String,
}

#[derive(Deserialize)]
struct ClassifyResponse {
    #[serde(default)]
    label: Option<String>,
    #[serde(default)]
    confidence: f32,
}

/// Box label, else the server's class-name map, else the numeric class id.
fn resolve_label(label: Option<String>, class_id: i64, names: &HashMap<String, String>) -> String {
    label
        .filter(|l| !l.is_empty())
        .or_else(|| names.get(&class_id.to_string()).cloned())
        .unwrap_or_else(|| class_id.to_string())
}

#[derive(Clone)]
pub struct RemoteDetector {
    http: Client,
    settings: InferenceSettings,
}

impl RemoteDetector {
    pub fn new(settings: &InferenceSettings) -> Result<Self, InferenceError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .connect_timeout(Duration::from_secs(settings.connect_timeout_secs))
            .build()?;
        Ok(Self {
            http,
            settings: settings.clone(),
        })
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{endpoint}", self.settings.base_url.trim_end_matches('/'))
    }

    async fn post<B, R>(&self, endpoint: &str, body: &B) -> Result<R, InferenceError>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let url = self.url(endpoint);
        let response = self.http.post(&url).json(body).send().await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(InferenceError::UnexpectedStatus { url, status, body });
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl ShelfDetector for RemoteDetector {
    async fn detect(&self, request: &DetectionRequest) -> Result<DetectionOutput, InferenceError> {
        let bytes = fs::read(&request.image).await?;
        let filename = request
            .image
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let body = DetectBody {
            image_b64: general_purpose::STANDARD.encode(&bytes),
            filename: &filename,
            conf: self.settings.conf,
            iou: self.settings.iou,
            imgsz: self.settings.imgsz,
            max_det: self.settings.max_det,
            device: self.settings.device.as_deref(),
        };

        let DetectResponse { boxes, names } = self.post("detect", &body).await?;
        debug!("Model server found {} boxes in {filename}", boxes.len());
        let detections = boxes
            .into_iter()
            .map(|b| RawDetection {
                xyxy: b.xyxy,
                confidence: b.confidence,
                class_id: b.class_id,
                label: resolve_label(b.label, b.class_id, &names),
            })
            .collect();

        let request = request.clone();
        task::spawn_blocking(move || write_artifacts(&request, detections)).await?
    }

    async fn classify(&self, crop: &Path) -> Result<Option<Prediction>, InferenceError> {
        let bytes = fs::read(crop).await?;
        let body = ClassifyBody {
            image_b64: general_purpose::STANDARD.encode(&bytes),
        };
        let ClassifyResponse { label, confidence } = self.post("classify", &body).await?;
        Ok(label
            .filter(|l| !l.is_empty())
            .map(|label| Prediction { label, confidence }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_fall_back_to_names_then_class_id() {
        let names = HashMap::from([("3".to_owned(), "can".to_owned())]);
        assert_eq!(resolve_label(Some("bottle".into()), 3, &names), "bottle");
        assert_eq!(resolve_label(Some(String::new()), 3, &names), "can");
        assert_eq!(resolve_label(None, 3, &names), "can");
        assert_eq!(resolve_label(None, 9, &names), "9");
    }

    #[test]
    fn urls_ignore_trailing_slashes() -> color_eyre::Result<()> {
        let settings = InferenceSettings {
            base_url: "http://models:8500/".to_owned(),
            ..InferenceSettings::default()
        };
        let detector = RemoteDetector::new(&settings)?;
        assert_eq!(detector.url("detect"), "http://models:8500/detect");
        Ok(())
    }

    #[test]
    fn detect_body_omits_missing_device() -> serde_json::Result<()> {
        let body = DetectBody {
            image_b64: "AA==".to_owned(),
            filename: "a.jpg",
            conf: 0.25,
            iou: 0.7,
            imgsz: 640,
            max_det: 300,
            device: None,
        };
        let value = serde_json::to_value(&body)?;
        assert!(value.get("device").is_none());
        assert_eq!(value["imgsz"], 640);
        Ok(())
    }
}
