use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct RawSettings {
    pub jobs: RawJobSettings,
    pub analysis: AnalysisSettings,
    pub inference: InferenceSettings,
    pub logging: LoggingSettings,
    pub api: ApiSettings,
}

/// Where job directories live on disk.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RawJobSettings {
    pub jobs_dir: PathBuf,
}

impl Default for RawJobSettings {
    fn default() -> Self {
        Self {
            jobs_dir: PathBuf::from("jobs"),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct AnalysisSettings {
    /// Which extensions are treated as shelf photos, lowercase without the dot.
    pub image_extensions: Vec<String>,
    pub shelves: ShelfSettings,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            image_extensions: ["jpg", "jpeg", "png", "bmp", "tif", "tiff", "webp"]
                .iter()
                .map(ToString::to_string)
                .collect(),
            shelves: ShelfSettings::default(),
        }
    }
}

/// Gap policy for grouping detections into shelf rows.
///
/// Two consecutive vertical centers belong to different shelves when their distance exceeds
/// `max(gap_min_px, median_object_height * gap_ratio)`.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct ShelfSettings {
    pub gap_ratio: f32,
    pub gap_min_px: f32,
}

impl Default for ShelfSettings {
    fn default() -> Self {
        Self {
            gap_ratio: 0.6,
            gap_min_px: 40.0,
        }
    }
}

/// Connection and model parameters for the external detection/classification server.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct InferenceSettings {
    pub base_url: String,
    /// Minimum detector confidence.
    pub conf: f32,
    /// IoU threshold for non-maximum suppression.
    pub iou: f32,
    /// Square inference size in pixels.
    pub imgsz: u32,
    pub max_det: u32,
    /// Device hint forwarded to the model server, e.g. `cuda` or `cpu`.
    pub device: Option<String>,
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
}

impl Default for InferenceSettings {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8500".to_owned(),
            conf: 0.25,
            iou: 0.7,
            imgsz: 640,
            max_det: 300,
            device: None,
            timeout_secs: 120,
            connect_timeout_secs: 5,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
        }
    }
}

/// Configuration for the API server.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ApiSettings {
    pub host: String,
    pub port: u32,
    pub allowed_origins: Vec<String>,
    pub max_upload_mb: usize,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_owned(),
            port: 8000,
            allowed_origins: Vec::new(),
            max_upload_mb: 512,
        }
    }
}
