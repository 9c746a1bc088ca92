use crate::{ComplianceResult, DetectedObject, ShelfSummary};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Queued,
    Running,
    Succeeded,
    Failed,
    /// No readable status record exists (yet).
    Unknown,
}

impl JobStatus {
    /// `SUCCEEDED` and `FAILED` are sinks: nothing transitions out of them.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Queued => "QUEUED",
            Self::Running => "RUNNING",
            Self::Succeeded => "SUCCEEDED",
            Self::Failed => "FAILED",
            Self::Unknown => "UNKNOWN",
        };
        f.write_str(text)
    }
}

/// Pipeline step a job was in when its status was last written. Informational only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Upload,
    ExtractZip,
    Segmentation,
    Processing,
    Done,
}

impl Stage {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Upload => "upload",
            Self::ExtractZip => "extract_zip",
            Self::Segmentation => "segmentation",
            Self::Processing => "processing",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Contents of a job's `status.json`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, ToSchema)]
pub struct StatusRecord {
    pub job_id: String,
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    /// Present only on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StatusRecord {
    #[must_use]
    pub fn new(job_id: impl Into<String>, status: JobStatus, stage: Stage, error: Option<String>) -> Self {
        Self {
            job_id: job_id.into(),
            status,
            stage: Some(stage.as_str().to_owned()),
            updated_at: Some(Utc::now()),
            error: error.filter(|e| !e.is_empty()),
        }
    }

    #[must_use]
    pub fn unknown(job_id: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            status: JobStatus::Unknown,
            stage: None,
            updated_at: None,
            error: None,
        }
    }
}

/// One page of the job listing, newest first.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, ToSchema)]
pub struct JobPage {
    pub total: usize,
    pub offset: usize,
    pub limit: usize,
    pub jobs: Vec<StatusRecord>,
}

/// Per-photo section of `results.json`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ImageResult {
    pub image: String,
    pub image_rel: String,
    pub annotated: Option<String>,
    pub annotated_rel: Option<String>,
    pub objects: Vec<DetectedObject>,
    pub shelves: ShelfSummary,
    /// The planogram document as supplied by the caller.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub planogram: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compliance: Option<ComplianceResult>,
}

/// Contents of a job's `results.json`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct JobResults {
    pub job_id: String,
    pub status: JobStatus,
    pub total_images: usize,
    pub images: Vec<ImageResult>,
}
