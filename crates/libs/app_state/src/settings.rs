use crate::{AnalysisSettings, ApiSettings, InferenceSettings, LoggingSettings, RawSettings};
use serde::Deserialize;
use std::path::{Path, PathBuf, absolute};

#[derive(Debug, Deserialize, Clone)]
pub struct AppSettings {
    pub jobs: JobSettings,
    pub analysis: AnalysisSettings,
    pub inference: InferenceSettings,
    pub logging: LoggingSettings,
    pub api: ApiSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct JobSettings {
    /// Absolute root under which every job gets its own directory.
    pub jobs_dir: PathBuf,
}

impl From<RawSettings> for AppSettings {
    fn from(raw: RawSettings) -> Self {
        let jobs_dir = absolute(&raw.jobs.jobs_dir).unwrap_or(raw.jobs.jobs_dir);

        Self {
            jobs: JobSettings { jobs_dir },
            analysis: raw.analysis,
            inference: raw.inference,
            logging: raw.logging,
            api: raw.api,
        }
    }
}

impl AppSettings {
    /// Settings with every default applied and jobs stored under `jobs_dir`.
    #[must_use]
    pub fn with_jobs_dir(jobs_dir: impl Into<PathBuf>) -> Self {
        let mut raw = RawSettings::default();
        raw.jobs.jobs_dir = jobs_dir.into();
        raw.into()
    }
}

impl AnalysisSettings {
    #[must_use]
    pub fn is_image_file(&self, file: &Path) -> bool {
        let Some(extension) = file.extension().map(|e| e.to_string_lossy().to_lowercase()) else {
            return false;
        };
        self.image_extensions
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(&extension))
    }
}
