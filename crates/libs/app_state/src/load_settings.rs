use crate::{AppSettings, RawSettings};
use color_eyre::eyre::Result;
use std::fs;
use std::path::Path;
use tracing::debug;

const DEFAULT_CONFIG_PATH: &str = "config/settings.yaml";

/// Loads settings from `config/settings.yaml` (if present) overlaid with `APP__*` env vars.
pub fn load_app_settings() -> Result<AppSettings> {
    load_app_settings_from(Path::new(DEFAULT_CONFIG_PATH))
}

pub fn load_app_settings_from(config_path: &Path) -> Result<AppSettings> {
    // Need to load from dotenv to get it to overwrite settings from env.
    dotenv::from_path(".env").ok();

    let mut builder = config::Config::builder();
    if config_path.exists() {
        debug!("Reading settings from {}", config_path.display());
        builder = builder.add_source(config::File::from(config_path.canonicalize()?));
    }
    builder = builder.add_source(
        config::Environment::with_prefix("APP")
            .separator("__")
            .try_parsing(true),
    );

    let raw_settings = builder.build()?.try_deserialize::<RawSettings>()?;
    let settings: AppSettings = raw_settings.into();

    fs::create_dir_all(&settings.jobs.jobs_dir)?;

    Ok(settings)
}
