use app_state::AnalysisSettings;
use color_eyre::eyre::{Context, bail};
use color_eyre::Result;
use common_services::archive::extract_archive;
use std::fs;
use std::path::Path;
use tracing::{debug, info};
use walkdir::WalkDir;

/// Fills `input_dir` from a zip bundle, a directory of photos or a single photo.
///
/// Returns how many files were placed.
pub fn stage_input(source: &Path, input_dir: &Path, analysis: &AnalysisSettings) -> Result<usize> {
    fs::create_dir_all(input_dir)?;

    if source.is_dir() {
        return copy_images(source, input_dir, analysis);
    }
    if !source.is_file() {
        bail!("input {} does not exist", source.display());
    }

    let is_zip = source
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("zip"));
    if is_zip {
        let count = extract_archive(source, input_dir)?;
        info!("Extracted {count} files from {}", source.display());
        return Ok(count);
    }

    let Some(file_name) = source.file_name() else {
        bail!("input {} has no file name", source.display());
    };
    fs::copy(source, input_dir.join(file_name))
        .wrap_err_with(|| format!("Failed to copy {}", source.display()))?;
    Ok(1)
}

/// Copies every photo under `source`, keeping its relative path.
fn copy_images(source: &Path, input_dir: &Path, analysis: &AnalysisSettings) -> Result<usize> {
    let mut copied = 0;
    for entry in WalkDir::new(source).into_iter().filter_map(Result::ok) {
        if !entry.file_type().is_file() || !analysis.is_image_file(entry.path()) {
            continue;
        }
        let relative = entry.path().strip_prefix(source)?;
        let destination = input_dir.join(relative);
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(entry.path(), &destination)
            .wrap_err_with(|| format!("Failed to copy {}", entry.path().display()))?;
        debug!("Staged {}", relative.display());
        copied += 1;
    }
    info!("Copied {copied} photos from {}", source.display());
    Ok(copied)
}
