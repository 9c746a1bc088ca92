//! Safe extraction of uploaded zip bundles into a job's input directory.
//!
//! Every entry is validated before the first byte is written, so a rejected bundle leaves no
//! extracted files behind.

use crate::utils::is_within;
use std::fs::{self, File};
use std::io::{self, BufReader, Read, Seek};
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};
use zip::ZipArchive;
use zip::result::ZipError;

/// Folder macOS adds to zips for resource forks. Its entries are skipped.
const METADATA_DIR: &str = "__MACOSX";

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("uploaded file is not a zip archive: {0}")]
    InvalidArchive(String),

    #[error("unsafe path in archive: {0}")]
    UnsafeExtractionTarget(String),

    #[error("archive I/O error: {0}")]
    Io(#[from] io::Error),
}

impl From<ZipError> for ArchiveError {
    fn from(err: ZipError) -> Self {
        match err {
            ZipError::Io(e) => Self::Io(e),
            other => Self::InvalidArchive(other.to_string()),
        }
    }
}

/// An entry that passed validation, with its final location.
struct PlannedEntry {
    index: usize,
    destination: PathBuf,
}

/// Extracts the zip at `archive_path` into `out_dir` and returns the number of files written.
///
/// Directory entries and `__MACOSX/` entries are skipped. Any entry whose name is absolute or
/// contains a `..` segment, or whose destination resolves outside `out_dir`, rejects the
/// whole archive.
pub fn extract_archive(archive_path: &Path, out_dir: &Path) -> Result<usize, ArchiveError> {
    let file = File::open(archive_path)?;
    let mut archive = ZipArchive::new(BufReader::new(file))
        .map_err(|e| ArchiveError::InvalidArchive(e.to_string()))?;

    fs::create_dir_all(out_dir)?;

    let planned = plan_entries(&mut archive, out_dir)?;
    for entry in &planned {
        let mut source = archive.by_index(entry.index)?;
        if let Some(parent) = entry.destination.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut target = File::create(&entry.destination)?;
        io::copy(&mut source, &mut target)?;
        debug!("Extracted {}", entry.destination.display());
    }

    info!(
        "Extracted {} entries from {} into {}",
        planned.len(),
        archive_path.display(),
        out_dir.display()
    );
    Ok(planned.len())
}

fn plan_entries<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    out_dir: &Path,
) -> Result<Vec<PlannedEntry>, ArchiveError> {
    let mut planned = Vec::new();

    for index in 0..archive.len() {
        let entry = archive.by_index(index)?;
        if entry.is_dir() {
            continue;
        }
        let name = entry.name().to_owned();
        let Some(relative) = safe_relative_path(&name)? else {
            continue;
        };

        let destination = out_dir.join(&relative);
        if !is_within(&destination, out_dir) {
            return Err(ArchiveError::UnsafeExtractionTarget(name));
        }
        planned.push(PlannedEntry { index, destination });
    }

    Ok(planned)
}

/// Turns an entry name into a relative path.
///
/// Returns `Ok(None)` for entries that should be skipped silently.
fn safe_relative_path(name: &str) -> Result<Option<PathBuf>, ArchiveError> {
    let normalized = name.replace('\\', "/");
    let mut relative = PathBuf::new();

    for component in Path::new(&normalized).components() {
        match component {
            Component::Normal(part) => relative.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(ArchiveError::UnsafeExtractionTarget(name.to_owned()));
            }
        }
    }

    let skipped = match relative.components().next() {
        None => true,
        Some(first) => first.as_os_str() == METADATA_DIR,
    };
    Ok((!skipped).then_some(relative))
}
