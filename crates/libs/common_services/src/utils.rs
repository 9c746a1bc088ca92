use app_state::{AnalysisSettings, to_posix_string};
use path_clean::PathClean;
use std::io;
use std::path::{Path, PathBuf, absolute};
use walkdir::WalkDir;

/// Path of `path` relative to `base` with `/` separators, or the absolute path if it is not
/// below `base`.
#[must_use]
pub fn rel_or_abs(path: &Path, base: &Path) -> String {
    let resolved_path = resolve_lenient(path).unwrap_or_else(|_| path.to_path_buf());
    let resolved_base = resolve_lenient(base).unwrap_or_else(|_| base.to_path_buf());
    match resolved_path.strip_prefix(&resolved_base) {
        Ok(relative) => to_posix_string(relative),
        Err(_) => to_posix_string(path),
    }
}

/// Resolves a path that may not exist yet.
///
/// The deepest existing ancestor is canonicalized (following symlinks) and the remaining,
/// not-yet-existing components are appended lexically.
pub fn resolve_lenient(path: &Path) -> io::Result<PathBuf> {
    let full = absolute(path)?.clean();
    let mut existing = full.as_path();
    let mut missing = Vec::new();

    loop {
        match existing.canonicalize() {
            Ok(mut resolved) => {
                for part in missing.iter().rev() {
                    resolved.push(part);
                }
                return Ok(resolved.clean());
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                let (Some(name), Some(parent)) = (existing.file_name(), existing.parent()) else {
                    return Ok(full);
                };
                missing.push(name.to_owned());
                existing = parent;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Whether `path`, once resolved, lies inside `base` (or is `base` itself).
#[must_use]
pub fn is_within(path: &Path, base: &Path) -> bool {
    match (resolve_lenient(path), resolve_lenient(base)) {
        (Ok(path), Ok(base)) => path.starts_with(base),
        _ => false,
    }
}

/// All image files below `root`, recursively, in sorted path order.
#[must_use]
pub fn list_images(root: &Path, analysis: &AnalysisSettings) -> Vec<PathBuf> {
    let mut images: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file() && analysis.is_image_file(entry.path()))
        .map(walkdir::DirEntry::into_path)
        .collect();
    images.sort();
    images
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn lists_images_recursively_in_sorted_order() -> io::Result<()> {
        let dir = tempfile::tempdir()?;
        let root = dir.path();
        fs::create_dir_all(root.join("aisle/left"))?;
        fs::write(root.join("b.JPG"), b"x")?;
        fs::write(root.join("a.png"), b"x")?;
        fs::write(root.join("aisle/left/c.webp"), b"x")?;
        fs::write(root.join("readme.txt"), b"x")?;
        fs::create_dir_all(root.join("folder.jpg"))?;

        let images = list_images(root, &AnalysisSettings::default());

        assert_eq!(
            images,
            vec![
                root.join("a.png"),
                root.join("aisle/left/c.webp"),
                root.join("b.JPG"),
            ]
        );
        Ok(())
    }

    #[test]
    fn missing_root_has_no_images() {
        let images = list_images(Path::new("/definitely/not/here"), &AnalysisSettings::default());
        assert!(images.is_empty());
    }

    #[test]
    fn containment_handles_missing_paths_and_parent_segments() -> io::Result<()> {
        let dir = tempfile::tempdir()?;
        let base = dir.path().join("job");
        fs::create_dir_all(&base)?;

        assert!(is_within(&base.join("input/new/file.jpg"), &base));
        assert!(is_within(&base, &base));
        assert!(!is_within(&base.join("../escape.jpg"), &base));
        assert!(!is_within(Path::new("/etc/passwd"), &base));
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn containment_follows_symlinks() -> io::Result<()> {
        let dir = tempfile::tempdir()?;
        let base = dir.path().join("job");
        let outside = dir.path().join("outside");
        fs::create_dir_all(&base)?;
        fs::create_dir_all(&outside)?;
        std::os::unix::fs::symlink(&outside, base.join("link"))?;

        assert!(!is_within(&base.join("link/file.jpg"), &base));
        Ok(())
    }

    #[test]
    fn relative_paths_use_forward_slashes() -> io::Result<()> {
        let dir = tempfile::tempdir()?;
        let base = dir.path();
        fs::create_dir_all(base.join("crops"))?;
        let crop = base.join("crops").join("a.jpg");
        fs::write(&crop, b"x")?;

        assert_eq!(rel_or_abs(&crop, base), "crops/a.jpg");
        assert_eq!(rel_or_abs(Path::new("/elsewhere/x.jpg"), base), "/elsewhere/x.jpg");
        Ok(())
    }
}
