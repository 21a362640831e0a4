use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use anyhow::{Context, Result};
use log::{debug, error};
use serde::{Deserialize, Serialize};

/// What to do with a source file once it has been encoded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispositionMode {
    /// Remove the source
    Delete,
    /// Move the source into this directory; relative paths are resolved
    /// against the source file's own directory
    Move(PathBuf),
    /// Leave the source where it is (preview runs)
    #[serde(alias = "none")]
    Keep,
}

/// Outcome of disposing of one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    Deleted,
    Moved(PathBuf),
    /// Nothing was done on purpose
    Kept,
    /// Disposition was attempted and abandoned; the source is still in place
    Failed(String),
}

impl Disposition {
    /// Only a source that left the tree counts as completed
    pub fn is_completed(&self) -> bool {
        matches!(self, Disposition::Deleted | Disposition::Moved(_))
    }
}

/// Directory a source file is moved into
pub fn resolve_move_dir(source: &Path, move_dir: &Path) -> PathBuf {
    if move_dir.is_absolute() {
        move_dir.to_path_buf()
    } else {
        source.parent().unwrap_or_else(|| Path::new("")).join(move_dir)
    }
}

/// Rename, falling back to copy and remove across filesystems
fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(rename_err) => {
            debug!("rename {} failed ({}), copying instead", from.display(), rename_err);
            fs::copy(from, to)?;
            fs::remove_file(from)
        }
    }
}

/// Delete or move a source file after a successful encode.
///
/// Delete errors propagate. Move problems are logged and reported as
/// [`Disposition::Failed`] so the caller can carry on with the next file.
pub fn dispose(source: &Path, mode: &DispositionMode) -> Result<Disposition> {
    match mode {
        DispositionMode::Delete => {
            debug!("Deleting {}", source.display());
            fs::remove_file(source).with_context(|| format!("Failed to delete {}", source.display()))?;
            Ok(Disposition::Deleted)
        }
        DispositionMode::Move(move_dir) => {
            let target_dir = resolve_move_dir(source, move_dir);
            if !target_dir.is_dir() {
                debug!("Creating dir {}", target_dir.display());
                if let Err(e) = fs::create_dir_all(&target_dir) {
                    let reason = format!("Failed to create {}: {}", target_dir.display(), e);
                    error!("{}", reason);
                    return Ok(Disposition::Failed(reason));
                }
            }

            let file_name = source
                .file_name()
                .with_context(|| format!("Source has no file name: {}", source.display()))?;
            let dest = target_dir.join(file_name);

            debug!("Moving {} to {}", source.display(), dest.display());
            match move_file(source, &dest) {
                Ok(()) => Ok(Disposition::Moved(dest)),
                Err(e) => {
                    let reason = format!("Failed to move {} to {}: {}", source.display(), dest.display(), e);
                    error!("{}", reason);
                    Ok(Disposition::Failed(reason))
                }
            }
        }
        DispositionMode::Keep => {
            debug!("Keeping {}", source.display());
            Ok(Disposition::Kept)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(path: &Path) {
        fs::write(path, b"rip").unwrap();
    }

    #[test]
    fn test_delete_removes_source() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("a.mkv");
        touch(&src);

        let outcome = dispose(&src, &DispositionMode::Delete).unwrap();
        assert_eq!(outcome, Disposition::Deleted);
        assert!(outcome.is_completed());
        assert!(!src.exists());
    }

    #[test]
    fn test_delete_missing_file_propagates() {
        let dir = TempDir::new().unwrap();
        assert!(dispose(&dir.path().join("gone.mkv"), &DispositionMode::Delete).is_err());
    }

    #[test]
    fn test_relative_move_dir_resolves_against_source_parent() {
        let dir = TempDir::new().unwrap();
        let series = dir.path().join("Show");
        fs::create_dir(&series).unwrap();
        let src = series.join("show_s01d01_t01.mkv");
        touch(&src);

        let outcome = dispose(&src, &DispositionMode::Move(PathBuf::from("Completed"))).unwrap();

        let expected = series.join("Completed").join("show_s01d01_t01.mkv");
        assert_eq!(outcome, Disposition::Moved(expected.clone()));
        assert!(expected.exists());
        assert!(!src.exists());
        // nothing created next to the process working directory
        assert!(!dir.path().join("Completed").exists());
    }

    #[test]
    fn test_absolute_move_dir_used_as_is() {
        let dir = TempDir::new().unwrap();
        let done = dir.path().join("done");
        let src = dir.path().join("movie.mkv");
        touch(&src);

        let outcome = dispose(&src, &DispositionMode::Move(done.clone())).unwrap();
        assert_eq!(outcome, Disposition::Moved(done.join("movie.mkv")));
    }

    #[test]
    fn test_resolve_move_dir() {
        assert_eq!(
            resolve_move_dir(Path::new("/rips/TV/Show/a.mkv"), Path::new("Completed")),
            PathBuf::from("/rips/TV/Show/Completed")
        );
        assert_eq!(
            resolve_move_dir(Path::new("/rips/a.mkv"), Path::new("/archive")),
            PathBuf::from("/archive")
        );
    }

    #[test]
    fn test_move_dir_creation_failure_is_not_completed() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("movie.mkv");
        touch(&src);
        // a regular file where the directory should go
        touch(&dir.path().join("Completed"));

        let outcome = dispose(&src, &DispositionMode::Move(PathBuf::from("Completed"))).unwrap();
        assert!(matches!(outcome, Disposition::Failed(_)));
        assert!(!outcome.is_completed());
        assert!(src.exists());
    }

    #[test]
    fn test_move_failure_into_existing_dir_is_not_completed() {
        let dir = TempDir::new().unwrap();
        let done = dir.path().join("Completed");
        fs::create_dir(&done).unwrap();
        // source removed after the encode, so rename and copy both fail
        let src = dir.path().join("movie.mkv");

        let outcome = dispose(&src, &DispositionMode::Move(PathBuf::from("Completed"))).unwrap();
        assert!(matches!(outcome, Disposition::Failed(ref reason) if reason.contains("Failed to move")));
        assert!(!outcome.is_completed());
        assert!(!done.join("movie.mkv").exists());
    }

    #[test]
    fn test_keep_does_nothing() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("movie.mkv");
        touch(&src);

        let outcome = dispose(&src, &DispositionMode::Keep).unwrap();
        assert_eq!(outcome, Disposition::Kept);
        assert!(!outcome.is_completed());
        assert!(src.exists());
    }
}
