use std::path::{Path, PathBuf};
use log::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

/// Immediate children of `dir`, sorted by name; unreadable entries are logged and skipped
fn children(dir: &Path) -> Vec<DirEntry> {
    if !dir.is_dir() {
        warn!("Directory does not exist: {}", dir.display());
        return Vec::new();
    }

    let mut entries = Vec::new();
    let walker = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(false)
        .sort_by_file_name();
    for entry in walker {
        match entry {
            Ok(e) => entries.push(e),
            Err(e) => warn!("Error reading directory entry: {}", e),
        }
    }
    entries
}

fn is_file(entry: &DirEntry) -> bool {
    // follow symlinked files, the listing itself does not recurse
    entry.path().is_file()
}

/// Files directly inside the movies root
pub fn list_movie_files(root: &Path) -> Vec<PathBuf> {
    info!("Scanning movies in {}", root.display());
    let files: Vec<PathBuf> = children(root)
        .into_iter()
        .filter(is_file)
        .map(|e| e.into_path())
        .collect();
    debug!("Found {} files in {}", files.len(), root.display());
    files
}

/// One directory per series under the TV root
pub fn list_series_dirs(tv_root: &Path) -> Vec<PathBuf> {
    info!("Scanning series in {}", tv_root.display());
    children(tv_root)
        .into_iter()
        .filter(|e| e.path().is_dir())
        .map(|e| e.into_path())
        .collect()
}

/// Names of the files inside a series directory
pub fn list_file_names(dir: &Path) -> Vec<String> {
    children(dir)
        .into_iter()
        .filter(is_file)
        .filter_map(|e| match e.file_name().to_str() {
            Some(name) => Some(name.to_string()),
            None => {
                warn!("Skipping non UTF-8 file name: {}", e.path().display());
                None
            }
        })
        .collect()
}
