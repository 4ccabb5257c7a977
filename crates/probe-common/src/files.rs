//! File access used to resolve message content.

use std::path::{Path, PathBuf};

use rand::seq::SliceRandom;
use tracing::trace;
use walkdir::WalkDir;

use crate::error::{ProbeError, ProbeResult};

/// Reads message files and picks random ones from a directory.
pub trait FileServer {
    /// Read the whole file as text.
    fn read_full_text(&self, path: &Path) -> ProbeResult<String>;

    /// Pick a random regular file in `directory` whose name ends with one of
    /// `suffixes`. Subdirectories are not searched.
    fn pick_random_file(&self, directory: &Path, suffixes: &[&str]) -> ProbeResult<PathBuf>;
}

/// [`FileServer`] backed by the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFileServer;

impl FileServer for LocalFileServer {
    fn read_full_text(&self, path: &Path) -> ProbeResult<String> {
        trace!(path = %path.display(), "Reading message file");
        std::fs::read_to_string(path).map_err(|e| ProbeError::content(path.display().to_string(), e))
    }

    fn pick_random_file(&self, directory: &Path, suffixes: &[&str]) -> ProbeResult<PathBuf> {
        let candidates = list_matching_files(directory, suffixes)?;
        candidates
            .choose(&mut rand::thread_rng())
            .cloned()
            .ok_or_else(|| {
                ProbeError::content(
                    directory.display().to_string(),
                    format!("no files matching {:?}", suffixes),
                )
            })
    }
}

/// List regular files directly under `directory` matching any suffix,
/// sorted by path.
pub fn list_matching_files(directory: &Path, suffixes: &[&str]) -> ProbeResult<Vec<PathBuf>> {
    let dir_label = || directory.display().to_string();

    if !directory.is_dir() {
        return Err(ProbeError::content(dir_label(), "not a directory"));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(directory).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|e| ProbeError::content(dir_label(), e))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_lowercase();
        if suffixes.iter().any(|s| name.ends_with(&s.to_lowercase())) {
            files.push(entry.into_path());
        }
    }
    files.sort();
    Ok(files)
}
