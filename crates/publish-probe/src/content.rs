//! Message content resolution and the per-probe file cache.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::debug;

use probe_common::{FileServer, ProbeResult};

use crate::config::{MessageSource, ProbeConfig, RANDOM_FILE_SUFFIXES};

/// Cache hit/miss counters.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}

/// Contents of message files read so far, keyed by the path as given.
///
/// Entries are never invalidated: message files are expected to stay put for
/// the length of a test run. Only successful reads are stored, so an empty
/// file is a hit like any other while a failed read is retried next time.
/// Paths are not normalized; `./a.txt` and `a.txt` are separate entries.
#[derive(Debug, Default)]
pub struct FileCache {
    entries: HashMap<PathBuf, String>,
    stats: CacheStats,
}

impl FileCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached text for `path`, reading it through `files` on a miss.
    pub fn get_or_read<F: FileServer>(&mut self, path: &Path, files: &F) -> ProbeResult<String> {
        if let Some(text) = self.entries.get(path) {
            self.stats.hits += 1;
            return Ok(text.clone());
        }

        self.stats.misses += 1;
        let text = files.read_full_text(path)?;
        debug!(path = %path.display(), bytes = text.len(), "Cached message file");
        self.entries.insert(path.to_path_buf(), text.clone());
        Ok(text)
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.entries.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }
}

/// Resolves the message body for an invocation from the probe configuration.
#[derive(Debug)]
pub struct ContentResolver<F> {
    files: F,
    cache: FileCache,
}

impl<F: FileServer> ContentResolver<F> {
    pub fn new(files: F) -> Self {
        Self {
            files,
            cache: FileCache::new(),
        }
    }

    /// Resolve the message text.
    ///
    /// - `Text` returns the inline text unchanged.
    /// - `File` goes through the file cache.
    /// - `RandomFileInDirectory` picks a `.txt` file and reads it uncached.
    pub fn resolve(&mut self, config: &ProbeConfig) -> ProbeResult<String> {
        match config.message_source {
            MessageSource::Text => Ok(config.inline_text.clone()),
            MessageSource::File => self.cache.get_or_read(&config.file_path, &self.files),
            MessageSource::RandomFileInDirectory => {
                let path = self
                    .files
                    .pick_random_file(&config.random_directory, RANDOM_FILE_SUFFIXES)?;
                debug!(path = %path.display(), "Picked random message file");
                self.files.read_full_text(&path)
            }
        }
    }

    pub fn cache(&self) -> &FileCache {
        &self.cache
    }

    pub fn files(&self) -> &F {
        &self.files
    }
}
