//! File server wrapper that counts storage access.

use std::cell::{Cell, RefCell};
use std::path::{Path, PathBuf};

use probe_common::{FileServer, LocalFileServer, ProbeResult};

/// Delegates to an inner [`FileServer`] and records every call.
#[derive(Debug, Default)]
pub struct CountingFileServer<F = LocalFileServer> {
    inner: F,
    reads: RefCell<Vec<PathBuf>>,
    picks: Cell<usize>,
}

impl CountingFileServer<LocalFileServer> {
    pub fn new() -> Self {
        Self::wrap(LocalFileServer)
    }
}

impl<F: FileServer> CountingFileServer<F> {
    pub fn wrap(inner: F) -> Self {
        Self {
            inner,
            reads: RefCell::new(Vec::new()),
            picks: Cell::new(0),
        }
    }

    /// Number of `read_full_text` calls, successful or not.
    pub fn read_count(&self) -> usize {
        self.reads.borrow().len()
    }

    /// Number of reads of one particular path.
    pub fn reads_of(&self, path: &Path) -> usize {
        self.reads.borrow().iter().filter(|p| p.as_path() == path).count()
    }

    pub fn pick_count(&self) -> usize {
        self.picks.get()
    }
}

impl<F: FileServer> FileServer for CountingFileServer<F> {
    fn read_full_text(&self, path: &Path) -> ProbeResult<String> {
        self.reads.borrow_mut().push(path.to_path_buf());
        self.inner.read_full_text(path)
    }

    fn pick_random_file(&self, directory: &Path, suffixes: &[&str]) -> ProbeResult<PathBuf> {
        self.picks.set(self.picks.get() + 1);
        self.inner.pick_random_file(directory, suffixes)
    }
}
