//! Builders for on-disk message fixtures.
//!
//! Every helper returns the [`TempDir`] that owns the files; keep it alive for
//! as long as the test needs them.

use std::fs;
use std::path::PathBuf;

use tempfile::TempDir;

/// Creates a temporary directory holding the given `(file name, contents)` pairs.
///
/// # Example
///
/// ```
/// use test_utils::message_dir;
///
/// let dir = message_dir(&[("a.txt", "alpha"), ("b.json", "{}")]);
/// assert!(dir.path().join("a.txt").exists());
/// ```
pub fn message_dir(files: &[(&str, &str)]) -> TempDir {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    for (name, contents) in files {
        fs::write(dir.path().join(name), contents).expect("failed to write message file");
    }
    dir
}

/// Creates a temporary directory with one message file and returns both.
pub fn message_file(name: &str, contents: &str) -> (TempDir, PathBuf) {
    let dir = message_dir(&[(name, contents)]);
    let path = dir.path().join(name);
    (dir, path)
}

/// Creates `count` numbered `.txt` files whose contents are `message-<n>`.
pub fn numbered_messages(count: usize) -> TempDir {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    for n in 0..count {
        fs::write(
            dir.path().join(format!("message-{n:03}.txt")),
            numbered_payload(n),
        )
        .expect("failed to write message file");
    }
    dir
}

/// Contents written by [`numbered_messages`] for file `n`.
pub fn numbered_payload(n: usize) -> String {
    format!("message-{n}")
}
