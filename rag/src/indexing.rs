//! Directory scanning and build progress reporting.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::debug;
use walkdir::WalkDir;

use crate::error::Result;

/// Progress update during a build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildProgress {
    /// Number of documents handled so far.
    pub processed: usize,
    /// Total number of documents discovered.
    pub total: usize,
    /// Document currently being handled, if any.
    pub current: Option<String>,
    /// Current stage of the build.
    pub stage: BuildStage,
}

impl BuildProgress {
    /// Creates a new progress update.
    #[must_use]
    pub const fn new(
        processed: usize,
        total: usize,
        current: Option<String>,
        stage: BuildStage,
    ) -> Self {
        Self {
            processed,
            total,
            current,
            stage,
        }
    }
}

/// Stages of a build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "stage")]
pub enum BuildStage {
    /// Scanning the source directory for documents.
    Scanning,
    /// Extracting text from the current document.
    Parsing,
    /// Embedding the current document's chunks.
    Embedding {
        /// Chunks embedded so far for this document.
        done: usize,
        /// Chunks in this document.
        total: usize,
    },
    /// Adding chunks to the index.
    Indexing,
    /// Writing the snapshot to disk.
    Saving,
    /// The build finished.
    Done,
    /// Document was skipped.
    Skipped {
        /// Reason the document was skipped.
        reason: String,
    },
}

/// Collects all regular, non-hidden files below `root`, sorted by path.
///
/// Hidden entries (names starting with `.`) are skipped, including whole hidden
/// directories. Symbolic links to files are collected; links to directories are not
/// descended into. Entries that vanish or cannot be inspected during the walk are ignored.
///
/// # Errors
///
/// Fails if `root` itself cannot be read.
pub fn collect_files(root: &Path) -> Result<Vec<PathBuf>> {
    fs::read_dir(root)?;
    let mut files = Vec::new();

    let walker = WalkDir::new(root)
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry.path()));
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(error) => {
                debug!(%error, "skipping unreadable entry");
                continue;
            }
        };
        let file_type = entry.file_type();
        if file_type.is_file()
            || (file_type.is_symlink() && fs::metadata(entry.path()).is_ok_and(|m| m.is_file()))
        {
            files.push(entry.into_path());
        }
    }

    files.sort();
    Ok(files)
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with('.'))
}

/// Document identifier for `path`: its path below `root`, with `/` separators.
pub(crate) fn document_id(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|part| part.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn collect_files_from_directory() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("file2.txt"), "content2").unwrap();
        fs::write(dir.path().join("file1.txt"), "content1").unwrap();

        let subdir = dir.path().join("subdir");
        fs::create_dir(&subdir).unwrap();
        fs::write(subdir.join("file3.txt"), "content3").unwrap();

        let files = collect_files(dir.path()).unwrap();
        let ids: Vec<_> = files.iter().map(|f| document_id(dir.path(), f)).collect();
        assert_eq!(ids, vec!["file1.txt", "file2.txt", "subdir/file3.txt"]);
    }

    #[test]
    fn hidden_entries_are_skipped() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(".secret.txt"), "hidden").unwrap();
        fs::write(dir.path().join("visible.txt"), "shown").unwrap();
        let hidden_dir = dir.path().join(".cache");
        fs::create_dir(&hidden_dir).unwrap();
        fs::write(hidden_dir.join("inner.txt"), "hidden too").unwrap();

        let files = collect_files(dir.path()).unwrap();
        assert_eq!(files, vec![dir.path().join("visible.txt")]);
    }

    #[test]
    fn collect_files_empty_directory() {
        let dir = tempdir().unwrap();
        assert!(collect_files(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn missing_root_is_an_error() {
        let dir = tempdir().unwrap();
        assert!(collect_files(&dir.path().join("nope")).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn directory_links_are_not_followed() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("manual.txt"), "content").unwrap();
        let nested = dir.path().join("nested");
        fs::create_dir(&nested).unwrap();
        std::os::unix::fs::symlink(dir.path(), nested.join("loop")).unwrap();

        let files = collect_files(dir.path()).unwrap();
        assert_eq!(files, vec![dir.path().join("manual.txt")]);
    }

    #[cfg(unix)]
    #[test]
    fn file_links_are_collected() {
        let dir = tempdir().unwrap();
        let outside = tempdir().unwrap();
        fs::write(outside.path().join("shared.txt"), "content").unwrap();
        std::os::unix::fs::symlink(outside.path().join("shared.txt"), dir.path().join("link.txt"))
            .unwrap();

        let files = collect_files(dir.path()).unwrap();
        assert_eq!(files, vec![dir.path().join("link.txt")]);
    }

    #[test]
    fn progress_creation() {
        let progress = BuildProgress::new(
            5,
            10,
            Some("manual.pdf".into()),
            BuildStage::Embedding { done: 32, total: 64 },
        );
        assert_eq!(progress.processed, 5);
        assert_eq!(progress.total, 10);
        assert!(progress.current.is_some());
    }
}
