//! Filesystem snapshot store with atomic promotion.
//!
//! Layout under the root directory:
//!
//! ```text
//! CURRENT                  version of the promoted snapshot
//! snapshot-000007/
//!     manifest.json        version, build time, dimension, count, checksums
//!     vectors.rkyv         flat vector array
//!     chunks.json          chunk metadata, parallel to the vectors
//! ```
//!
//! A save writes into a hidden staging directory, renames it into place and only then
//! swaps `CURRENT`, so readers never observe a partially written snapshot.

use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use time::OffsetDateTime;
use tracing::{debug, warn};

use crate::error::{RagError, Result};
use crate::index::{FlatIndex, VectorIndex};
use crate::types::Chunk;

use super::codec::{self, FORMAT_VERSION, Manifest};
use super::{Snapshot, SnapshotHandle, SnapshotStore};

const CURRENT: &str = "CURRENT";
const CURRENT_TMP: &str = "CURRENT.tmp";
const MANIFEST: &str = "manifest.json";
const VECTORS: &str = "vectors.rkyv";
const CHUNKS: &str = "chunks.json";
const SNAPSHOT_PREFIX: &str = "snapshot-";
const STAGING_PREFIX: &str = ".staging-";

/// Minimum number of snapshots kept, so a reader racing a save still finds its files.
const MIN_RETAINED: usize = 2;

/// Snapshot store backed by a local directory.
///
/// # Example
///
/// ```rust,no_run
/// use quarry_rag::index::FlatIndex;
/// use quarry_rag::persistence::{DirectorySnapshotStore, SnapshotStore};
///
/// let store = DirectorySnapshotStore::new("./quarry_index");
/// let handle = store.save(&FlatIndex::new(384))?;
/// let snapshot = store.load()?.expect("just saved");
/// assert_eq!(snapshot.version(), handle.version);
/// # Ok::<(), quarry_rag::RagError>(())
/// ```
#[derive(Debug, Clone)]
pub struct DirectorySnapshotStore {
    root: PathBuf,
    retain: usize,
}

impl DirectorySnapshotStore {
    /// Creates a store rooted at `root`, keeping three snapshots.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            retain: 3,
        }
    }

    /// Sets how many snapshots are kept; values below two are raised to two.
    #[must_use]
    pub fn with_retention(mut self, retain: usize) -> Self {
        self.retain = retain.max(MIN_RETAINED);
        self
    }

    /// The root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Version named by the `CURRENT` pointer.
    ///
    /// # Errors
    ///
    /// Fails if the pointer exists but cannot be read or parsed.
    pub fn current_version(&self) -> Result<Option<u64>> {
        let path = self.root.join(CURRENT);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(RagError::persistence(path, err)),
        };
        text.trim().parse::<u64>().map(Some).map_err(|_| {
            RagError::Serialization(format!("{} does not hold a version number", path.display()))
        })
    }

    /// Versions of all snapshot directories present, ascending.
    ///
    /// # Errors
    ///
    /// Fails if the root directory cannot be listed.
    pub fn versions(&self) -> Result<Vec<u64>> {
        let mut versions = Vec::new();
        for name in self.entry_names()? {
            if let Some(version) = name
                .strip_prefix(SNAPSHOT_PREFIX)
                .and_then(|v| v.parse::<u64>().ok())
            {
                versions.push(version);
            }
        }
        versions.sort_unstable();
        Ok(versions)
    }

    fn snapshot_dir(&self, version: u64) -> PathBuf {
        self.root.join(format!("{SNAPSHOT_PREFIX}{version:06}"))
    }

    fn entry_names(&self) -> Result<Vec<String>> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(RagError::persistence(&self.root, err)),
        };
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| RagError::persistence(&self.root, e))?;
            if let Ok(name) = entry.file_name().into_string() {
                names.push(name);
            }
        }
        Ok(names)
    }

    fn remove_stale_staging(&self) -> Result<()> {
        for name in self.entry_names()? {
            if name.starts_with(STAGING_PREFIX) {
                let path = self.root.join(&name);
                warn!(path = %path.display(), "removing staging directory left by an interrupted save");
                fs::remove_dir_all(&path).map_err(|e| RagError::persistence(path, e))?;
            }
        }
        Ok(())
    }

    /// Removes snapshots beyond the retention count, oldest first.
    ///
    /// Runs after promotion, so failures are logged and never reported to the caller.
    fn prune(&self, current: u64) {
        let versions = match self.versions() {
            Ok(versions) => versions,
            Err(err) => {
                warn!(error = %err, "cannot list snapshots for pruning");
                return;
            }
        };
        let excess = versions.len().saturating_sub(self.retain);
        for &version in versions.iter().take(excess) {
            if version == current {
                continue;
            }
            let path = self.snapshot_dir(version);
            debug!(version, "pruning old snapshot");
            if let Err(err) = fs::remove_dir_all(&path) {
                warn!(version, path = %path.display(), error = %err, "failed to prune snapshot");
            }
        }
    }

    /// Points `CURRENT` at `version`. The snapshot is committed once the rename succeeds.
    fn promote(&self, version: u64) -> Result<()> {
        let tmp = self.root.join(CURRENT_TMP);
        write_synced(&tmp, version.to_string().as_bytes())?;
        let current = self.root.join(CURRENT);
        fs::rename(&tmp, &current).map_err(|e| RagError::persistence(current, e))?;
        if let Err(err) = sync_dir(&self.root) {
            warn!(version, error = %err, "snapshot promoted but the directory sync failed");
        }
        Ok(())
    }

    fn read_file(dir: &Path, name: &str) -> Result<Vec<u8>> {
        let path = dir.join(name);
        fs::read(&path).map_err(|e| RagError::persistence(path, e))
    }
}

impl SnapshotStore for DirectorySnapshotStore {
    fn save(&self, index: &FlatIndex) -> Result<SnapshotHandle> {
        fs::create_dir_all(&self.root).map_err(|e| RagError::persistence(&self.root, e))?;
        self.remove_stale_staging()?;

        let newest_dir = self.versions()?.last().copied().unwrap_or(0);
        let version = newest_dir.max(self.current_version()?.unwrap_or(0)) + 1;
        let built_at = OffsetDateTime::now_utc();

        let vectors = codec::encode_vectors(index.dimension(), index.vectors())?;
        let chunks = serde_json::to_vec(index.chunks())?;
        let manifest = Manifest {
            format_version: FORMAT_VERSION,
            version,
            built_at: codec::format_timestamp(built_at)?,
            dimension: index.dimension(),
            count: index.len(),
            vectors_checksum: codec::checksum(&vectors),
            chunks_checksum: codec::checksum(&chunks),
        };

        let staging = self.root.join(format!("{STAGING_PREFIX}{version}"));
        fs::create_dir(&staging).map_err(|e| RagError::persistence(&staging, e))?;
        write_synced(&staging.join(VECTORS), &vectors)?;
        write_synced(&staging.join(CHUNKS), &chunks)?;
        write_synced(&staging.join(MANIFEST), &serde_json::to_vec_pretty(&manifest)?)?;
        sync_dir(&staging)?;

        let target = self.snapshot_dir(version);
        fs::rename(&staging, &target).map_err(|e| RagError::persistence(&target, e))?;
        sync_dir(&self.root)?;
        self.promote(version)?;
        debug!(version, count = index.len(), path = %target.display(), "snapshot written");

        self.prune(version);
        Ok(SnapshotHandle {
            version,
            built_at,
            path: target,
        })
    }

    fn load(&self) -> Result<Option<Snapshot>> {
        let Some(version) = self.current_version()? else {
            return Ok(None);
        };
        let dir = self.snapshot_dir(version);
        let corrupt = |reason: String| RagError::CorruptSnapshot { version, reason };

        let manifest: Manifest = serde_json::from_slice(&Self::read_file(&dir, MANIFEST)?)?;
        if manifest.format_version != FORMAT_VERSION {
            return Err(corrupt(format!(
                "unsupported format version {}",
                manifest.format_version
            )));
        }
        if manifest.version != version {
            return Err(corrupt(format!(
                "manifest names version {}",
                manifest.version
            )));
        }

        let vectors = Self::read_file(&dir, VECTORS)?;
        if codec::checksum(&vectors) != manifest.vectors_checksum {
            return Err(corrupt(format!("{VECTORS} checksum mismatch")));
        }
        let chunks = Self::read_file(&dir, CHUNKS)?;
        if codec::checksum(&chunks) != manifest.chunks_checksum {
            return Err(corrupt(format!("{CHUNKS} checksum mismatch")));
        }

        let (dimension, values) = codec::decode_vectors(&vectors)?;
        let chunks: Vec<Chunk> = serde_json::from_slice(&chunks)?;
        if dimension != manifest.dimension {
            return Err(corrupt(format!(
                "vectors have dimension {dimension}, manifest says {}",
                manifest.dimension
            )));
        }
        if chunks.len() != manifest.count {
            return Err(corrupt(format!(
                "{} chunks stored, manifest says {}",
                chunks.len(),
                manifest.count
            )));
        }
        let index = FlatIndex::from_parts(dimension, values, chunks)
            .map_err(|e| corrupt(e.to_string()))?;

        debug!(version, count = index.len(), "snapshot loaded");
        Ok(Some(Snapshot::new(
            version,
            codec::parse_timestamp(&manifest.built_at)?,
            index,
        )))
    }
}

fn write_synced(path: &Path, bytes: &[u8]) -> Result<()> {
    let write = || -> std::io::Result<()> {
        let mut file = File::create(path)?;
        file.write_all(bytes)?;
        file.sync_all()
    };
    write().map_err(|e| RagError::persistence(path, e))
}

#[cfg(unix)]
fn sync_dir(path: &Path) -> Result<()> {
    File::open(path)
        .and_then(|dir| dir.sync_all())
        .map_err(|e| RagError::persistence(path, e))
}

#[cfg(not(unix))]
#[allow(clippy::unnecessary_wraps)]
fn sync_dir(_path: &Path) -> Result<()> {
    Ok(())
}
