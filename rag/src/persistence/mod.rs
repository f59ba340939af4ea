//! Snapshot persistence for RAG indexes.
//!
//! An index is persisted as an immutable, versioned [`Snapshot`]. The
//! [`SnapshotStore`] trait abstracts where snapshots live; [`DirectorySnapshotStore`]
//! keeps them on the local filesystem and promotes new ones atomically.

mod codec;
mod directory;

pub use directory::DirectorySnapshotStore;

use std::path::PathBuf;

use time::OffsetDateTime;

use crate::error::Result;
use crate::index::{FlatIndex, VectorIndex};

/// A promoted, read-only index together with its version and build time.
#[derive(Clone, Debug, PartialEq)]
pub struct Snapshot {
    version: u64,
    built_at: OffsetDateTime,
    index: FlatIndex,
}

impl Snapshot {
    /// Wraps a built index.
    #[must_use]
    pub const fn new(version: u64, built_at: OffsetDateTime, index: FlatIndex) -> Self {
        Self {
            version,
            built_at,
            index,
        }
    }

    /// Monotonic version number.
    #[must_use]
    pub const fn version(&self) -> u64 {
        self.version
    }

    /// When the snapshot was written.
    #[must_use]
    pub const fn built_at(&self) -> OffsetDateTime {
        self.built_at
    }

    /// The searchable index.
    #[must_use]
    pub const fn index(&self) -> &FlatIndex {
        &self.index
    }

    /// Embedding dimension of the index.
    #[must_use]
    pub fn dimension(&self) -> usize {
        self.index.dimension()
    }
}

/// Identifies a snapshot that was just written.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SnapshotHandle {
    /// Version assigned to the snapshot.
    pub version: u64,
    /// Time stamped into the manifest.
    pub built_at: OffsetDateTime,
    /// Where the snapshot lives.
    pub path: PathBuf,
}

/// Storage for index snapshots.
///
/// Implementations must make [`save`](Self::save) atomic with respect to
/// [`load`](Self::load): a loader observes either the previous snapshot or the new one
/// in full, never a mixture.
pub trait SnapshotStore: Send + Sync + 'static {
    /// Persists `index` as a new snapshot and makes it the current one.
    ///
    /// An `Err` means the current snapshot did not change. Once the new snapshot is
    /// current, housekeeping failures are logged and `Ok` is returned.
    fn save(&self, index: &FlatIndex) -> Result<SnapshotHandle>;

    /// Loads the current snapshot, or `None` when nothing was saved yet.
    fn load(&self) -> Result<Option<Snapshot>>;
}
