// crates/walk/src/entry.rs
use crate::PathKey;
use filetime::FileTime;

/// Fingerprint used to match files across trees.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Metadata {
    pub size: u64,
    pub mtime: FileTime,
}

impl Metadata {
    pub fn new(size: u64, mtime: FileTime) -> Self {
        Self { size, mtime }
    }

    /// Drops sub-second precision.
    #[must_use]
    pub fn truncated(self) -> Self {
        Self {
            mtime: FileTime::from_unix_time(self.mtime.unix_seconds(), 0),
            ..self
        }
    }
}

/// A single item yielded by [`crate::TreeScanner`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Entry {
    File { key: PathKey, meta: Metadata },
    NonEmptyDir { key: PathKey },
    EmptyDir { key: PathKey },
}

impl Entry {
    pub fn key(&self) -> &PathKey {
        match self {
            Entry::File { key, .. } | Entry::NonEmptyDir { key } | Entry::EmptyDir { key } => key,
        }
    }

    pub fn is_dir(&self) -> bool {
        !matches!(self, Entry::File { .. })
    }
}
