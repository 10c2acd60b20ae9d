// crates/transport/src/path.rs
use crate::Platform;
use filetime::FileTime;
use std::fmt;
use std::io::{self, Read, Seek, SeekFrom};

/// Kind of a filesystem entry as reported by a stat call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FileKind {
    File,
    Dir,
    Symlink,
    /// Sockets, fifos and device nodes.
    Other,
}

/// Subset of `stat(2)` the engine relies on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Stat {
    pub kind: FileKind,
    pub size: u64,
    pub readonly: bool,
    pub atime: FileTime,
    pub mtime: FileTime,
}

impl Stat {
    pub fn is_dir(&self) -> bool {
        self.kind == FileKind::Dir
    }

    pub fn is_file(&self) -> bool {
        self.kind == FileKind::File
    }

    pub fn is_symlink(&self) -> bool {
        self.kind == FileKind::Symlink
    }
}

/// Child of a directory together with its `lstat` result.
#[derive(Clone, Debug)]
pub struct DirEntry<P> {
    pub path: P,
    pub name: String,
    pub stat: Stat,
}

/// Capabilities the sync engine needs from an endpoint.
///
/// Every method has the semantics of its `pathlib` or POSIX namesake. Paths
/// are values; cloning one is cheap and never touches the filesystem.
pub trait AbstractPath: Clone + fmt::Debug + fmt::Display + Sized {
    type Reader: Read + Seek;

    fn join(&self, name: &str) -> Self;

    fn parent(&self) -> Option<Self>;

    fn name(&self) -> Option<String>;

    /// Sibling of `self` called `name`.
    fn with_name(&self, name: &str) -> Self {
        match self.parent() {
            Some(parent) => parent.join(name),
            None => self.join(name),
        }
    }

    /// Separator used when rendering relative paths of this endpoint.
    fn separator(&self) -> char;

    fn platform(&self) -> Platform;

    /// Remote endpoints only keep whole-second modification times.
    fn is_remote(&self) -> bool {
        false
    }

    fn stat(&self, follow_symlinks: bool) -> io::Result<Stat>;

    fn exists(&self) -> bool {
        self.stat(false).is_ok()
    }

    fn is_dir(&self) -> bool {
        self.stat(true).map(|s| s.is_dir()).unwrap_or(false)
    }

    fn is_file(&self) -> bool {
        self.stat(true).map(|s| s.is_file()).unwrap_or(false)
    }

    fn is_symlink(&self) -> bool {
        self.stat(false).map(|s| s.is_symlink()).unwrap_or(false)
    }

    /// Canonical form used to detect symlink cycles.
    fn resolve(&self) -> io::Result<String>;

    /// Children of a directory, sorted by name.
    fn iterate(&self) -> io::Result<Vec<DirEntry<Self>>>;

    fn mkdir(&self, parents: bool, exist_ok: bool) -> io::Result<()>;

    fn rmdir(&self) -> io::Result<()>;

    fn unlink(&self) -> io::Result<()>;

    fn open(&self) -> io::Result<Self::Reader>;

    /// Atomically moves `self` over `target`, replacing an existing file.
    fn replace(&self, target: &Self) -> io::Result<()>;

    /// Relative path from `root` to `self` using [`AbstractPath::separator`].
    /// `Some("")` when both are the same path.
    fn relative_to(&self, root: &Self) -> Option<String>;

    fn is_relative_to(&self, other: &Self) -> bool {
        self.relative_to(other).is_some()
    }

    fn set_readonly(&self, readonly: bool) -> io::Result<()>;

    fn read_link(&self) -> io::Result<String>;

    /// Creates a symlink at `self` pointing to `target`.
    fn symlink(&self, target: &str, target_is_dir: bool) -> io::Result<()>;

    /// Copies content and timestamps of `self` to `dst`. Without
    /// `follow_symlinks` a symlink is copied as a link.
    fn copy_file(&self, dst: &Self, follow_symlinks: bool) -> io::Result<()>;

    fn set_times(&self, atime: FileTime, mtime: FileTime, follow_symlinks: bool)
    -> io::Result<()>;

    /// Whether a rename between `self` and `other` can stay on one device.
    fn same_filesystem(&self, _other: &Self) -> io::Result<bool> {
        Ok(true)
    }

    /// Reads at most `n` trailing bytes.
    fn read_tail(&self, n: u64) -> io::Result<Vec<u8>> {
        let size = self.stat(true)?.size;
        let take = n.min(size);
        let mut reader = self.open()?;
        reader.seek(SeekFrom::End(-(take as i64)))?;
        let mut buf = Vec::with_capacity(take as usize);
        reader.take(take).read_to_end(&mut buf)?;
        Ok(buf)
    }
}
