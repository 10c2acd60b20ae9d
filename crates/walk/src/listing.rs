// crates/walk/src/listing.rs
use crate::{Metadata, PathKey};
use filters::Filter;
use std::collections::{BTreeMap, BTreeSet};
use std::io;
use transport::{AbstractPath, DirEntry, FileKind, Platform, Stat};

/// How symbolic links found during a scan are treated.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SymlinkMode {
    /// The link itself is synced as a file.
    #[default]
    Copy,
    /// Links are neither synced nor deleted.
    Ignore,
    /// Links are replaced by what they point to.
    Follow,
}

/// Settings shared by every directory read of one scan.
#[derive(Clone, Copy, Debug)]
pub struct ScanOptions<'a> {
    pub filter: &'a Filter,
    pub symlinks: SymlinkMode,
    /// Naming rules of the destination; keys that break them are skipped.
    pub platform: Platform,
    /// Drop sub-second mtimes so local and remote trees compare equal.
    pub truncate_mtime: bool,
}

impl<'a> ScanOptions<'a> {
    pub fn new(filter: &'a Filter) -> Self {
        Self {
            filter,
            symlinks: SymlinkMode::default(),
            platform: Platform::current(),
            truncate_mtime: false,
        }
    }
}

/// Immediate children of one directory, split by kind.
///
/// `parent` is `None` when the directory does not exist.
#[derive(Clone, Debug, Default)]
pub struct DirListing {
    pub parent: Option<PathKey>,
    pub dirs: Vec<PathKey>,
    pub files: Vec<PathKey>,
    pub file_meta: BTreeMap<PathKey, Metadata>,
    /// Files that are symlinks themselves (copy mode only).
    pub symlinks: BTreeSet<PathKey>,
    /// Included names that are neither regular files nor directories.
    pub nonstandard: Vec<PathKey>,
    /// Children before filtering.
    pub dir_size: usize,
}

impl DirListing {
    pub fn is_empty(&self) -> bool {
        self.dir_size == 0
    }
}

enum Kind {
    Dir,
    File(Stat, bool),
    Other,
}

fn classify<P: AbstractPath>(child: &DirEntry<P>, mode: SymlinkMode) -> io::Result<Kind> {
    let stat = match (mode, child.stat.kind) {
        (SymlinkMode::Ignore, FileKind::Symlink) => return Ok(Kind::Other),
        (SymlinkMode::Follow, FileKind::Symlink) => match child.path.stat(true) {
            Ok(stat) => stat,
            // Dangling link.
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Kind::Other),
            Err(e) => return Err(e),
        },
        _ => child.stat,
    };
    Ok(match stat.kind {
        FileKind::Dir => Kind::Dir,
        FileKind::File => Kind::File(stat, false),
        FileKind::Symlink => Kind::File(stat, true),
        FileKind::Other => Kind::Other,
    })
}

/// Reads `dir`, a directory at or below `root`, through `opts.filter`.
///
/// A missing `dir` (`None`, or gone by the time it is read) yields an empty
/// listing without a parent key.
pub fn list_dir<P: AbstractPath>(
    dir: Option<&P>,
    root: &P,
    opts: &ScanOptions<'_>,
) -> io::Result<DirListing> {
    let Some(dir) = dir else {
        return Ok(DirListing::default());
    };
    let rel = dir.relative_to(root).ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{dir} is not below {root}"),
        )
    })?;
    let sep = dir.separator();
    let parent = PathKey::new(&rel, sep, opts.platform)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    let children = match dir.iterate() {
        Ok(children) => children,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(DirListing::default()),
        Err(e) => return Err(e),
    };

    let mut out = DirListing {
        parent: Some(parent.clone()),
        dir_size: children.len(),
        ..DirListing::default()
    };
    let prefix = if parent.is_root() {
        String::new()
    } else {
        format!("{}/", parent.filter_path())
    };

    for child in children {
        let kind = match classify(&child, opts.symlinks) {
            Ok(kind) => kind,
            Err(e) if transport::is_connection_error(&e) => return Err(e),
            Err(e) => {
                tracing::warn!(target: "rensync::ignore", "Ignoring unreadable entry: {}: {e}", child.path);
                continue;
            }
        };
        let filter_path = format!("{prefix}{}", child.name);
        match kind {
            Kind::Dir => {
                if !opts.filter.matches(&filter_path, true) {
                    continue;
                }
                match parent.join(&child.name) {
                    Ok(key) => out.dirs.push(key),
                    Err(_) => tracing::warn!(
                        target: "rensync::ignore",
                        "Ignoring incompatible dir: {}{sep}",
                        child.path
                    ),
                }
            }
            Kind::File(stat, is_link) => {
                if !opts.filter.matches(&filter_path, false) {
                    continue;
                }
                let Ok(key) = parent.join(&child.name) else {
                    tracing::warn!(
                        target: "rensync::ignore",
                        "Ignoring incompatible file: {}",
                        child.path
                    );
                    continue;
                };
                let mut meta = Metadata::new(stat.size, stat.mtime);
                if opts.truncate_mtime {
                    meta = meta.truncated();
                }
                if is_link {
                    out.symlinks.insert(key.clone());
                }
                out.file_meta.insert(key.clone(), meta);
                out.files.push(key);
            }
            Kind::Other => {
                if opts.filter.matches(&filter_path, false) {
                    if let Ok(key) = parent.join(&child.name) {
                        out.nonstandard.push(key);
                    }
                }
            }
        }
    }
    Ok(out)
}
