// crates/transport/src/local.rs
use crate::{AbstractPath, DirEntry, FileKind, Platform, Stat};
use filetime::{FileTime, set_file_times, set_symlink_file_times};
use std::fmt;
use std::fs::{self, File, Metadata};
use std::io;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

/// Path on the host filesystem.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct LocalPath {
    path: PathBuf,
}

impl LocalPath {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn as_path(&self) -> &Path {
        &self.path
    }
}

impl From<&Path> for LocalPath {
    fn from(path: &Path) -> Self {
        Self::new(path)
    }
}

impl From<PathBuf> for LocalPath {
    fn from(path: PathBuf) -> Self {
        Self::new(path)
    }
}

impl fmt::Display for LocalPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

fn stat_from(meta: &Metadata) -> Stat {
    let ft = meta.file_type();
    let kind = if ft.is_symlink() {
        FileKind::Symlink
    } else if ft.is_dir() {
        FileKind::Dir
    } else if ft.is_file() {
        FileKind::File
    } else {
        FileKind::Other
    };
    Stat {
        kind,
        size: meta.len(),
        readonly: meta.permissions().readonly(),
        atime: FileTime::from_last_access_time(meta),
        mtime: FileTime::from_last_modification_time(meta),
    }
}

fn walk_error(err: walkdir::Error) -> io::Error {
    let msg = err.to_string();
    match err.into_io_error() {
        Some(inner) => inner,
        None => io::Error::other(msg),
    }
}

#[cfg(unix)]
fn make_symlink(link: &Path, target: &str, _target_is_dir: bool) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn make_symlink(link: &Path, target: &str, target_is_dir: bool) -> io::Result<()> {
    if target_is_dir {
        std::os::windows::fs::symlink_dir(target, link)
    } else {
        std::os::windows::fs::symlink_file(target, link)
    }
}

#[cfg(not(any(unix, windows)))]
fn make_symlink(link: &Path, _target: &str, _target_is_dir: bool) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        format!("{}: symlinks are not supported", link.display()),
    ))
}

impl AbstractPath for LocalPath {
    type Reader = File;

    fn join(&self, name: &str) -> Self {
        Self::new(self.path.join(name))
    }

    fn parent(&self) -> Option<Self> {
        self.path.parent().map(Self::new)
    }

    fn name(&self) -> Option<String> {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
    }

    fn separator(&self) -> char {
        std::path::MAIN_SEPARATOR
    }

    fn platform(&self) -> Platform {
        Platform::current()
    }

    fn stat(&self, follow_symlinks: bool) -> io::Result<Stat> {
        let meta = if follow_symlinks {
            fs::metadata(&self.path)?
        } else {
            fs::symlink_metadata(&self.path)?
        };
        Ok(stat_from(&meta))
    }

    fn resolve(&self) -> io::Result<String> {
        Ok(fs::canonicalize(&self.path)?.display().to_string())
    }

    fn iterate(&self) -> io::Result<Vec<DirEntry<Self>>> {
        let mut out = Vec::new();
        for entry in WalkDir::new(&self.path)
            .min_depth(1)
            .max_depth(1)
            .follow_links(false)
            .sort_by_file_name()
        {
            let entry = entry.map_err(walk_error)?;
            let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
                tracing::warn!("Ignoring non UTF-8 name: {}", entry.path().display());
                continue;
            };
            let meta = entry.metadata().map_err(walk_error)?;
            out.push(DirEntry {
                path: Self::new(entry.path()),
                name,
                stat: stat_from(&meta),
            });
        }
        Ok(out)
    }

    fn mkdir(&self, parents: bool, exist_ok: bool) -> io::Result<()> {
        if parents && !exist_ok && self.exists() {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("{}: already exists", self.path.display()),
            ));
        }
        let res = if parents {
            fs::create_dir_all(&self.path)
        } else {
            fs::create_dir(&self.path)
        };
        match res {
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists && exist_ok && self.is_dir() => {
                Ok(())
            }
            other => other,
        }
    }

    fn rmdir(&self) -> io::Result<()> {
        fs::remove_dir(&self.path)
    }

    fn unlink(&self) -> io::Result<()> {
        fs::remove_file(&self.path)
    }

    fn open(&self) -> io::Result<File> {
        File::open(&self.path)
    }

    fn replace(&self, target: &Self) -> io::Result<()> {
        fs::rename(&self.path, &target.path)
    }

    fn relative_to(&self, root: &Self) -> Option<String> {
        let rel = self.path.strip_prefix(&root.path).ok()?;
        let parts: Vec<String> = rel
            .components()
            .filter_map(|c| match c {
                Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect();
        Some(parts.join(&self.separator().to_string()))
    }

    fn set_readonly(&self, readonly: bool) -> io::Result<()> {
        let mut perms = fs::symlink_metadata(&self.path)?.permissions();
        #[allow(clippy::permissions_set_readonly_false)]
        perms.set_readonly(readonly);
        fs::set_permissions(&self.path, perms)
    }

    fn read_link(&self) -> io::Result<String> {
        let target = fs::read_link(&self.path)?.display().to_string();
        for prefix in [r"\\?\", r"\??\"] {
            if let Some(stripped) = target.strip_prefix(prefix) {
                return Ok(stripped.to_string());
            }
        }
        Ok(target)
    }

    fn symlink(&self, target: &str, target_is_dir: bool) -> io::Result<()> {
        make_symlink(&self.path, target, target_is_dir)
    }

    fn copy_file(&self, dst: &Self, follow_symlinks: bool) -> io::Result<()> {
        let meta = if follow_symlinks {
            fs::metadata(&self.path)?
        } else {
            fs::symlink_metadata(&self.path)?
        };
        let atime = FileTime::from_last_access_time(&meta);
        let mtime = FileTime::from_last_modification_time(&meta);
        if meta.file_type().is_symlink() {
            let target = self.read_link()?;
            let target_is_dir = self.is_dir();
            make_symlink(&dst.path, &target, target_is_dir)?;
            return set_symlink_file_times(&dst.path, atime, mtime);
        }
        fs::copy(&self.path, &dst.path)?;
        set_file_times(&dst.path, atime, mtime)
    }

    fn set_times(&self, atime: FileTime, mtime: FileTime, follow_symlinks: bool) -> io::Result<()> {
        if follow_symlinks {
            set_file_times(&self.path, atime, mtime)
        } else {
            set_symlink_file_times(&self.path, atime, mtime)
        }
    }

    #[cfg(unix)]
    fn same_filesystem(&self, other: &Self) -> io::Result<bool> {
        use std::os::unix::fs::MetadataExt;
        Ok(fs::metadata(&self.path)?.dev() == fs::metadata(&other.path)?.dev())
    }
}
