// src/lib.rs
//! `rensync` keeps a destination directory in line with a source directory.
//! Files and directories that were only renamed or moved in the source are
//! renamed in the destination instead of being deleted and copied again.
//!
//! The work is split across the workspace crates re-exported here:
//! [`filters`] decides which paths take part, [`transport`] abstracts the
//! file system, [`walk`] lists directories, [`engine`] plans and applies the
//! changes and [`logging`] reports them.

pub use engine;
pub use filters;
pub use logging;
pub use transport;
pub use walk;

pub use engine::{EngineError, Result, Results, Status, SyncConfig, sync};

use logging::TracingSink;
use std::path::Path;
use transport::LocalPath;

/// Synchronizes the contents of the `src` directory into `dst` with the
/// default settings: every entry included, nothing deleted, renames
/// detected within each directory.
///
/// # Errors
///
/// Returns an input error when `src` is not a directory or `dst` exists and
/// is not one. Failures of single operations are counted in the returned
/// [`Results`] instead.
///
/// # Examples
///
/// ```
/// use std::fs;
/// use rensync::synchronize;
/// # use tempfile::tempdir;
/// # let dir = tempdir().unwrap();
/// # let src = dir.path().join("src");
/// # let dst = dir.path().join("dst");
/// # fs::create_dir(&src).unwrap();
/// # fs::write(src.join("file.txt"), b"hello").unwrap();
/// let results = synchronize(&src, &dst).unwrap();
/// assert_eq!(results.create_success, 1);
/// assert_eq!(fs::read(dst.join("file.txt")).unwrap(), b"hello");
/// ```
pub fn synchronize(src: &Path, dst: &Path) -> Result<Results> {
    let config = SyncConfig::builder(LocalPath::new(src), LocalPath::new(dst)).build()?;
    Ok(sync(&config, &TracingSink))
}
