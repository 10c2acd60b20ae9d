// crates/transport/src/lib.rs
//! Filesystem capability shared by every sync endpoint.
//!
//! The engine never touches `std::fs` directly. It is generic over
//! [`AbstractPath`], which is implemented by [`LocalPath`] for the host
//! filesystem and by [`MemoryPath`] for an in-memory tree that behaves like a
//! remote endpoint (forward slashes, whole-second timestamps, optional
//! case-insensitivity).
use std::io;

mod local;
mod memory;
mod path;
mod platform;
mod temp;

pub use local::LocalPath;
pub use memory::{FaultOp, MemoryFs, MemoryFsBuilder, MemoryPath};
pub use path::{AbstractPath, DirEntry, FileKind, Stat};
pub use platform::Platform;
pub use temp::TempPathGuard;

/// Returns `true` when `err` indicates the endpoint itself is gone rather
/// than a single path being unusable.
pub fn is_connection_error(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::NotConnected
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionRefused
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::TimedOut
    )
}
