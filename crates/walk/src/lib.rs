// crates/walk/src/lib.rs
//! Directory scanning keyed by destination-aware relative paths.
//!
//! [`PathKey`] is the identity every other stage works with. [`list_dir`]
//! reads a single directory through a [`filters::Filter`] and
//! [`TreeScanner`] chains those reads into a lazy depth-first walk.
mod entry;
mod listing;
mod pathkey;
mod scan;

pub use entry::{Entry, Metadata};
pub use listing::{DirListing, ScanOptions, SymlinkMode, list_dir};
pub use pathkey::{IncompatiblePath, PathKey, is_reserved_windows_name};
pub use scan::TreeScanner;
