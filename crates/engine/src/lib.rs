// crates/engine/src/lib.rs
//! Rename-aware directory sync.
//!
//! A [`DualWalk`] pairs the source and destination trees directory by
//! directory, [`dir_diff`] classifies each pair, [`rename::resolve`] turns
//! unique signatures into rename chains, the [`Scheduler`] orders the
//! resulting [`Operation`]s and the [`Executor`] applies them.
use logging::OperationSink;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use transport::AbstractPath;
use walk::PathKey;

mod config;
pub mod diff;
mod dualwalk;
mod error;
mod executor;
mod ops;
pub mod rename;
mod results;
mod schedule;

pub use config::{DEFAULT_RENAME_THRESHOLD, DeleteMode, SyncConfig, SyncConfigBuilder};
pub use diff::{Diff, EntryKind, dir_diff};
pub use dualwalk::{DirHashes, DualWalk, TreeHashes};
pub use error::{EngineError, Result, io_context};
pub use executor::{Executor, TEMP_COPY_SUFFIX};
pub use ops::{Operation, delete_order};
pub use rename::{Lookup, RenamePair, TEMP_MOVE_SUFFIX};
pub use results::{MAX_RETAINED_ERRORS, Results, Status};
pub use schedule::Scheduler;

/// Path of `key` below `root`.
pub fn locate<P: AbstractPath>(root: &P, key: &PathKey) -> P {
    key.parts().iter().fold(root.clone(), |path, part| path.join(part))
}

/// Plans and applies every operation needed to bring `config.dst` in line
/// with `config.src`.
pub fn sync<P: AbstractPath>(config: &SyncConfig<P>, sink: &dyn OperationSink) -> Results {
    let results = Executor::new(config, sink).run(Scheduler::new(config, sink));
    config.filter.report();
    results
}

/// [`sync`], stopping between operations once `cancel` is set.
pub fn sync_with_cancel<P: AbstractPath>(
    config: &SyncConfig<P>,
    sink: &dyn OperationSink,
    cancel: Arc<AtomicBool>,
) -> Results {
    let results = Executor::new(config, sink)
        .with_cancel(cancel)
        .run(Scheduler::new(config, sink));
    config.filter.report();
    results
}
