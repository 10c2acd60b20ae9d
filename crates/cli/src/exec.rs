// crates/cli/src/exec.rs

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use engine::{EngineError, Result, Results, Status, SyncConfig, sync_with_cancel};
use logging::TracingSink;
use transport::LocalPath;

use crate::options::ClientOpts;
use crate::utils::{build_filter, local_now, trash_dir};

pub(crate) fn build_config(opts: &ClientOpts) -> Result<SyncConfig<LocalPath>> {
    let filter = build_filter(opts)?;
    let trash = match &opts.trash {
        Some(arg) => Some(LocalPath::new(trash_dir(arg, &opts.dst, local_now())?)),
        None => None,
    };
    SyncConfig::builder(LocalPath::new(&opts.src), LocalPath::new(&opts.dst))
        .filter(filter)
        .trash(trash)
        .delete_files(opts.delete_files)
        .force_update(opts.force_update)
        .force_replace(opts.force_replace)
        .global_renames(opts.global_renames)
        .renames(!opts.no_renames)
        .metadata_only(opts.metadata_only)
        .rename_threshold(Some(opts.rename_threshold))
        .ignore_symlinks(opts.ignore_symlinks)
        .follow_symlinks(opts.follow_symlinks)
        .translate_symlinks(opts.translate_symlinks)
        .create_dir_tree(!opts.no_create_dirs)
        .dry_run(opts.dry_run)
        .max_errors(opts.max_errors)
        .build()
}

/// Runs one sync between the local paths of `opts`. Configuration problems
/// end the run with [`Status::InputError`] before anything is scanned.
pub fn run_sync(opts: &ClientOpts, cancel: Arc<AtomicBool>) -> Results {
    let cfg = match build_config(opts) {
        Ok(cfg) => cfg,
        Err(e) => return input_error(&e, opts.dry_run),
    };
    tracing::debug!(
        src = %cfg.src,
        dst = %cfg.dst,
        filter = %cfg.filter,
        global = cfg.global_renames,
        "starting sync"
    );
    sync_with_cancel(&cfg, &TracingSink, cancel)
}

fn input_error(e: &EngineError, dry_run: bool) -> Results {
    tracing::error!("{e}");
    Results {
        status: Status::InputError,
        dry_run,
        ..Results::default()
    }
}
