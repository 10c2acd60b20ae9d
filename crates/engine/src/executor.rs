// crates/engine/src/executor.rs
use crate::error::Result;
use crate::ops::Operation;
use crate::results::{Results, Status};
use crate::{SyncConfig, locate};
use logging::{OperationSink, Tag};
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use transport::{AbstractPath, FileKind, TempPathGuard};
use walk::{PathKey, SymlinkMode};

/// Suffix of the file a copy is written to before it replaces the target.
pub const TEMP_COPY_SUFFIX: &str = ".tempcopy";

/// Applies operations to the destination, one at a time.
pub struct Executor<'a, P: AbstractPath> {
    config: &'a SyncConfig<P>,
    sink: &'a dyn OperationSink,
    cancel: Option<Arc<AtomicBool>>,
}

impl<'a, P: AbstractPath> Executor<'a, P> {
    pub fn new(config: &'a SyncConfig<P>, sink: &'a dyn OperationSink) -> Self {
        Self {
            config,
            sink,
            cancel: None,
        }
    }

    /// The run stops before the next operation once `flag` is set.
    pub fn with_cancel(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    fn cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
    }

    pub fn run(&self, ops: impl IntoIterator<Item = Result<Operation>>) -> Results {
        let mut results = Results {
            dry_run: self.config.dry_run,
            trash_root: self.config.delete.trash().map(ToString::to_string),
            ..Results::default()
        };
        let status = self.run_inner(ops, &mut results);
        results.status = status;
        results
    }

    fn run_inner(
        &self,
        ops: impl IntoIterator<Item = Result<Operation>>,
        results: &mut Results,
    ) -> Status {
        let mut failed: Vec<Operation> = Vec::new();
        for item in ops {
            if self.cancelled() {
                return Status::InterruptedByUser;
            }
            let op = match item {
                Ok(op) => op,
                Err(e) if e.is_connection() => {
                    tracing::error!("{e}");
                    return Status::ConnectionError;
                }
                Err(e) => {
                    tracing::error!("{e}");
                    return Status::InterruptedByError;
                }
            };

            if failed.iter().any(|f| op.depends_on(f)) {
                results.skipped += 1;
                self.sink.record(Tag::Skip, &format!("Skipping: {op}"));
                failed.push(op);
                continue;
            }

            self.sink.record(op.tag(), &op.summary());
            if self.config.dry_run {
                tally(results, &op, true);
                continue;
            }

            match self.perform(&op) {
                Ok(()) => tally(results, &op, true),
                Err(e) if transport::is_connection_error(&e) => {
                    tracing::error!("{}: {e}", op.dst());
                    return Status::ConnectionError;
                }
                Err(e) => {
                    tally(results, &op, false);
                    let line = format!("{:?}: {}: {e}", e.kind(), op.dst());
                    tracing::error!("{line}");
                    results.push_error(line);
                    failed.push(op);
                    if let Some(max) = self.config.max_errors {
                        if results.err_count() >= max as u64 {
                            return Status::ErrorLimitReached;
                        }
                    }
                }
            }
        }
        Status::Completed
    }

    fn perform(&self, op: &Operation) -> io::Result<()> {
        let (src_root, dst_root) = (&self.config.src, &self.config.dst);
        match op {
            Operation::Rename { dst, target } | Operation::RenameDir { dst, target } => {
                self.move_entry(dst, target)?;
                self.prune_parents(dst);
                Ok(())
            }
            Operation::Delete { dst, .. } => locate(dst_root, dst).unlink(),
            Operation::DeleteDir { dst } => gone_is_ok(locate(dst_root, dst).rmdir()),
            Operation::Trash { dst } => {
                let from = locate(dst_root, dst);
                let to = locate(self.trash()?, dst);
                if to.exists() {
                    return Err(exists(&to));
                }
                if let Some(parent) = to.parent() {
                    parent.mkdir(true, true)?;
                }
                self.replace(&from, &to)
            }
            Operation::TrashDir { dst } => {
                locate(self.trash()?, dst).mkdir(true, true)?;
                gone_is_ok(locate(dst_root, dst).rmdir())
            }
            Operation::Update { src, dst, .. } | Operation::Create { src, dst, .. } => {
                self.copy(&locate(src_root, src), &locate(dst_root, dst))
            }
            Operation::CreateSymlink { src, dst, target } => {
                self.symlink(&locate(src_root, src), &locate(dst_root, dst), target)
            }
            Operation::CreateDir { dst } => locate(dst_root, dst).mkdir(true, true),
        }
    }

    fn trash(&self) -> io::Result<&P> {
        self.config
            .delete
            .trash()
            .ok_or_else(|| io::Error::other("no trash directory configured"))
    }

    /// Writes `src` next to `dst` under a temporary name, then swaps it in.
    fn copy(&self, src: &P, dst: &P) -> io::Result<()> {
        match dst.stat(false) {
            Ok(st) if matches!(st.kind, FileKind::Dir | FileKind::Other) => {
                return Err(io::Error::new(
                    io::ErrorKind::AlreadyExists,
                    format!("{dst}: exists and is not a file"),
                ));
            }
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
        let tmp = temp_sibling(dst)?;
        let mut guard = TempPathGuard::new(tmp.clone());
        if let Some(parent) = dst.parent() {
            parent.mkdir(true, true)?;
        }
        src.copy_file(&tmp, self.config.symlinks == SymlinkMode::Follow)?;
        self.replace(&tmp, dst)?;
        // Moved into place, nothing left to clean up.
        guard.disarm();
        Ok(())
    }

    /// `from.replace(to)`, retried once with the read-only flag of `to`
    /// cleared. The flag is set again afterwards either way.
    fn replace(&self, from: &P, to: &P) -> io::Result<()> {
        let err = match from.replace(to) {
            Ok(()) => return Ok(()),
            Err(e) if e.kind() == io::ErrorKind::PermissionDenied => e,
            Err(e) => return Err(e),
        };
        let readonly = to.stat(false).map(|s| s.readonly).unwrap_or(false);
        if !from.is_file() || !readonly {
            return Err(err);
        }
        to.set_readonly(false)?;
        let retried = from.replace(to);
        to.set_readonly(true)?;
        retried
    }

    fn move_entry(&self, dst: &PathKey, target: &PathKey) -> io::Result<()> {
        let root = &self.config.dst;
        let (from, to) = (locate(root, dst), locate(root, target));
        // A case-only rename finds its own source at the target.
        if to.exists() && !dst.weak_eq(target) {
            return Err(exists(&to));
        }
        if let Some(parent) = to.parent() {
            parent.mkdir(true, true)?;
        }
        self.replace(&from, &to)
    }

    /// Removes directories emptied by a rename, walking up from the old
    /// location until one is still in use or exists in the source.
    fn prune_parents(&self, key: &PathKey) {
        let mut dir = key.parent();
        while let Some(k) = dir {
            if k.is_root() || locate(&self.config.src, &k).is_dir() {
                break;
            }
            let path = locate(&self.config.dst, &k);
            match path.iterate() {
                Ok(children) if children.is_empty() => {}
                _ => break,
            }
            if let Err(e) = path.rmdir() {
                tracing::debug!("{path}: {e}");
                break;
            }
            tracing::debug!(target: Tag::Dir.target(), "removed empty dir: {path}");
            dir = k.parent();
        }
    }

    fn symlink(&self, src: &P, dst: &P, target: &str) -> io::Result<()> {
        let st = src.stat(false)?;
        match dst.stat(false) {
            Ok(existing) if !existing.is_symlink() => {
                return Err(io::Error::new(
                    io::ErrorKind::AlreadyExists,
                    format!("{dst}: exists and is not a symlink"),
                ));
            }
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
        let tmp = temp_sibling(dst)?;
        let mut guard = TempPathGuard::new(tmp.clone());
        if let Some(parent) = dst.parent() {
            parent.mkdir(true, true)?;
        }
        tmp.symlink(target, src.is_dir())?;
        self.replace(&tmp, dst)?;
        guard.disarm();
        dst.set_times(st.atime, st.mtime, false)
    }
}

fn temp_sibling<P: AbstractPath>(path: &P) -> io::Result<P> {
    let name = path
        .name()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, format!("{path}: no name")))?;
    Ok(path.with_name(&format!("{name}{TEMP_COPY_SUFFIX}")))
}

fn exists(path: &impl std::fmt::Display) -> io::Error {
    io::Error::new(io::ErrorKind::AlreadyExists, format!("{path}: already exists"))
}

fn gone_is_ok(res: io::Result<()>) -> io::Result<()> {
    match res {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

fn tally(results: &mut Results, op: &Operation, ok: bool) {
    let (success, error) = match op {
        Operation::Rename { .. } | Operation::RenameDir { .. } => {
            (&mut results.rename_success, &mut results.rename_error)
        }
        Operation::Delete { .. } => (&mut results.delete_success, &mut results.delete_error),
        Operation::DeleteDir { .. } => {
            (&mut results.dir_delete_success, &mut results.dir_delete_error)
        }
        Operation::Trash { .. } | Operation::TrashDir { .. } => {
            (&mut results.trash_success, &mut results.trash_error)
        }
        Operation::Update { .. } => (&mut results.update_success, &mut results.update_error),
        Operation::Create { .. } | Operation::CreateSymlink { .. } => {
            (&mut results.create_success, &mut results.create_error)
        }
        Operation::CreateDir { .. } => {
            (&mut results.dir_create_success, &mut results.dir_create_error)
        }
    };
    if ok {
        *success += 1;
        results.byte_diff += op.byte_diff();
    } else {
        *error += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EngineError;
    use logging::MemorySink;
    use transport::{FaultOp, MemoryFs, MemoryPath, Platform};

    fn key(s: &str) -> PathKey {
        PathKey::new(s, '/', Platform::Posix).unwrap()
    }

    fn setup() -> (std::sync::Arc<MemoryFs>, SyncConfig<MemoryPath>) {
        let fs = MemoryFs::new();
        let root = fs.root();
        root.join("src").mkdir(true, true).unwrap();
        root.join("dst").mkdir(true, true).unwrap();
        let cfg = SyncConfig::builder(root.join("src"), root.join("dst"))
            .build()
            .unwrap();
        (fs, cfg)
    }

    #[test]
    fn copy_keeps_mtime_and_leaves_no_temp_file() {
        let (fs, cfg) = setup();
        fs.root().join("src/a").write(b"abc", 42).unwrap();
        let sink = MemorySink::new();
        let ops = [Ok(Operation::Create { src: key("a"), dst: key("a"), size: 3 })];
        let results = Executor::new(&cfg, &sink).run(ops);
        assert_eq!(results.status, Status::Completed);
        assert_eq!(results.create_success, 1);
        assert_eq!(results.byte_diff, 3);
        let dst = fs.root().join("dst/a");
        assert_eq!(dst.read().unwrap(), b"abc");
        assert_eq!(dst.stat(false).unwrap().mtime.unix_seconds(), 42);
        assert!(!fs.root().join("dst/a.tempcopy").exists());
        assert_eq!(sink.messages(), vec!["+ a"]);
    }

    #[test]
    fn move_refuses_to_overwrite() {
        let (fs, cfg) = setup();
        fs.root().join("dst/a").write(b"1", 1).unwrap();
        fs.root().join("dst/b").write(b"2", 1).unwrap();
        let ops = [Ok(Operation::Rename { dst: key("a"), target: key("b") })];
        let results = Executor::new(&cfg, &MemorySink::new()).run(ops);
        assert_eq!(results.rename_error, 1);
        assert!(results.errors[0].starts_with("AlreadyExists: a: "));
        assert_eq!(fs.root().join("dst/b").read().unwrap(), b"2");
    }

    #[test]
    fn rename_prunes_emptied_dirs() {
        let (fs, cfg) = setup();
        fs.root().join("dst/x/y/f").write(b"1", 1).unwrap();
        let ops = [Ok(Operation::Rename { dst: key("x/y/f"), target: key("f") })];
        let results = Executor::new(&cfg, &MemorySink::new()).run(ops);
        assert_eq!(results.rename_success, 1);
        assert!(fs.root().join("dst/f").exists());
        assert!(!fs.root().join("dst/x").exists());
    }

    #[test]
    fn dependents_of_a_failure_are_skipped() {
        let (fs, cfg) = setup();
        fs.root().join("src/d/f").write(b"1", 1).unwrap();
        fs.inject_fault(FaultOp::Mkdir, "dst/d", io::ErrorKind::PermissionDenied);
        let sink = MemorySink::new();
        let ops = [
            Ok(Operation::CreateDir { dst: key("d") }),
            Ok(Operation::Create { src: key("d/f"), dst: key("d/f"), size: 1 }),
        ];
        let results = Executor::new(&cfg, &sink).run(ops);
        assert_eq!(results.status, Status::Completed);
        assert_eq!(results.dir_create_error, 1);
        assert_eq!(results.skipped, 1);
        assert_eq!(results.create_success + results.create_error, 0);
        assert_eq!(sink.messages(), vec!["+ d/", "Skipping: + d/f"]);
    }

    #[test]
    fn stream_errors_end_the_run() {
        let (_fs, cfg) = setup();
        let sink = MemorySink::new();
        let results = Executor::new(&cfg, &sink).run([Err(EngineError::Connection("gone".into()))]);
        assert_eq!(results.status, Status::ConnectionError);
        let results = Executor::new(&cfg, &sink).run([Err(EngineError::Other("bug".into()))]);
        assert_eq!(results.status, Status::InterruptedByError);
    }

    #[test]
    fn cancel_flag_stops_before_the_next_operation() {
        let (fs, cfg) = setup();
        fs.root().join("src/a").write(b"1", 1).unwrap();
        let flag = Arc::new(AtomicBool::new(true));
        let ops = [Ok(Operation::Create { src: key("a"), dst: key("a"), size: 1 })];
        let results = Executor::new(&cfg, &MemorySink::new())
            .with_cancel(Arc::clone(&flag))
            .run(ops);
        assert_eq!(results.status, Status::InterruptedByUser);
        assert!(!fs.root().join("dst/a").exists());
    }
}
