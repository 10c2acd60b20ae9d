// crates/engine/src/schedule.rs
use crate::diff::{Diff, EntryKind};
use crate::error::{EngineError, Result};
use crate::ops::{Operation, delete_order};
use crate::rename::{self, RenamePair};
use crate::{DeleteMode, DualWalk, SyncConfig, locate};
use logging::{OperationSink, Tag};
use std::cmp::Ordering;
use std::collections::{BTreeSet, VecDeque};
use transport::AbstractPath;
use walk::{PathKey, SymlinkMode};

/// Turns the diffs of a [`DualWalk`] into operations.
///
/// In local mode each directory pair is planned as soon as it is walked:
/// renames, deletes, updates, then creates. With global renames the whole
/// tree is merged into one diff first and each group is sorted across the
/// tree; deletes run children first.
pub struct Scheduler<'a, P: AbstractPath> {
    config: &'a SyncConfig<P>,
    sink: &'a dyn OperationSink,
    walk: DualWalk<'a, P>,
    pending: VecDeque<Operation>,
    planned: bool,
    sep: char,
}

impl<'a, P: AbstractPath> Scheduler<'a, P> {
    pub fn new(config: &'a SyncConfig<P>, sink: &'a dyn OperationSink) -> Self {
        Self {
            config,
            sink,
            walk: DualWalk::new(config),
            pending: VecDeque::new(),
            planned: false,
            sep: config.dst.separator(),
        }
    }

    fn plan_local(&mut self, mut diff: Diff) -> Result<()> {
        let mut ops = Vec::new();
        if self.config.renames {
            let renames = rename::resolve(self.config, &mut diff, None)?;
            self.renames(renames, &mut ops);
        }
        if !self.config.delete.is_keep() {
            for key in &diff.dst_only_files {
                ops.push(self.delete_file(&diff, key));
            }
            if diff.src_parent.is_none() {
                if let Some(dir) = diff.dst_parent.as_ref().filter(|d| !d.is_root()) {
                    ops.push(self.delete_dir(dir));
                }
            }
        }
        for (dst, src) in &diff.file_matches {
            self.update(&diff, dst, src, &mut ops);
        }
        if diff.dst_parent.is_none() {
            let wanted = self.config.create_dir_tree
                || (self.config.create_files && !diff.src_only_files.is_empty());
            if let Some(dir) = diff.src_parent.as_ref().filter(|d| !d.is_root()) {
                if wanted {
                    ops.push(Operation::CreateDir {
                        dst: dir.with_separator(self.sep),
                    });
                }
            }
        }
        if self.config.create_files {
            for key in &diff.src_only_files {
                self.create_file(&diff, key, &mut ops)?;
            }
        }
        self.pending.extend(ops);
        Ok(())
    }

    fn plan_global(&mut self) -> Result<()> {
        let mut diff = Diff::default();
        for part in self.walk.by_ref() {
            diff.update(part.map_err(EngineError::from_io)?);
        }
        for key in self.walk.abandoned() {
            diff.src_only_dirs.remove(key);
        }

        let mut renames = Vec::new();
        if self.config.renames {
            let pairs = rename::resolve(self.config, &mut diff, self.walk.dir_hashes())?;
            self.renames(pairs, &mut renames);
        }

        let mut deletes = Vec::new();
        if !self.config.delete.is_keep() {
            for dir in &diff.dst_only_dirs {
                deletes.push(self.delete_dir(dir));
            }
            for key in &diff.dst_only_files {
                deletes.push(self.delete_file(&diff, key));
            }
            deletes.sort_by(delete_order);
        }

        let mut updates = Vec::new();
        for (dst, src) in &diff.file_matches {
            self.update(&diff, dst, src, &mut updates);
        }
        updates.sort_by(by_dst);

        let mut creates = Vec::new();
        let dirs: BTreeSet<&PathKey> = if self.config.create_dir_tree {
            diff.src_only_dirs.iter().collect()
        } else if self.config.create_files {
            // Only directories that will receive a file.
            diff.src_only_files
                .iter()
                .filter_map(|f| f.parent())
                .filter_map(|p| diff.src_only_dirs.get(&p))
                .collect()
        } else {
            BTreeSet::new()
        };
        for dir in dirs {
            creates.push(Operation::CreateDir {
                dst: dir.with_separator(self.sep),
            });
        }
        if self.config.create_files {
            for key in &diff.src_only_files {
                self.create_file(&diff, key, &mut creates)?;
            }
        }
        creates.sort_by(by_dst);

        self.pending.extend(renames);
        self.pending.extend(deletes);
        self.pending.extend(updates);
        self.pending.extend(creates);
        Ok(())
    }

    fn renames(&self, pairs: Vec<RenamePair>, ops: &mut Vec<Operation>) {
        for (dst, target, kind) in pairs {
            let target = target.with_separator(self.sep);
            ops.push(match kind {
                EntryKind::File => Operation::Rename { dst, target },
                EntryKind::Dir => Operation::RenameDir { dst, target },
            });
        }
    }

    fn delete_file(&self, diff: &Diff, key: &PathKey) -> Operation {
        match self.config.delete {
            DeleteMode::Trash(_) => Operation::Trash { dst: key.clone() },
            _ => Operation::Delete {
                dst: key.clone(),
                size: diff.dst_file_meta.get(key).map_or(0, |m| m.size),
            },
        }
    }

    fn delete_dir(&self, key: &PathKey) -> Operation {
        match self.config.delete {
            DeleteMode::Trash(_) => Operation::TrashDir { dst: key.clone() },
            _ => Operation::DeleteDir { dst: key.clone() },
        }
    }

    fn update(&self, diff: &Diff, dst: &PathKey, src: &PathKey, ops: &mut Vec<Operation>) {
        let (Some(s), Some(d)) = (diff.src_file_meta.get(src), diff.dst_file_meta.get(dst)) else {
            return;
        };
        let go = match s.mtime.cmp(&d.mtime) {
            Ordering::Greater => true,
            Ordering::Less if self.config.force_update => true,
            Ordering::Less => {
                self.sink.record(
                    Tag::Skip,
                    &format!("'dst' file is newer than 'src' file: {dst}"),
                );
                false
            }
            Ordering::Equal => false,
        };
        if !go {
            return;
        }
        ops.push(Operation::Update {
            src: src.clone(),
            dst: dst.clone(),
            byte_diff: s.size as i64 - d.size as i64,
        });
        if src.name() != dst.name() {
            ops.push(Operation::Rename {
                dst: dst.clone(),
                target: src.with_separator(self.sep),
            });
        }
    }

    fn create_file(&self, diff: &Diff, key: &PathKey, ops: &mut Vec<Operation>) -> Result<()> {
        let dst = key.with_separator(self.sep);
        if diff.src_symlinks.contains(key) && self.config.symlinks != SymlinkMode::Follow {
            let path = locate(&self.config.src, key);
            match path.read_link() {
                Ok(target) => ops.push(Operation::CreateSymlink {
                    src: key.clone(),
                    dst,
                    target: self.translate(target),
                }),
                Err(e) if transport::is_connection_error(&e) => {
                    return Err(EngineError::from_io(e));
                }
                Err(e) => self.sink.record(
                    Tag::Ignore,
                    &format!("Ignoring unreadable symlink: {path}: {e}"),
                ),
            }
            return Ok(());
        }
        ops.push(Operation::Create {
            src: key.clone(),
            dst,
            size: diff.src_file_meta.get(key).map_or(0, |m| m.size),
        });
        Ok(())
    }

    /// Rebases absolute link targets inside the source root onto the
    /// destination root and swaps separators.
    fn translate(&self, target: String) -> String {
        if !self.config.translate_symlinks {
            return target;
        }
        let (from, to) = (self.config.src.separator(), self.sep);
        let swap = |s: &str| s.replace(from, &to.to_string());
        let src_root = self.config.src.to_string();
        if let Some(rest) = target.strip_prefix(&src_root) {
            if rest.is_empty() {
                return self.config.dst.to_string();
            }
            if let Some(rest) = rest.strip_prefix(from) {
                return format!("{}{to}{}", self.config.dst, swap(rest));
            }
        }
        swap(&target)
    }
}

fn by_dst(a: &Operation, b: &Operation) -> Ordering {
    a.dst().normalized().cmp(b.dst().normalized())
}

impl<P: AbstractPath> Iterator for Scheduler<'_, P> {
    type Item = Result<Operation>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(op) = self.pending.pop_front() {
                return Some(Ok(op));
            }
            let planned = if self.config.global_renames {
                if self.planned {
                    return None;
                }
                self.planned = true;
                self.plan_global()
            } else {
                match self.walk.next()? {
                    Ok(diff) => self.plan_local(diff),
                    Err(e) => Err(EngineError::from_io(e)),
                }
            };
            if let Err(e) = planned {
                self.pending.clear();
                return Some(Err(e));
            }
        }
    }
}
