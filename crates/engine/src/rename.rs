// crates/engine/src/rename.rs
//! Rename detection.
//!
//! Files are paired by a `(size, mtime)` signature that must be unique on
//! both sides, directories by the content hash collected during a global
//! walk. The resulting `dst -> src` map is followed link by link into
//! chains that can be applied one rename at a time without overwriting
//! anything; a chain that closes on itself goes through a temporary name.
use crate::diff::{Diff, EntryKind};
use crate::dualwalk::DirHashes;
use crate::error::{EngineError, Result};
use crate::{SyncConfig, locate};
use logging::Tag;
use std::collections::hash_map::Entry as MapEntry;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::hash::Hash;
use std::iter::Peekable;
use transport::AbstractPath;
use walk::PathKey;

/// Suffix of the temporary name used to break a rename cycle.
pub const TEMP_MOVE_SUFFIX: &str = ".tempmove";

/// Number of trailing bytes compared before a file rename is accepted.
pub const TAIL_BYTES: u64 = 1024;

/// One resolved rename: destination entry, its new name, and its kind.
pub type RenamePair = (PathKey, PathKey, EntryKind);

/// Result of a reverse lookup.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Lookup<T> {
    Found(T),
    Absent,
    /// More than one key carries the value.
    Ambiguous,
}

/// Value to key index that remembers values seen more than once.
#[derive(Debug)]
pub struct ReverseIndex<K, V> {
    map: HashMap<V, Option<K>>,
}

impl<K, V: Hash + Eq> ReverseIndex<K, V> {
    pub fn build(pairs: impl IntoIterator<Item = (K, V)>) -> Self {
        let mut map = HashMap::new();
        for (key, value) in pairs {
            match map.entry(value) {
                MapEntry::Vacant(e) => {
                    e.insert(Some(key));
                }
                MapEntry::Occupied(mut e) => {
                    e.insert(None);
                }
            }
        }
        Self { map }
    }

    pub fn get(&self, value: &V) -> Lookup<&K> {
        match self.map.get(value) {
            Some(Some(key)) => Lookup::Found(key),
            Some(None) => Lookup::Ambiguous,
            None => Lookup::Absent,
        }
    }

    /// Values carried by exactly one key.
    pub fn unique(&self) -> impl Iterator<Item = (&V, &K)> {
        self.map.iter().filter_map(|(v, k)| k.as_ref().map(|k| (v, k)))
    }
}

#[derive(Debug)]
struct Chain {
    links: Vec<(PathKey, PathKey)>,
    cycle: bool,
}

impl Chain {
    /// Links in the order they can be applied.
    fn ordered(&self) -> Vec<(PathKey, PathKey)> {
        let mut out = Vec::with_capacity(self.links.len() + 1);
        if self.cycle {
            let (first, first_to) = &self.links[0];
            let temp = first_to.with_suffix(TEMP_MOVE_SUFFIX);
            out.push((first.clone(), temp.clone()));
            out.extend(self.links[1..].iter().rev().cloned());
            out.push((temp, first_to.clone()));
        } else {
            out.extend(self.links.iter().rev().cloned());
        }
        out
    }

    fn targets(&self) -> HashSet<&PathKey> {
        self.links.iter().map(|(_, to)| to).collect()
    }
}

/// Follows `map` from `start` until the target is `terminal`, or returns to
/// `start`. Every visited key is marked handled, including those of a
/// rejected chain.
fn follow(
    map: &BTreeMap<PathKey, PathKey>,
    start: &PathKey,
    handled: &mut HashSet<PathKey>,
    blockers: &BTreeSet<PathKey>,
    terminal: &BTreeSet<PathKey>,
) -> Option<Chain> {
    let mut links = Vec::new();
    let mut from = start.clone();
    loop {
        handled.insert(from.clone());
        let to = map.get(&from)?;
        links.push((from.clone(), to.clone()));
        if from.is_lineage(to) {
            return None;
        }
        if let Some(b) = blockers.iter().find(|b| to.is_relative_to(b)) {
            tracing::debug!(
                target: Tag::Ignore.target(),
                "Ignoring blocked rename: {start} -> {to} (blocked by {b})"
            );
            return None;
        }
        if terminal.contains(to) {
            return Some(Chain {
                links,
                cycle: false,
            });
        }
        if to == start {
            return Some(Chain { links, cycle: true });
        }
        from = to.clone();
    }
}

/// Unique signature matches between the two sides, keyed by destination.
fn file_rename_map<P: AbstractPath>(
    config: &SyncConfig<P>,
    diff: &Diff,
    threshold: u64,
    moved_dirs: &[PathKey],
    dir_targets: &[PathKey],
) -> Result<BTreeMap<PathKey, PathKey>> {
    let under = |key: &PathKey, dirs: &[PathKey]| dirs.iter().any(|d| key.is_relative_to(d));
    let src_index = ReverseIndex::build(
        diff.src_file_meta
            .iter()
            .filter(|(k, _)| !diff.ignored_src.contains(*k) && !under(k, dir_targets))
            .map(|(k, m)| (k, *m)),
    );
    let dst_index = ReverseIndex::build(
        diff.dst_file_meta
            .iter()
            .filter(|(k, _)| !diff.ignored_dst.contains(*k) && !under(k, moved_dirs))
            .map(|(k, m)| (k, *m)),
    );

    let mut map = BTreeMap::new();
    for (meta, &dst_key) in dst_index.unique() {
        if meta.size < threshold {
            continue;
        }
        let Lookup::Found(&src_key) = src_index.get(meta) else {
            continue;
        };
        if src_key == dst_key {
            continue;
        }
        if !config.metadata_only && !same_tail(config, src_key, dst_key)? {
            continue;
        }
        map.insert(dst_key.clone(), src_key.clone());
    }
    Ok(map)
}

fn same_tail<P: AbstractPath>(config: &SyncConfig<P>, src: &PathKey, dst: &PathKey) -> Result<bool> {
    let src_path = locate(&config.src, src);
    let dst_path = locate(&config.dst, dst);
    let read = |p: &P| p.read_tail(TAIL_BYTES);
    match read(&src_path).and_then(|a| read(&dst_path).map(|b| a == b)) {
        Ok(same) => Ok(same),
        Err(e) if transport::is_connection_error(&e) => Err(EngineError::from_io(e)),
        Err(e) => {
            tracing::warn!("{src_path} -> {dst_path}: {e}");
            Ok(false)
        }
    }
}

fn release_new_dirs(diff: &mut Diff, mut dir: Option<PathKey>) {
    while let Some(d) = dir {
        if d.is_root() || !diff.src_only_dirs.remove(&d) {
            break;
        }
        dir = d.parent();
    }
}

fn file_chains<P: AbstractPath>(
    config: &SyncConfig<P>,
    diff: &mut Diff,
    threshold: u64,
    moved_dirs: &[PathKey],
    dir_targets: &[PathKey],
) -> Result<Vec<(PathKey, PathKey)>> {
    let map = file_rename_map(config, diff, threshold, moved_dirs, dir_targets)?;
    let mut handled = HashSet::new();
    let mut out = Vec::new();

    // A global plan deletes destination-only directories after the renames,
    // so one standing on a target must block the rename.
    let mut blockers = diff.dst_only_files.clone();
    if config.global_renames {
        blockers.extend(diff.dst_only_dirs.iter().cloned());
    }

    for start in map.keys() {
        if handled.contains(start) {
            continue;
        }
        let Some(chain) = follow(
            &map,
            start,
            &mut handled,
            &blockers,
            &diff.src_only_files,
        ) else {
            continue;
        };
        out.extend(chain.ordered());

        let targets = chain.targets();
        let mut requeue = Vec::new();
        for (from, to) in &chain.links {
            if diff.src_only_files.remove(to) {
                release_new_dirs(diff, to.parent());
            }
            if let Some(old) = diff.file_matches.remove(from) {
                if !targets.contains(&old) {
                    requeue.push(old);
                }
            }
            diff.dst_only_files.remove(from);
        }
        diff.src_only_files.extend(requeue);
    }
    Ok(out)
}

struct DirChains {
    pairs: Vec<(PathKey, PathKey)>,
    moved: Vec<PathKey>,
    targets: Vec<PathKey>,
}

fn dir_rename_map(hashes: &DirHashes) -> BTreeMap<PathKey, PathKey> {
    let dst_index = ReverseIndex::build(hashes.dst.bottom_up());
    let src_index = ReverseIndex::build(hashes.src.bottom_up());
    let mut map: BTreeMap<PathKey, PathKey> = BTreeMap::new();
    for (dst_dir, hash) in hashes.dst.bottom_up().rev() {
        if !matches!(dst_index.get(&hash), Lookup::Found(_)) {
            continue;
        }
        if map.keys().any(|d| dst_dir.is_relative_to(d)) {
            continue;
        }
        let Lookup::Found(&src_dir) = src_index.get(&hash) else {
            continue;
        };
        if dst_dir.is_lineage(src_dir) {
            continue;
        }
        map.insert(dst_dir.clone(), src_dir.clone());
    }
    map
}

fn dir_chains(diff: &mut Diff, hashes: &DirHashes) -> DirChains {
    let map = dir_rename_map(hashes);
    let mut handled = HashSet::new();
    let mut found = DirChains {
        pairs: Vec::new(),
        moved: Vec::new(),
        targets: Vec::new(),
    };
    let mut orphan_dirs = Vec::new();

    for (start, _) in hashes.dst.bottom_up().rev() {
        if !map.contains_key(start) || handled.contains(start) {
            continue;
        }
        let Some(chain) = follow(
            &map,
            start,
            &mut handled,
            &diff.dst_only_files,
            &diff.src_only_dirs,
        ) else {
            continue;
        };
        found.pairs.extend(chain.ordered());
        for (from, to) in chain.links {
            release_new_dirs(diff, Some(to.clone()));
            if let Some(old) = diff.dir_matches.remove(&from) {
                orphan_dirs.push(old);
            }
            diff.dst_only_dirs.remove(&from);
            found.moved.push(from);
            found.targets.push(to);
        }
    }
    if found.moved.is_empty() {
        return found;
    }

    // Everything below a moved directory travels with it.
    let moved = &found.moved;
    let targets = &found.targets;
    let under = |k: &PathKey, dirs: &[PathKey]| dirs.iter().any(|d| k.is_relative_to(d));
    let mut orphan_files = Vec::new();
    diff.dir_matches.retain(|d, s| {
        let keep = !under(d, moved);
        if !keep {
            orphan_dirs.push(s.clone());
        }
        keep
    });
    diff.file_matches.retain(|d, s| {
        let keep = !under(d, moved);
        if !keep {
            orphan_files.push(s.clone());
        }
        keep
    });
    diff.dst_only_dirs.retain(|d| !under(d, moved));
    diff.dst_only_files.retain(|d| !under(d, moved));
    diff.src_only_dirs.retain(|s| !under(s, targets));
    diff.src_only_files.retain(|s| !under(s, targets));
    diff.src_only_dirs
        .extend(orphan_dirs.into_iter().filter(|s| !under(s, targets)));
    diff.src_only_files
        .extend(orphan_files.into_iter().filter(|s| !under(s, targets)));
    found
}

/// Interleaves directory and file renames by source key while keeping the
/// order within each list. File renames below a renamed directory are
/// dropped.
fn merge(dirs: Vec<(PathKey, PathKey)>, files: Vec<(PathKey, PathKey)>) -> Vec<RenamePair> {
    let moved: Vec<PathKey> = dirs.iter().map(|(from, _)| from.clone()).collect();
    let mut dirs: Peekable<_> = dirs.into_iter().peekable();
    let mut files: Peekable<_> = files.into_iter().peekable();
    let mut out = Vec::new();
    loop {
        let take_dir = match (dirs.peek(), files.peek()) {
            (Some(d), Some(f)) => d.0.normalized() <= f.0.normalized(),
            (Some(_), None) => true,
            (None, Some(_)) => false,
            (None, None) => break,
        };
        if take_dir {
            if let Some((from, to)) = dirs.next() {
                out.push((from, to, EntryKind::Dir));
            }
        } else if let Some((from, to)) = files.next() {
            if !moved.iter().any(|m| from.is_relative_to(m)) {
                out.push((from, to, EntryKind::File));
            }
        }
    }
    out
}

/// Finds the renames of `diff` and removes the entries they account for
/// from its other collections.
///
/// Directory renames need `hashes` from a global walk; file renames are
/// skipped when the config has no rename threshold.
pub fn resolve<P: AbstractPath>(
    config: &SyncConfig<P>,
    diff: &mut Diff,
    hashes: Option<&DirHashes>,
) -> Result<Vec<RenamePair>> {
    let dirs = match hashes {
        Some(h) => dir_chains(diff, h),
        None => DirChains {
            pairs: Vec::new(),
            moved: Vec::new(),
            targets: Vec::new(),
        },
    };
    let files = match config.rename_threshold {
        Some(threshold) => file_chains(config, diff, threshold, &dirs.moved, &dirs.targets)?,
        None => Vec::new(),
    };
    Ok(merge(dirs.pairs, files))
}
