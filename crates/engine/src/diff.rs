// crates/engine/src/diff.rs
use logging::Tag;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use walk::{DirListing, Metadata, PathKey};

/// Whether a key names a file or a directory.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntryKind {
    File,
    Dir,
}

/// Classification of the entries of a directory pair, or of a whole tree
/// once per-directory diffs are merged with [`Diff::update`].
///
/// Matches are keyed by the destination entry and point at the source
/// entry they correspond to.
#[derive(Clone, Debug, Default)]
pub struct Diff {
    pub src_parent: Option<PathKey>,
    pub dst_parent: Option<PathKey>,
    pub src_file_meta: BTreeMap<PathKey, Metadata>,
    pub dst_file_meta: BTreeMap<PathKey, Metadata>,
    pub src_only_dirs: BTreeSet<PathKey>,
    pub dst_only_dirs: BTreeSet<PathKey>,
    pub src_only_files: BTreeSet<PathKey>,
    pub dst_only_files: BTreeSet<PathKey>,
    pub dir_matches: BTreeMap<PathKey, PathKey>,
    pub file_matches: BTreeMap<PathKey, PathKey>,
    /// Entries left out of rename detection because they conflict with
    /// another entry.
    pub ignored_src: HashSet<PathKey>,
    pub ignored_dst: HashSet<PathKey>,
    /// Source files that are symlinks.
    pub src_symlinks: BTreeSet<PathKey>,
}

impl Diff {
    /// Merges the collections of `other` into `self`. Parents are left alone.
    pub fn update(&mut self, other: Diff) {
        self.src_file_meta.extend(other.src_file_meta);
        self.dst_file_meta.extend(other.dst_file_meta);
        self.src_only_dirs.extend(other.src_only_dirs);
        self.dst_only_dirs.extend(other.dst_only_dirs);
        self.src_only_files.extend(other.src_only_files);
        self.dst_only_files.extend(other.dst_only_files);
        self.dir_matches.extend(other.dir_matches);
        self.file_matches.extend(other.file_matches);
        self.ignored_src.extend(other.ignored_src);
        self.ignored_dst.extend(other.ignored_dst);
        self.src_symlinks.extend(other.src_symlinks);
    }
}

/// Removes names that are sockets, fifos or devices on one side from the
/// candidates of the other side.
pub fn exclude_nonstandard(src: &mut DirListing, dst: &mut DirListing) {
    fn strip(listing: &mut DirListing, names: &[PathKey]) {
        if names.is_empty() {
            return;
        }
        let hit = |k: &PathKey| names.iter().any(|n| n.weak_eq(k));
        listing.files.retain(|k| !hit(k));
        listing.dirs.retain(|k| !hit(k));
        listing.file_meta.retain(|k, _| !hit(k));
    }
    let src_odd = src.nonstandard.clone();
    strip(src, &dst.nonstandard);
    strip(dst, &src_odd);
}

fn warn_ignored(what: &str, key: &PathKey, kind: EntryKind) {
    match kind {
        EntryKind::Dir => tracing::warn!(
            target: Tag::Ignore.target(),
            "Ignoring {what} dir: {key}{}",
            key.separator()
        ),
        EntryKind::File => {
            tracing::warn!(target: Tag::Ignore.target(), "Ignoring {what} file: {key}")
        }
    }
}

/// Final pairing of one destination entry.
enum Pairing {
    Matched(PathKey, EntryKind),
    Unmatched,
    Rejected,
}

/// Pairs one destination entry with its case-folded namesakes on the source
/// side. Returns the pairing and the source entries that lose.
fn pair(
    dst: &PathKey,
    dst_kind: EntryKind,
    candidates: &[(PathKey, EntryKind)],
    force_replace: bool,
) -> (Pairing, Vec<(PathKey, EntryKind)>) {
    if candidates.is_empty() {
        return (Pairing::Unmatched, Vec::new());
    }
    let mismatch = !force_replace && candidates.iter().any(|(_, kind)| *kind != dst_kind);
    let strong = candidates.iter().find(|(k, _)| k.name() == dst.name());
    let weak: Vec<&(PathKey, EntryKind)> = candidates
        .iter()
        .filter(|(k, _)| k.name() != dst.name())
        .collect();

    if mismatch || (strong.is_none() && weak.len() > 1) {
        return (Pairing::Rejected, candidates.to_vec());
    }
    match strong {
        Some((key, kind)) => (
            Pairing::Matched(key.clone(), *kind),
            weak.into_iter().cloned().collect(),
        ),
        None => {
            let (key, kind) = weak[0];
            (Pairing::Matched(key.clone(), *kind), Vec::new())
        }
    }
}

/// Partitions the children of a source and a destination directory.
///
/// A destination entry pairs with the source entry of the same name, or
/// failing that with the single source entry whose name folds to the same
/// normalized form. Several weak candidates, or candidates of a different
/// kind without `force_replace`, reject the destination entry and all of
/// its candidates. A kind mismatch under `force_replace` turns into a
/// source-only entry plus a destination-only entry.
pub fn dir_diff(mut src: DirListing, mut dst: DirListing, force_replace: bool) -> Diff {
    exclude_nonstandard(&mut src, &mut dst);

    let mut diff = Diff {
        src_parent: src.parent.take(),
        dst_parent: dst.parent.take(),
        src_file_meta: std::mem::take(&mut src.file_meta),
        dst_file_meta: std::mem::take(&mut dst.file_meta),
        src_symlinks: std::mem::take(&mut src.symlinks),
        ..Diff::default()
    };

    let tag = |keys: Vec<PathKey>, kind| keys.into_iter().map(move |k| (k, kind));
    let dst_entries = tag(dst.dirs, EntryKind::Dir).chain(tag(dst.files, EntryKind::File));
    let src_entries = tag(src.dirs, EntryKind::Dir).chain(tag(src.files, EntryKind::File));

    let mut in_dst: Vec<(PathKey, EntryKind, Vec<(PathKey, EntryKind)>)> = Vec::new();
    let mut dst_index: HashMap<Vec<String>, usize> = HashMap::new();
    for (key, kind) in dst_entries {
        if !dst_index.contains_key(key.normalized()) {
            dst_index.insert(key.normalized().to_vec(), in_dst.len());
            in_dst.push((key, kind, Vec::new()));
        }
    }

    let mut src_only: Vec<Vec<(PathKey, EntryKind)>> = Vec::new();
    let mut src_index: HashMap<Vec<String>, usize> = HashMap::new();
    for (key, kind) in src_entries {
        if let Some(&i) = dst_index.get(key.normalized()) {
            in_dst[i].2.push((key, kind));
        } else if let Some(&i) = src_index.get(key.normalized()) {
            src_only[i].push((key, kind));
        } else {
            src_index.insert(key.normalized().to_vec(), src_only.len());
            src_only.push(vec![(key, kind)]);
        }
    }

    for (dst_key, dst_kind, candidates) in in_dst {
        let (pairing, losers) = pair(&dst_key, dst_kind, &candidates, force_replace);
        for (key, kind) in losers {
            warn_ignored("conflicting", &key, kind);
            diff.ignored_src.insert(key);
        }
        match pairing {
            Pairing::Rejected => {
                warn_ignored("unmatched", &dst_key, dst_kind);
                diff.ignored_dst.insert(dst_key);
            }
            Pairing::Unmatched => match dst_kind {
                EntryKind::Dir => {
                    diff.dst_only_dirs.insert(dst_key);
                }
                EntryKind::File => {
                    diff.dst_only_files.insert(dst_key);
                }
            },
            Pairing::Matched(src_key, src_kind) => match (src_kind, dst_kind) {
                (EntryKind::Dir, EntryKind::Dir) => {
                    diff.dir_matches.insert(dst_key, src_key);
                }
                (EntryKind::File, EntryKind::File) => {
                    diff.file_matches.insert(dst_key, src_key);
                }
                (EntryKind::File, EntryKind::Dir) => {
                    diff.src_only_files.insert(src_key);
                    diff.dst_only_dirs.insert(dst_key);
                }
                (EntryKind::Dir, EntryKind::File) => {
                    diff.src_only_dirs.insert(src_key);
                    diff.dst_only_files.insert(dst_key);
                }
            },
        }
    }

    for group in src_only {
        if group.len() > 1 {
            for (key, kind) in group {
                warn_ignored("ambiguous", &key, kind);
                diff.ignored_src.insert(key);
            }
            continue;
        }
        for (key, kind) in group {
            match kind {
                EntryKind::Dir => diff.src_only_dirs.insert(key),
                EntryKind::File => diff.src_only_files.insert(key),
            };
        }
    }

    diff
}
