// crates/engine/src/dualwalk.rs
use crate::diff::{Diff, dir_diff, exclude_nonstandard};
use crate::{SyncConfig, locate};
use logging::Tag;
use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::hash::{Hash, Hasher};
use std::io;
use transport::AbstractPath;
use walk::{DirListing, Metadata, PathKey, ScanOptions, SymlinkMode, list_dir};

/// Content hashes of the directories of one tree, in the order they were
/// completed (children before parents).
#[derive(Clone, Debug, Default)]
pub struct TreeHashes {
    order: Vec<PathKey>,
    hashes: HashMap<PathKey, u64>,
}

impl TreeHashes {
    pub fn get(&self, key: &PathKey) -> Option<u64> {
        self.hashes.get(key).copied()
    }

    /// Directories with a known hash, deepest first.
    pub fn bottom_up(&self) -> impl DoubleEndedIterator<Item = (&PathKey, u64)> {
        self.order.iter().map(|k| (k, self.hashes[k]))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    fn record(&mut self, input: HashInput) {
        if !input.complete {
            return;
        }
        let mut dirs = Vec::with_capacity(input.dirs.len());
        for dir in &input.dirs {
            match self.get(dir) {
                Some(h) => dirs.push((dir.name().to_string(), h)),
                // Unknown below, unknown here.
                None => return,
            }
        }
        let mut files = input.files;
        files.sort();
        dirs.sort();
        let mut hasher = DefaultHasher::new();
        files.hash(&mut hasher);
        dirs.hash(&mut hasher);
        if self.hashes.insert(input.key.clone(), hasher.finish()).is_none() {
            self.order.push(input.key);
        }
    }
}

/// Directory hashes of both trees, gathered during a global walk.
#[derive(Clone, Debug, Default)]
pub struct DirHashes {
    pub src: TreeHashes,
    pub dst: TreeHashes,
}

struct HashInput {
    key: PathKey,
    /// Nothing was filtered out of the directory.
    complete: bool,
    files: Vec<(String, Metadata)>,
    dirs: Vec<PathKey>,
}

impl HashInput {
    fn of(listing: &DirListing) -> Option<Self> {
        let key = listing.parent.clone()?;
        Some(Self {
            key,
            complete: listing.files.len() + listing.dirs.len() == listing.dir_size,
            files: listing
                .files
                .iter()
                .filter_map(|k| listing.file_meta.get(k).map(|m| (k.name().to_string(), *m)))
                .collect(),
            dirs: listing.dirs.clone(),
        })
    }
}

#[derive(Default)]
struct Finish {
    src: Option<HashInput>,
    dst: Option<HashInput>,
    src_canonical: Option<String>,
    dst_canonical: Option<String>,
}

enum Task<P> {
    Visit {
        src: Option<P>,
        dst: Option<P>,
        bottom_up: bool,
    },
    Emit(Box<Diff>),
    Finish(Box<Finish>),
}

/// Walks the source and destination trees in step and yields one [`Diff`]
/// per directory pair.
///
/// Destination-only sub-trees are reported bottom-up before the diff of
/// their parent so their contents can be removed first. Matched and
/// source-only sub-directories follow the parent. Directories that cannot
/// be read are logged and left out; a lost connection ends the walk with
/// an error.
pub struct DualWalk<'a, P: AbstractPath> {
    config: &'a SyncConfig<P>,
    opts: ScanOptions<'a>,
    stack: Vec<Task<P>>,
    hashes: Option<DirHashes>,
    src_ancestors: HashSet<String>,
    dst_ancestors: HashSet<String>,
    abandoned: BTreeSet<PathKey>,
}

impl<'a, P: AbstractPath> DualWalk<'a, P> {
    /// Hashes are collected when global renames are enabled.
    pub fn new(config: &'a SyncConfig<P>) -> Self {
        Self {
            config,
            opts: config.scan_options(),
            stack: vec![Task::Visit {
                src: Some(config.src.clone()),
                dst: Some(config.dst.clone()),
                bottom_up: false,
            }],
            hashes: (config.global_renames && config.renames).then(DirHashes::default),
            src_ancestors: HashSet::new(),
            dst_ancestors: HashSet::new(),
            abandoned: BTreeSet::new(),
        }
    }

    /// Hashes of every directory finished so far.
    pub fn dir_hashes(&self) -> Option<&DirHashes> {
        self.hashes.as_ref()
    }

    /// Source directories whose contents were never listed, because they
    /// close a symlink cycle or could not be read.
    pub fn abandoned(&self) -> &BTreeSet<PathKey> {
        &self.abandoned
    }

    fn abandon(&mut self, path: &P) {
        let key = path
            .relative_to(&self.config.src)
            .and_then(|rel| PathKey::new(&rel, path.separator(), self.opts.platform).ok());
        if let Some(key) = key.filter(|k| !k.is_root()) {
            self.abandoned.insert(key);
        }
    }

    fn visit(&mut self, src: Option<P>, dst: Option<P>, bottom_up: bool) -> io::Result<()> {
        let slot = self.stack.len();
        self.stack.push(Task::Finish(Box::default()));
        let mut finish = Finish::default();
        let out = self.expand(src, dst, bottom_up, &mut finish);
        self.stack[slot] = Task::Finish(Box::new(finish));
        out
    }

    fn expand(
        &mut self,
        src: Option<P>,
        dst: Option<P>,
        bottom_up: bool,
        finish: &mut Finish,
    ) -> io::Result<()> {
        if self.opts.symlinks == SymlinkMode::Follow {
            if let Some(path) = &src {
                match enter(&mut self.src_ancestors, path) {
                    Ok(Entered::Yes(c)) => finish.src_canonical = c,
                    Ok(Entered::Cycle) => {
                        self.abandon(path);
                        return Ok(());
                    }
                    Err(e) => {
                        self.abandon(path);
                        return skip(path, e);
                    }
                }
            }
            if let Some(path) = &dst {
                match enter(&mut self.dst_ancestors, path) {
                    Ok(Entered::Yes(c)) => finish.dst_canonical = c,
                    Ok(Entered::Cycle) => return Ok(()),
                    Err(e) => return skip(path, e),
                }
            }
        }

        if let Some(path) = &src {
            tracing::debug!(target: Tag::Scan.target(), "scanning src: {path}");
        }
        if let Some(path) = &dst {
            tracing::debug!(target: Tag::Scan.target(), "scanning dst: {path}");
        }
        let mut src_list = match list_dir(src.as_ref(), &self.config.src, &self.opts) {
            Ok(listing) => listing,
            Err(e) => {
                let path = src.unwrap_or_else(|| self.config.src.clone());
                self.abandon(&path);
                return skip(&path, e);
            }
        };
        let mut dst_list = match list_dir(dst.as_ref(), &self.config.dst, &self.opts) {
            Ok(listing) => listing,
            Err(e) => return skip(dst.as_ref().unwrap_or(&self.config.dst), e),
        };
        exclude_nonstandard(&mut src_list, &mut dst_list);
        if self.hashes.is_some() {
            finish.src = HashInput::of(&src_list);
            finish.dst = HashInput::of(&dst_list);
        }

        let diff = dir_diff(src_list, dst_list, self.config.force_replace);
        let (src_root, dst_root) = (&self.config.src, &self.config.dst);
        let dst_only: Vec<Task<P>> = diff
            .dst_only_dirs
            .iter()
            .map(|k| Task::Visit {
                src: None,
                dst: Some(locate(dst_root, k)),
                bottom_up: true,
            })
            .collect();
        let matched = diff.dir_matches.iter().map(|(d, s)| Task::Visit {
            src: Some(locate(src_root, s)),
            dst: Some(locate(dst_root, d)),
            bottom_up,
        });
        let src_only = diff.src_only_dirs.iter().map(|k| Task::Visit {
            src: Some(locate(src_root, k)),
            dst: None,
            bottom_up,
        });
        let mut tasks = dst_only;
        if bottom_up {
            tasks.extend(matched);
            tasks.extend(src_only);
            tasks.push(Task::Emit(Box::new(diff)));
        } else {
            let later: Vec<Task<P>> = matched.chain(src_only).collect();
            tasks.push(Task::Emit(Box::new(diff)));
            tasks.extend(later);
        }
        self.stack.extend(tasks.into_iter().rev());
        Ok(())
    }

    fn finish(&mut self, finish: Finish) {
        if let Some(c) = finish.src_canonical {
            self.src_ancestors.remove(&c);
        }
        if let Some(c) = finish.dst_canonical {
            self.dst_ancestors.remove(&c);
        }
        if let Some(hashes) = &mut self.hashes {
            if let Some(input) = finish.src {
                hashes.src.record(input);
            }
            if let Some(input) = finish.dst {
                hashes.dst.record(input);
            }
        }
    }
}

enum Entered {
    /// Canonical path to release when the directory is done, if it exists.
    Yes(Option<String>),
    Cycle,
}

fn enter<P: AbstractPath>(ancestors: &mut HashSet<String>, path: &P) -> io::Result<Entered> {
    let canonical = match path.resolve() {
        Ok(c) => c,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Entered::Yes(None)),
        Err(e) => return Err(e),
    };
    if !ancestors.insert(canonical.clone()) {
        tracing::warn!(
            target: Tag::Scan.target(),
            "Symlink circular reference: {path} -> {canonical}"
        );
        return Ok(Entered::Cycle);
    }
    Ok(Entered::Yes(Some(canonical)))
}

fn skip<P: AbstractPath>(path: &P, err: io::Error) -> io::Result<()> {
    if transport::is_connection_error(&err) {
        return Err(err);
    }
    tracing::error!(target: Tag::Scan.target(), "Unreadable directory: {path}: {err}");
    Ok(())
}

impl<P: AbstractPath> Iterator for DualWalk<'_, P> {
    type Item = io::Result<Diff>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(task) = self.stack.pop() {
            match task {
                Task::Emit(diff) => return Some(Ok(*diff)),
                Task::Finish(finish) => self.finish(*finish),
                Task::Visit {
                    src,
                    dst,
                    bottom_up,
                } => {
                    if let Err(e) = self.visit(src, dst, bottom_up) {
                        self.stack.clear();
                        return Some(Err(e));
                    }
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use transport::{MemoryFs, MemoryPath};

    fn config(src: &MemoryPath, dst: &MemoryPath, global: bool) -> SyncConfig<MemoryPath> {
        SyncConfig::builder(src.clone(), dst.clone())
            .global_renames(global)
            .build()
            .unwrap()
    }

    fn parents(diffs: &[Diff]) -> Vec<String> {
        diffs
            .iter()
            .map(|d| {
                let side = |k: &Option<PathKey>| k.as_ref().map_or("-".to_string(), |k| k.to_string());
                format!("{}|{}", side(&d.src_parent), side(&d.dst_parent))
            })
            .collect()
    }

    #[test]
    fn dst_only_trees_come_first_and_bottom_up() {
        let fs = MemoryFs::new();
        let (src, dst) = (fs.root().join("src"), fs.root().join("dst"));
        src.join("m/f").write(b"1", 1).unwrap();
        src.join("new/g").write(b"1", 1).unwrap();
        dst.join("m/f").write(b"1", 1).unwrap();
        dst.join("old/sub/h").write(b"1", 1).unwrap();
        let cfg = config(&src, &dst, false);
        let diffs: Vec<Diff> = DualWalk::new(&cfg).map(Result::unwrap).collect();
        assert_eq!(
            parents(&diffs),
            vec!["-|old/sub", "-|old", ".|.", "m|m", "new|-"]
        );
    }

    #[test]
    fn hashes_match_for_identical_trees() {
        let fs = MemoryFs::new();
        let (src, dst) = (fs.root().join("src"), fs.root().join("dst"));
        src.join("b/x/f").write(b"1", 5).unwrap();
        dst.join("a/x/f").write(b"1", 5).unwrap();
        dst.join("c/f").write(b"12", 5).unwrap();
        let cfg = config(&src, &dst, true);
        let mut walk = DualWalk::new(&cfg);
        for diff in walk.by_ref() {
            diff.unwrap();
        }
        let hashes = walk.dir_hashes().unwrap();
        let k = |s: &str| PathKey::new(s, '/', transport::Platform::Posix).unwrap();
        assert_eq!(hashes.src.get(&k("b")), hashes.dst.get(&k("a")));
        assert_ne!(hashes.dst.get(&k("a")), hashes.dst.get(&k("c")));
        assert!(hashes.dst.get(&k("a/x")).is_some());
        let order: Vec<String> = hashes.dst.bottom_up().map(|(k, _)| k.to_string()).collect();
        let pos = |s: &str| order.iter().position(|o| o == s).unwrap();
        assert!(pos("a/x") < pos("a"));
        assert_eq!(order.last().map(String::as_str), Some("."));
    }

    #[test]
    fn filtered_children_leave_no_hash() {
        let fs = MemoryFs::new();
        let (src, dst) = (fs.root().join("src"), fs.root().join("dst"));
        src.mkdir(true, true).unwrap();
        dst.join("a/keep").write(b"1", 5).unwrap();
        dst.join("a/skip.tmp").write(b"1", 5).unwrap();
        let cfg = SyncConfig::builder(src.clone(), dst.clone())
            .global_renames(true)
            .filter(filters::Filter::new("- **/*.tmp + **/*/ **/*").unwrap())
            .build()
            .unwrap();
        let mut walk = DualWalk::new(&cfg);
        for diff in walk.by_ref() {
            diff.unwrap();
        }
        let k = PathKey::new("a", '/', transport::Platform::Posix).unwrap();
        assert_eq!(walk.dir_hashes().unwrap().dst.get(&k), None);
    }

    #[test]
    fn lost_connection_ends_the_walk() {
        let fs = MemoryFs::new();
        let (src, dst) = (fs.root().join("src"), fs.root().join("dst"));
        src.join("a/f").write(b"1", 1).unwrap();
        dst.mkdir(true, true).unwrap();
        let cfg = config(&src, &dst, false);
        let mut walk = DualWalk::new(&cfg);
        assert!(walk.next().unwrap().is_ok());
        fs.set_connected(false);
        let err = walk.next().unwrap().unwrap_err();
        assert!(transport::is_connection_error(&err));
        assert!(walk.next().is_none());
    }

    #[test]
    fn unreadable_directory_is_skipped() {
        let fs = MemoryFs::new();
        let (src, dst) = (fs.root().join("src"), fs.root().join("dst"));
        src.join("bad/f").write(b"1", 1).unwrap();
        src.join("good/f").write(b"1", 1).unwrap();
        dst.mkdir(true, true).unwrap();
        fs.inject_fault(
            transport::FaultOp::Iterate,
            "src/bad",
            io::ErrorKind::PermissionDenied,
        );
        let cfg = config(&src, &dst, false);
        let diffs: Vec<Diff> = DualWalk::new(&cfg).map(Result::unwrap).collect();
        assert_eq!(parents(&diffs), vec![".|.", "good|-"]);
    }
}
