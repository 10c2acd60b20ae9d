// crates/walk/src/scan.rs
use crate::{DirListing, Entry, ScanOptions, SymlinkMode, list_dir};
use std::collections::{HashSet, VecDeque};
use std::io;
use transport::AbstractPath;

enum Frame<P> {
    Enter(P),
    /// Leaves a directory entered through its canonical path.
    Leave(String),
}

/// Lazy depth-first scan of one tree.
///
/// Each directory is read when the iterator reaches it; its files come out
/// before any of its sub-directories are opened. The root itself is never
/// yielded.
pub struct TreeScanner<'a, P: AbstractPath> {
    root: P,
    opts: ScanOptions<'a>,
    stack: Vec<Frame<P>>,
    pending: VecDeque<Entry>,
    ancestors: HashSet<String>,
}

impl<'a, P: AbstractPath> TreeScanner<'a, P> {
    pub fn new(root: P, opts: ScanOptions<'a>) -> Self {
        Self {
            stack: vec![Frame::Enter(root.clone())],
            root,
            opts,
            pending: VecDeque::new(),
            ancestors: HashSet::new(),
        }
    }

    fn visit(&mut self, dir: P) -> io::Result<()> {
        if self.opts.symlinks == SymlinkMode::Follow {
            let canonical = dir.resolve()?;
            if !self.ancestors.insert(canonical.clone()) {
                tracing::warn!(
                    target: "rensync::scan",
                    "Symlink circular reference: {dir} -> {canonical}"
                );
                return Ok(());
            }
            self.stack.push(Frame::Leave(canonical));
        }

        let listing: DirListing = list_dir(Some(&dir), &self.root, &self.opts)?;
        if let Some(key) = listing.parent.as_ref().filter(|k| !k.is_root()) {
            self.pending.push_back(if listing.is_empty() {
                Entry::EmptyDir { key: key.clone() }
            } else {
                Entry::NonEmptyDir { key: key.clone() }
            });
        }
        for key in listing.files {
            if let Some(meta) = listing.file_meta.get(&key).copied() {
                self.pending.push_back(Entry::File { key, meta });
            }
        }
        for key in listing.dirs.iter().rev() {
            let mut path = self.root.clone();
            for part in key.parts() {
                path = path.join(part);
            }
            self.stack.push(Frame::Enter(path));
        }
        Ok(())
    }
}

impl<P: AbstractPath> Iterator for TreeScanner<'_, P> {
    type Item = io::Result<Entry>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(entry) = self.pending.pop_front() {
                return Some(Ok(entry));
            }
            match self.stack.pop()? {
                Frame::Leave(canonical) => {
                    self.ancestors.remove(&canonical);
                }
                Frame::Enter(dir) => {
                    if let Err(e) = self.visit(dir) {
                        return Some(Err(e));
                    }
                }
            }
        }
    }
}
