// crates/transport/src/memory.rs
//! In-memory endpoint.
//!
//! Behaves like a remote session: names are joined with `/`, timestamps are
//! kept to whole seconds when `remote` is set, and on a Windows platform
//! lookups fold case and read-only files refuse to be replaced or removed.
//! Faults can be injected per operation and path, and the whole endpoint can
//! be disconnected.
use crate::{AbstractPath, DirEntry, FileKind, Platform, Stat};
use filetime::FileTime;
use std::collections::BTreeMap;
use std::fmt;
use std::io::{self, Cursor};
use std::sync::{Arc, Mutex, MutexGuard};

const MAX_LINK_DEPTH: usize = 40;

#[derive(Clone, Copy, Debug)]
struct NodeMeta {
    atime: FileTime,
    mtime: FileTime,
    readonly: bool,
}

impl NodeMeta {
    fn at(mtime: FileTime) -> Self {
        Self {
            atime: mtime,
            mtime,
            readonly: false,
        }
    }
}

#[derive(Clone, Debug)]
enum Node {
    File { data: Vec<u8>, meta: NodeMeta },
    Dir { children: BTreeMap<String, Node>, meta: NodeMeta },
    Symlink { target: String, meta: NodeMeta },
}

impl Node {
    fn empty_dir() -> Self {
        Node::Dir {
            children: BTreeMap::new(),
            meta: NodeMeta::at(FileTime::zero()),
        }
    }

    fn meta(&self) -> &NodeMeta {
        match self {
            Node::File { meta, .. } | Node::Dir { meta, .. } | Node::Symlink { meta, .. } => meta,
        }
    }

    fn meta_mut(&mut self) -> &mut NodeMeta {
        match self {
            Node::File { meta, .. } | Node::Dir { meta, .. } | Node::Symlink { meta, .. } => meta,
        }
    }

    fn stat(&self) -> Stat {
        let meta = self.meta();
        let (kind, size) = match self {
            Node::File { data, .. } => (FileKind::File, data.len() as u64),
            Node::Dir { .. } => (FileKind::Dir, 0),
            Node::Symlink { target, .. } => (FileKind::Symlink, target.len() as u64),
        };
        Stat {
            kind,
            size,
            readonly: meta.readonly,
            atime: meta.atime,
            mtime: meta.mtime,
        }
    }
}

/// Operation class a fault can be attached to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FaultOp {
    Stat,
    Iterate,
    Open,
    Replace,
    Copy,
    Unlink,
    Rmdir,
    Mkdir,
    Symlink,
}

#[derive(Debug)]
struct Fault {
    op: FaultOp,
    key: String,
    kind: io::ErrorKind,
}

#[derive(Debug)]
struct State {
    root: Node,
    faults: Vec<Fault>,
    connected: bool,
}

/// Shared in-memory filesystem.
#[derive(Debug)]
pub struct MemoryFs {
    state: Mutex<State>,
    platform: Platform,
    case_insensitive: bool,
    remote: bool,
}

/// Builder for [`MemoryFs`].
#[derive(Debug, Default)]
#[must_use]
pub struct MemoryFsBuilder {
    platform: Platform,
    case_insensitive: Option<bool>,
    remote: bool,
}

impl MemoryFsBuilder {
    pub fn platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    /// Defaults to the platform's own case rules.
    pub fn case_insensitive(mut self, yes: bool) -> Self {
        self.case_insensitive = Some(yes);
        self
    }

    pub fn remote(mut self, remote: bool) -> Self {
        self.remote = remote;
        self
    }

    pub fn build(self) -> Arc<MemoryFs> {
        Arc::new(MemoryFs {
            state: Mutex::new(State {
                root: Node::empty_dir(),
                faults: Vec::new(),
                connected: true,
            }),
            platform: self.platform,
            case_insensitive: self
                .case_insensitive
                .unwrap_or_else(|| self.platform.folds_case()),
            remote: self.remote,
        })
    }
}

impl MemoryFs {
    pub fn builder() -> MemoryFsBuilder {
        MemoryFsBuilder::default()
    }

    /// Case-sensitive POSIX filesystem.
    pub fn new() -> Arc<Self> {
        Self::builder().build()
    }

    pub fn root(self: &Arc<Self>) -> MemoryPath {
        MemoryPath {
            fs: Arc::clone(self),
            parts: Vec::new(),
        }
    }

    /// Makes every later `op` on `path` (relative, `/`-separated) fail with `kind`.
    pub fn inject_fault(&self, op: FaultOp, path: &str, kind: io::ErrorKind) {
        let parts: Vec<String> = split(path);
        let key = self.key_of(&parts);
        self.lock().faults.push(Fault { op, key, kind });
    }

    pub fn clear_faults(&self) {
        self.lock().faults.clear();
    }

    /// A disconnected filesystem fails every call with `NotConnected`.
    pub fn set_connected(&self, connected: bool) {
        self.lock().connected = connected;
    }

    /// Every entry as `(path, contents)`; directories have no contents and
    /// symlinks render as `-> target`.
    pub fn entries(&self) -> Vec<(String, Option<Vec<u8>>)> {
        fn visit(node: &Node, prefix: &str, out: &mut Vec<(String, Option<Vec<u8>>)>) {
            if let Node::Dir { children, .. } = node {
                for (name, child) in children {
                    let path = if prefix.is_empty() {
                        name.clone()
                    } else {
                        format!("{prefix}/{name}")
                    };
                    match child {
                        Node::File { data, .. } => out.push((path, Some(data.clone()))),
                        Node::Symlink { target, .. } => {
                            out.push((path, Some(format!("-> {target}").into_bytes())))
                        }
                        Node::Dir { .. } => {
                            out.push((path.clone(), None));
                            visit(child, &path, out);
                        }
                    }
                }
            }
        }
        let state = self.lock();
        let mut out = Vec::new();
        visit(&state.root, "", &mut out);
        out
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn fold(&self, name: &str) -> String {
        if self.case_insensitive {
            name.to_lowercase()
        } else {
            name.to_string()
        }
    }

    fn key_of(&self, parts: &[String]) -> String {
        parts
            .iter()
            .map(|p| self.fold(p))
            .collect::<Vec<_>>()
            .join("/")
    }

    fn check(&self, state: &State, op: FaultOp, parts: &[String]) -> io::Result<()> {
        if !state.connected {
            return Err(io::Error::new(
                io::ErrorKind::NotConnected,
                "memory endpoint disconnected",
            ));
        }
        let key = self.key_of(parts);
        if let Some(fault) = state.faults.iter().find(|f| f.op == op && f.key == key) {
            return Err(io::Error::new(
                fault.kind,
                format!("/{key}: injected {:?} fault", fault.op),
            ));
        }
        Ok(())
    }

    fn clock(&self, t: FileTime) -> FileTime {
        if self.remote {
            FileTime::from_unix_time(t.unix_seconds(), 0)
        } else {
            t
        }
    }

    fn child_name<'a>(&self, children: &'a BTreeMap<String, Node>, name: &str) -> Option<&'a String> {
        if children.contains_key(name) {
            return children.get_key_value(name).map(|(k, _)| k);
        }
        if self.case_insensitive {
            let folded = self.fold(name);
            return children.keys().find(|k| self.fold(k) == folded);
        }
        None
    }

    /// Canonical (stored) names of `parts`, resolving symlinks on the way.
    fn canonical(&self, state: &State, parts: &[String], follow_last: bool) -> io::Result<Vec<String>> {
        self.canonical_depth(state, parts, follow_last, 0)
    }

    fn canonical_depth(
        &self,
        state: &State,
        parts: &[String],
        follow_last: bool,
        depth: usize,
    ) -> io::Result<Vec<String>> {
        if depth > MAX_LINK_DEPTH {
            return Err(io::Error::other("too many levels of symbolic links"));
        }
        let mut canon: Vec<String> = Vec::new();
        for (i, part) in parts.iter().enumerate() {
            let node = node_at(&state.root, &canon).ok_or_else(|| not_found(parts))?;
            let Node::Dir { children, .. } = node else {
                return Err(not_found(parts));
            };
            let name = self.child_name(children, part).ok_or_else(|| not_found(parts))?;
            let child = &children[name];
            let last = i + 1 == parts.len();
            if let Node::Symlink { target, .. } = child {
                if !last || follow_last {
                    let mut joined = if target.starts_with('/') {
                        Vec::new()
                    } else {
                        canon.clone()
                    };
                    for seg in target.split('/') {
                        match seg {
                            "" | "." => {}
                            ".." => {
                                joined.pop();
                            }
                            s => joined.push(s.to_string()),
                        }
                    }
                    canon = self.canonical_depth(state, &joined, true, depth + 1)?;
                    continue;
                }
            }
            canon.push(name.clone());
        }
        Ok(canon)
    }
}

fn split(path: &str) -> Vec<String> {
    path.split('/')
        .filter(|s| !s.is_empty() && *s != ".")
        .map(str::to_string)
        .collect()
}

fn not_found(parts: &[String]) -> io::Error {
    io::Error::new(
        io::ErrorKind::NotFound,
        format!("/{}: no such file or directory", parts.join("/")),
    )
}

fn node_at<'a>(root: &'a Node, canon: &[String]) -> Option<&'a Node> {
    let mut node = root;
    for name in canon {
        match node {
            Node::Dir { children, .. } => node = children.get(name)?,
            _ => return None,
        }
    }
    Some(node)
}

fn node_at_mut<'a>(root: &'a mut Node, canon: &[String]) -> Option<&'a mut Node> {
    let mut node = root;
    for name in canon {
        match node {
            Node::Dir { children, .. } => node = children.get_mut(name)?,
            _ => return None,
        }
    }
    Some(node)
}

fn children_mut<'a>(root: &'a mut Node, canon: &[String], parts: &[String]) -> io::Result<&'a mut BTreeMap<String, Node>> {
    match node_at_mut(root, canon) {
        Some(Node::Dir { children, .. }) => Ok(children),
        Some(_) => Err(io::Error::new(
            io::ErrorKind::NotADirectory,
            format!("/{}: not a directory", parts.join("/")),
        )),
        None => Err(not_found(parts)),
    }
}

/// Path inside a [`MemoryFs`].
#[derive(Clone)]
pub struct MemoryPath {
    fs: Arc<MemoryFs>,
    parts: Vec<String>,
}

impl fmt::Debug for MemoryPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MemoryPath({self})")
    }
}

impl fmt::Display for MemoryPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "mem:/{}", self.parts.join("/"))
    }
}

impl MemoryPath {
    pub fn fs(&self) -> &Arc<MemoryFs> {
        &self.fs
    }

    /// Writes a regular file, creating missing parents, with the given
    /// modification time in seconds since the epoch.
    pub fn write(&self, data: &[u8], mtime: i64) -> io::Result<()> {
        if let Some(parent) = self.parent() {
            parent.mkdir(true, true)?;
        }
        let fs = &self.fs;
        let mut state = fs.lock();
        fs.check(&state, FaultOp::Copy, &self.parts)?;
        let (name, parent) = self.split_last()?;
        let canon = fs.canonical(&state, &parent, true)?;
        let children = children_mut(&mut state.root, &canon, &self.parts)?;
        if let Some(existing) = fs.child_name(children, &name).cloned() {
            children.remove(&existing);
        }
        let t = fs.clock(FileTime::from_unix_time(mtime, 0));
        children.insert(
            name,
            Node::File {
                data: data.to_vec(),
                meta: NodeMeta::at(t),
            },
        );
        Ok(())
    }

    pub fn read(&self) -> io::Result<Vec<u8>> {
        let fs = &self.fs;
        let state = fs.lock();
        fs.check(&state, FaultOp::Open, &self.parts)?;
        let canon = fs.canonical(&state, &self.parts, true)?;
        match node_at(&state.root, &canon) {
            Some(Node::File { data, .. }) => Ok(data.clone()),
            Some(_) => Err(io::Error::new(
                io::ErrorKind::IsADirectory,
                format!("{self}: not a regular file"),
            )),
            None => Err(not_found(&self.parts)),
        }
    }

    fn split_last(&self) -> io::Result<(String, Vec<String>)> {
        match self.parts.split_last() {
            Some((name, parent)) => Ok((name.clone(), parent.to_vec())),
            None => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "operation not permitted on the root",
            )),
        }
    }

    fn protected(&self, node: &Node) -> bool {
        self.fs.platform == Platform::Windows && node.meta().readonly
    }
}

impl AbstractPath for MemoryPath {
    type Reader = Cursor<Vec<u8>>;

    fn join(&self, name: &str) -> Self {
        let mut parts = self.parts.clone();
        parts.extend(split(name));
        Self {
            fs: Arc::clone(&self.fs),
            parts,
        }
    }

    fn parent(&self) -> Option<Self> {
        let (_, parent) = self.parts.split_last()?;
        Some(Self {
            fs: Arc::clone(&self.fs),
            parts: parent.to_vec(),
        })
    }

    fn name(&self) -> Option<String> {
        self.parts.last().cloned()
    }

    fn separator(&self) -> char {
        '/'
    }

    fn platform(&self) -> Platform {
        self.fs.platform
    }

    fn is_remote(&self) -> bool {
        self.fs.remote
    }

    fn stat(&self, follow_symlinks: bool) -> io::Result<Stat> {
        let fs = &self.fs;
        let state = fs.lock();
        fs.check(&state, FaultOp::Stat, &self.parts)?;
        let canon = fs.canonical(&state, &self.parts, follow_symlinks)?;
        node_at(&state.root, &canon)
            .map(Node::stat)
            .ok_or_else(|| not_found(&self.parts))
    }

    fn resolve(&self) -> io::Result<String> {
        let fs = &self.fs;
        let state = fs.lock();
        fs.check(&state, FaultOp::Stat, &self.parts)?;
        let canon = fs.canonical(&state, &self.parts, true)?;
        Ok(format!("/{}", fs.key_of(&canon)))
    }

    fn iterate(&self) -> io::Result<Vec<DirEntry<Self>>> {
        let fs = &self.fs;
        let state = fs.lock();
        fs.check(&state, FaultOp::Iterate, &self.parts)?;
        let canon = fs.canonical(&state, &self.parts, true)?;
        match node_at(&state.root, &canon) {
            Some(Node::Dir { children, .. }) => Ok(children
                .iter()
                .map(|(name, node)| DirEntry {
                    path: self.join(name),
                    name: name.clone(),
                    stat: node.stat(),
                })
                .collect()),
            Some(_) => Err(io::Error::new(
                io::ErrorKind::NotADirectory,
                format!("{self}: not a directory"),
            )),
            None => Err(not_found(&self.parts)),
        }
    }

    fn mkdir(&self, parents: bool, exist_ok: bool) -> io::Result<()> {
        let fs = &self.fs;
        let mut state = fs.lock();
        fs.check(&state, FaultOp::Mkdir, &self.parts)?;
        let mut canon: Vec<String> = Vec::new();
        for (i, part) in self.parts.iter().enumerate() {
            let last = i + 1 == self.parts.len();
            let prefix = &self.parts[..=i];
            let existing = {
                let children = children_mut(&mut state.root, &canon, prefix)?;
                fs.child_name(children, part).cloned()
            };
            match existing {
                Some(name) => {
                    let resolved = fs.canonical(&state, &{
                        let mut p = canon.clone();
                        p.push(name);
                        p
                    }, true)?;
                    let is_dir = matches!(node_at(&state.root, &resolved), Some(Node::Dir { .. }));
                    if last {
                        return if exist_ok && is_dir {
                            Ok(())
                        } else {
                            Err(io::Error::new(
                                io::ErrorKind::AlreadyExists,
                                format!("{self}: already exists"),
                            ))
                        };
                    }
                    if !is_dir {
                        return Err(io::Error::new(
                            io::ErrorKind::NotADirectory,
                            format!("{self}: not a directory"),
                        ));
                    }
                    canon = resolved;
                }
                None => {
                    if !last && !parents {
                        return Err(not_found(prefix));
                    }
                    let children = children_mut(&mut state.root, &canon, prefix)?;
                    children.insert(part.clone(), Node::empty_dir());
                    canon.push(part.clone());
                }
            }
        }
        if self.parts.is_empty() && !exist_ok {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("{self}: already exists"),
            ));
        }
        Ok(())
    }

    fn rmdir(&self) -> io::Result<()> {
        let fs = &self.fs;
        let mut state = fs.lock();
        fs.check(&state, FaultOp::Rmdir, &self.parts)?;
        let canon = fs.canonical(&state, &self.parts, false)?;
        let Some((name, parent)) = canon.split_last() else {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "cannot remove the root",
            ));
        };
        match node_at(&state.root, &canon) {
            Some(Node::Dir { children, .. }) if children.is_empty() => {}
            Some(Node::Dir { .. }) => {
                return Err(io::Error::new(
                    io::ErrorKind::DirectoryNotEmpty,
                    format!("{self}: directory not empty"),
                ));
            }
            Some(_) => {
                return Err(io::Error::new(
                    io::ErrorKind::NotADirectory,
                    format!("{self}: not a directory"),
                ));
            }
            None => return Err(not_found(&self.parts)),
        }
        children_mut(&mut state.root, parent, &self.parts)?.remove(name);
        Ok(())
    }

    fn unlink(&self) -> io::Result<()> {
        let fs = &self.fs;
        let mut state = fs.lock();
        fs.check(&state, FaultOp::Unlink, &self.parts)?;
        let canon = fs.canonical(&state, &self.parts, false)?;
        let Some((name, parent)) = canon.split_last() else {
            return Err(io::Error::new(
                io::ErrorKind::IsADirectory,
                "cannot unlink the root",
            ));
        };
        match node_at(&state.root, &canon) {
            Some(Node::Dir { .. }) => {
                return Err(io::Error::new(
                    io::ErrorKind::IsADirectory,
                    format!("{self}: is a directory"),
                ));
            }
            Some(node) if self.protected(node) => {
                return Err(io::Error::new(
                    io::ErrorKind::PermissionDenied,
                    format!("{self}: read-only file"),
                ));
            }
            Some(_) => {}
            None => return Err(not_found(&self.parts)),
        }
        children_mut(&mut state.root, parent, &self.parts)?.remove(name);
        Ok(())
    }

    fn open(&self) -> io::Result<Self::Reader> {
        self.read().map(Cursor::new)
    }

    fn replace(&self, target: &Self) -> io::Result<()> {
        let fs = &self.fs;
        if !Arc::ptr_eq(fs, &target.fs) {
            return Err(io::Error::new(
                io::ErrorKind::CrossesDevices,
                format!("{self} -> {target}: different filesystems"),
            ));
        }
        let mut state = fs.lock();
        fs.check(&state, FaultOp::Replace, &self.parts)?;
        let src = fs.canonical(&state, &self.parts, false)?;
        let Some((src_name, src_parent)) = src.split_last() else {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "cannot move the root"));
        };
        let (dst_name, dst_parent) = target.split_last()?;
        let dst_parent = fs.canonical(&state, &dst_parent, true)?;
        let existing = {
            let children = children_mut(&mut state.root, &dst_parent, &target.parts)?;
            fs.child_name(children, &dst_name).cloned()
        };
        if let Some(existing) = &existing {
            let mut dst_path = dst_parent.clone();
            dst_path.push(existing.clone());
            if dst_path != src {
                let src_node = node_at(&state.root, &src).ok_or_else(|| not_found(&self.parts))?;
                let dst_node = node_at(&state.root, &dst_path).ok_or_else(|| not_found(&target.parts))?;
                match (src_node, dst_node) {
                    (Node::Dir { .. }, Node::Dir { children, .. }) if children.is_empty() => {}
                    (_, Node::Dir { .. }) => {
                        return Err(io::Error::new(
                            io::ErrorKind::IsADirectory,
                            format!("{target}: is a directory"),
                        ));
                    }
                    (_, node) if target.protected(node) => {
                        return Err(io::Error::new(
                            io::ErrorKind::PermissionDenied,
                            format!("{target}: read-only file"),
                        ));
                    }
                    _ => {}
                }
            }
        }
        if dst_parent.starts_with(&src) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{self} -> {target}: cannot move a directory into itself"),
            ));
        }
        let node = children_mut(&mut state.root, src_parent, &self.parts)?
            .remove(src_name)
            .ok_or_else(|| not_found(&self.parts))?;
        let children = children_mut(&mut state.root, &dst_parent, &target.parts)?;
        if let Some(existing) = existing {
            children.remove(&existing);
        }
        children.insert(dst_name, node);
        Ok(())
    }

    fn relative_to(&self, root: &Self) -> Option<String> {
        if !Arc::ptr_eq(&self.fs, &root.fs) || root.parts.len() > self.parts.len() {
            return None;
        }
        let same = self
            .parts
            .iter()
            .zip(&root.parts)
            .all(|(a, b)| self.fs.fold(a) == self.fs.fold(b));
        same.then(|| self.parts[root.parts.len()..].join("/"))
    }

    fn set_readonly(&self, readonly: bool) -> io::Result<()> {
        let fs = &self.fs;
        let mut state = fs.lock();
        fs.check(&state, FaultOp::Stat, &self.parts)?;
        let canon = fs.canonical(&state, &self.parts, false)?;
        let node = node_at_mut(&mut state.root, &canon).ok_or_else(|| not_found(&self.parts))?;
        node.meta_mut().readonly = readonly;
        Ok(())
    }

    fn read_link(&self) -> io::Result<String> {
        let fs = &self.fs;
        let state = fs.lock();
        fs.check(&state, FaultOp::Open, &self.parts)?;
        let canon = fs.canonical(&state, &self.parts, false)?;
        match node_at(&state.root, &canon) {
            Some(Node::Symlink { target, .. }) => Ok(target.clone()),
            Some(_) => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{self}: not a symlink"),
            )),
            None => Err(not_found(&self.parts)),
        }
    }

    fn symlink(&self, target: &str, _target_is_dir: bool) -> io::Result<()> {
        let fs = &self.fs;
        let mut state = fs.lock();
        fs.check(&state, FaultOp::Symlink, &self.parts)?;
        let (name, parent) = self.split_last()?;
        let canon = fs.canonical(&state, &parent, true)?;
        let t = fs.clock(FileTime::now());
        let children = children_mut(&mut state.root, &canon, &self.parts)?;
        if fs.child_name(children, &name).is_some() {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("{self}: already exists"),
            ));
        }
        children.insert(
            name,
            Node::Symlink {
                target: target.to_string(),
                meta: NodeMeta::at(t),
            },
        );
        Ok(())
    }

    fn copy_file(&self, dst: &Self, follow_symlinks: bool) -> io::Result<()> {
        let mut node = {
            let fs = &self.fs;
            let state = fs.lock();
            fs.check(&state, FaultOp::Open, &self.parts)?;
            let canon = fs.canonical(&state, &self.parts, follow_symlinks)?;
            match node_at(&state.root, &canon) {
                Some(Node::Dir { .. }) => {
                    return Err(io::Error::new(
                        io::ErrorKind::IsADirectory,
                        format!("{self}: is a directory"),
                    ));
                }
                Some(node) => node.clone(),
                None => return Err(not_found(&self.parts)),
            }
        };
        let fs = &dst.fs;
        let mut state = fs.lock();
        fs.check(&state, FaultOp::Copy, &dst.parts)?;
        let meta = node.meta_mut();
        meta.readonly = false;
        meta.mtime = fs.clock(meta.mtime);
        meta.atime = fs.clock(meta.atime);
        let (name, parent) = dst.split_last()?;
        let canon = fs.canonical(&state, &parent, true)?;
        let children = children_mut(&mut state.root, &canon, &dst.parts)?;
        if let Some(existing) = fs.child_name(children, &name).cloned() {
            if let Some(old) = children.get(&existing) {
                if matches!(old, Node::Dir { .. }) {
                    return Err(io::Error::new(
                        io::ErrorKind::IsADirectory,
                        format!("{dst}: is a directory"),
                    ));
                }
                if dst.protected(old) {
                    return Err(io::Error::new(
                        io::ErrorKind::PermissionDenied,
                        format!("{dst}: read-only file"),
                    ));
                }
            }
            children.remove(&existing);
        }
        children.insert(name, node);
        Ok(())
    }

    fn set_times(&self, atime: FileTime, mtime: FileTime, follow_symlinks: bool) -> io::Result<()> {
        let fs = &self.fs;
        let mut state = fs.lock();
        fs.check(&state, FaultOp::Stat, &self.parts)?;
        let canon = fs.canonical(&state, &self.parts, follow_symlinks)?;
        let (atime, mtime) = (fs.clock(atime), fs.clock(mtime));
        let node = node_at_mut(&mut state.root, &canon).ok_or_else(|| not_found(&self.parts))?;
        let meta = node.meta_mut();
        meta.atime = atime;
        meta.mtime = mtime;
        Ok(())
    }

    fn same_filesystem(&self, other: &Self) -> io::Result<bool> {
        Ok(Arc::ptr_eq(&self.fs, &other.fs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn case_only_replace_renames_in_place() {
        let fs = MemoryFs::builder().platform(Platform::Windows).build();
        let root = fs.root();
        root.join("Foo.TXT").write(b"x", 10).unwrap();
        root.join("Foo.TXT").replace(&root.join("foo.txt")).unwrap();
        let names: Vec<String> = fs.entries().into_iter().map(|(p, _)| p).collect();
        assert_eq!(names, vec!["foo.txt".to_string()]);
    }

    #[test]
    fn readonly_target_blocks_replace_on_windows() {
        let fs = MemoryFs::builder().platform(Platform::Windows).build();
        let root = fs.root();
        root.join("a").write(b"new", 1).unwrap();
        root.join("b").write(b"old", 1).unwrap();
        root.join("b").set_readonly(true).unwrap();
        let err = root.join("a").replace(&root.join("b")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);
        root.join("b").set_readonly(false).unwrap();
        root.join("a").replace(&root.join("b")).unwrap();
        assert_eq!(root.join("b").read().unwrap(), b"new");
    }

    #[test]
    fn symlinks_resolve_relative_targets() {
        let fs = MemoryFs::new();
        let root = fs.root();
        root.join("d/f").write(b"data", 5).unwrap();
        root.join("link").symlink("d", true).unwrap();
        assert!(root.join("link").is_dir());
        assert!(root.join("link").is_symlink());
        assert_eq!(root.join("link/f").read().unwrap(), b"data");
        assert_eq!(root.join("link").resolve().unwrap(), "/d");
    }

    #[test]
    fn remote_truncates_timestamps() {
        let fs = MemoryFs::builder().remote(true).build();
        let f = fs.root().join("f");
        f.write(b"", 0).unwrap();
        f.set_times(FileTime::zero(), FileTime::from_unix_time(7, 900), true)
            .unwrap();
        assert_eq!(f.stat(true).unwrap().mtime, FileTime::from_unix_time(7, 0));
    }

    #[test]
    fn disconnect_fails_every_call() {
        let fs = MemoryFs::new();
        fs.set_connected(false);
        let err = fs.root().iterate().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotConnected);
        assert!(crate::is_connection_error(&err));
    }
}
