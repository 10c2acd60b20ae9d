// crates/engine/src/ops.rs
use logging::Tag;
use std::cmp::Ordering;
use std::fmt;
use walk::PathKey;

/// One filesystem change on the destination. Keys are relative to the
/// destination root (or to the source root for `src`) and rendered with the
/// destination separator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Operation {
    Rename { dst: PathKey, target: PathKey },
    RenameDir { dst: PathKey, target: PathKey },
    Delete { dst: PathKey, size: u64 },
    /// Removes an empty directory.
    DeleteDir { dst: PathKey },
    Trash { dst: PathKey },
    TrashDir { dst: PathKey },
    Update { src: PathKey, dst: PathKey, byte_diff: i64 },
    Create { src: PathKey, dst: PathKey, size: u64 },
    CreateSymlink { src: PathKey, dst: PathKey, target: String },
    CreateDir { dst: PathKey },
}

impl Operation {
    pub fn dst(&self) -> &PathKey {
        match self {
            Operation::Rename { dst, .. }
            | Operation::RenameDir { dst, .. }
            | Operation::Delete { dst, .. }
            | Operation::DeleteDir { dst }
            | Operation::Trash { dst }
            | Operation::TrashDir { dst }
            | Operation::Update { dst, .. }
            | Operation::Create { dst, .. }
            | Operation::CreateSymlink { dst, .. }
            | Operation::CreateDir { dst } => dst,
        }
    }

    /// Expected change of the destination's total size, in bytes.
    pub fn byte_diff(&self) -> i64 {
        match self {
            Operation::Delete { size, .. } => -(*size as i64),
            Operation::Update { byte_diff, .. } => *byte_diff,
            Operation::Create { size, .. } => *size as i64,
            _ => 0,
        }
    }

    pub fn tag(&self) -> Tag {
        match self {
            Operation::Rename { .. } | Operation::RenameDir { .. } => Tag::Rename,
            Operation::Delete { .. } => Tag::Delete,
            Operation::Trash { .. } | Operation::TrashDir { .. } => Tag::Trash,
            Operation::Update { .. } => Tag::Update,
            Operation::Create { .. } | Operation::CreateSymlink { .. } => Tag::Create,
            Operation::DeleteDir { .. } | Operation::CreateDir { .. } => Tag::Dir,
        }
    }

    pub fn is_dir(&self) -> bool {
        matches!(
            self,
            Operation::RenameDir { .. }
                | Operation::DeleteDir { .. }
                | Operation::TrashDir { .. }
                | Operation::CreateDir { .. }
        )
    }

    /// One-line description logged when the operation runs.
    pub fn summary(&self) -> String {
        self.to_string()
    }

    /// Path this operation needs to find in place.
    fn input(&self) -> Option<&PathKey> {
        match self {
            Operation::Create { dst, .. }
            | Operation::CreateSymlink { dst, .. }
            | Operation::CreateDir { dst } => Some(dst),
            Operation::Rename { target, .. } | Operation::RenameDir { target, .. } => Some(target),
            _ => None,
        }
    }

    /// Path this operation vacates or brings into existence.
    fn output(&self) -> Option<&PathKey> {
        match self {
            Operation::Rename { dst, .. }
            | Operation::RenameDir { dst, .. }
            | Operation::Delete { dst, .. }
            | Operation::DeleteDir { dst }
            | Operation::Trash { dst }
            | Operation::TrashDir { dst }
            | Operation::CreateDir { dst } => Some(dst),
            _ => None,
        }
    }

    /// Whether this operation cannot succeed when `other` did not happen.
    pub fn depends_on(&self, other: &Operation) -> bool {
        match (self.input(), other.output()) {
            (Some(input), Some(output)) => input.is_relative_to(output),
            _ => false,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sep = self.dst().separator();
        match self {
            Operation::Rename { dst, target } => write!(f, "R {dst} -> {target}"),
            Operation::RenameDir { dst, target } => write!(f, "R {dst}{sep} -> {target}{sep}"),
            Operation::Delete { dst, .. } => write!(f, "- {dst}"),
            Operation::DeleteDir { dst } => write!(f, "- {dst}{sep}"),
            Operation::Trash { dst } => write!(f, "T {dst}"),
            Operation::TrashDir { dst } => write!(f, "T {dst}{sep}"),
            Operation::Update { dst, .. } => write!(f, "U {dst}"),
            Operation::Create { dst, .. } => write!(f, "+ {dst}"),
            Operation::CreateSymlink { dst, target, .. } => write!(f, "L {dst} -> {target}"),
            Operation::CreateDir { dst } => write!(f, "+ {dst}{sep}"),
        }
    }
}

/// Order in which deletions are applied: descendants before their
/// ancestors, otherwise by normalized path.
pub fn delete_order(a: &Operation, b: &Operation) -> Ordering {
    let (a, b) = (a.dst().normalized(), b.dst().normalized());
    match a.iter().zip(b).find(|(x, y)| x != y) {
        Some((x, y)) => x.cmp(y),
        None => b.len().cmp(&a.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use transport::Platform;

    fn key(s: &str) -> PathKey {
        PathKey::new(s, '/', Platform::Posix).unwrap()
    }

    #[test]
    fn summaries() {
        let cases = [
            (Operation::Rename { dst: key("a"), target: key("b") }, "R a -> b"),
            (Operation::RenameDir { dst: key("a"), target: key("b") }, "R a/ -> b/"),
            (Operation::Delete { dst: key("a"), size: 3 }, "- a"),
            (Operation::DeleteDir { dst: key("d") }, "- d/"),
            (Operation::TrashDir { dst: key("d") }, "T d/"),
            (
                Operation::CreateSymlink { src: key("l"), dst: key("l"), target: "x".into() },
                "L l -> x",
            ),
            (Operation::CreateDir { dst: key("d/e") }, "+ d/e/"),
        ];
        for (op, want) in cases {
            assert_eq!(op.summary(), want);
        }
        let nt = PathKey::new("d\\e", '\\', Platform::Windows).unwrap();
        assert_eq!(Operation::CreateDir { dst: nt }.summary(), "+ d\\e\\");
    }

    #[test]
    fn byte_diffs() {
        assert_eq!(Operation::Delete { dst: key("a"), size: 10 }.byte_diff(), -10);
        assert_eq!(
            Operation::Update { src: key("a"), dst: key("a"), byte_diff: -4 }.byte_diff(),
            -4
        );
        assert_eq!(Operation::Create { src: key("a"), dst: key("a"), size: 7 }.byte_diff(), 7);
        assert_eq!(Operation::Trash { dst: key("a") }.byte_diff(), 0);
    }

    #[test]
    fn dependencies_follow_paths() {
        let mkdir = Operation::CreateDir { dst: key("d") };
        let create = Operation::Create { src: key("d/f"), dst: key("d/f"), size: 1 };
        let rename = Operation::Rename { dst: key("x"), target: key("y") };
        let back = Operation::Rename { dst: key("y"), target: key("x") };
        assert!(create.depends_on(&mkdir));
        assert!(!mkdir.depends_on(&create));
        assert!(back.depends_on(&rename));
        assert!(!Operation::Trash { dst: key("x") }.depends_on(&rename));
        assert!(!create.depends_on(&Operation::Update { src: key("d"), dst: key("d"), byte_diff: 0 }));
    }

    #[test]
    fn deletes_children_first() {
        let mut ops = vec![
            Operation::DeleteDir { dst: key("a") },
            Operation::Delete { dst: key("b"), size: 0 },
            Operation::Delete { dst: key("a/x"), size: 0 },
            Operation::DeleteDir { dst: key("a/s") },
            Operation::Delete { dst: key("a/s/f"), size: 0 },
        ];
        ops.sort_by(delete_order);
        let order: Vec<String> = ops.iter().map(Operation::summary).collect();
        assert_eq!(order, vec!["- a/s/f", "- a/s/", "- a/x", "- a/", "- b"]);
    }
}
