// crates/walk/src/pathkey.rs
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use thiserror::Error;
use transport::Platform;

/// A relative path that cannot be represented on the destination system.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("incompatible path for {platform}: {path}")]
pub struct IncompatiblePath {
    pub path: String,
    pub platform: &'static str,
}

const RESERVED_CHARS: &[char] = &['<', '>', ':', '"', '|', '?', '*', '/', '\\'];
const RESERVED_DIGITS: &[char] = &[
    '1', '2', '3', '4', '5', '6', '7', '8', '9', '\u{b9}', '\u{b2}', '\u{b3}',
];

fn is_reserved_device(name: &str) -> bool {
    let base = name.split('.').next().unwrap_or_default().trim_end_matches(' ');
    let upper = base.to_uppercase();
    if matches!(
        upper.as_str(),
        "CON" | "PRN" | "AUX" | "NUL" | "CONIN$" | "CONOUT$"
    ) {
        return true;
    }
    let mut chars = upper.chars();
    let prefix: String = chars.by_ref().take(3).collect();
    let rest: Vec<char> = chars.collect();
    (prefix == "COM" || prefix == "LPT") && rest.len() == 1 && RESERVED_DIGITS.contains(&rest[0])
}

/// Whether `name` is unusable as a single path component on Windows.
pub fn is_reserved_windows_name(name: &str) -> bool {
    if name.ends_with('.') || name.ends_with(' ') {
        return true;
    }
    if name
        .chars()
        .any(|c| RESERVED_CHARS.contains(&c) || (c as u32) < 32)
    {
        return true;
    }
    is_reserved_device(name)
}

/// Identity of an entry relative to its sync root.
///
/// Equality and hashing use the raw parts, so `A.txt` and `a.txt` are
/// distinct keys. [`PathKey::weak_eq`] compares the parts as the destination
/// would, lower-cased when it folds case. The root directory is the empty key.
#[derive(Clone)]
pub struct PathKey {
    parts: Vec<String>,
    norm: Vec<String>,
    sep: char,
    platform: Platform,
}

impl PathKey {
    /// The sync root itself.
    pub fn root(sep: char, platform: Platform) -> Self {
        Self {
            parts: Vec::new(),
            norm: Vec::new(),
            sep,
            platform,
        }
    }

    /// Parses `relpath`, split on `sep`. An empty path or `.` is the root.
    pub fn new(relpath: &str, sep: char, platform: Platform) -> Result<Self, IncompatiblePath> {
        if relpath.is_empty() || relpath == "." {
            return Ok(Self::root(sep, platform));
        }
        Self::root(sep, platform).join_all(relpath.split(sep))
    }

    fn join_all<'a>(
        mut self,
        names: impl IntoIterator<Item = &'a str>,
    ) -> Result<Self, IncompatiblePath> {
        for name in names {
            self = self.join(name)?;
        }
        Ok(self)
    }

    /// Child called `name`.
    pub fn join(&self, name: &str) -> Result<Self, IncompatiblePath> {
        if self.platform == Platform::Windows && is_reserved_windows_name(name) {
            let mut path = self.relpath();
            if !path.is_empty() {
                path.push(self.sep);
            }
            path.push_str(name);
            return Err(IncompatiblePath {
                path,
                platform: self.platform.as_str(),
            });
        }
        let mut parts = self.parts.clone();
        parts.push(name.to_string());
        let mut norm = self.norm.clone();
        norm.push(self.fold(name));
        Ok(Self {
            parts,
            norm,
            sep: self.sep,
            platform: self.platform,
        })
    }

    fn fold(&self, name: &str) -> String {
        if self.platform.folds_case() {
            name.to_lowercase()
        } else {
            name.to_string()
        }
    }

    /// Same key with `suffix` appended to the last component.
    pub fn with_suffix(&self, suffix: &str) -> Self {
        let mut out = self.clone();
        if let Some(last) = out.parts.last_mut() {
            last.push_str(suffix);
        }
        if let Some(last) = out.norm.last_mut() {
            last.push_str(&self.fold(suffix));
        }
        out
    }

    pub fn is_root(&self) -> bool {
        self.parts.is_empty()
    }

    /// `None` for the root.
    pub fn parent(&self) -> Option<Self> {
        if self.is_root() {
            return None;
        }
        let n = self.parts.len() - 1;
        Some(Self {
            parts: self.parts[..n].to_vec(),
            norm: self.norm[..n].to_vec(),
            sep: self.sep,
            platform: self.platform,
        })
    }

    /// Iterates over the proper ancestors, nearest first, ending with the root.
    pub fn ancestors(&self) -> impl Iterator<Item = PathKey> {
        std::iter::successors(self.parent(), PathKey::parent)
    }

    /// Last component, empty for the root.
    pub fn name(&self) -> &str {
        self.parts.last().map(String::as_str).unwrap_or_default()
    }

    pub fn parts(&self) -> &[String] {
        &self.parts
    }

    pub fn normalized(&self) -> &[String] {
        &self.norm
    }

    pub fn separator(&self) -> char {
        self.sep
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn depth(&self) -> usize {
        self.parts.len()
    }

    /// Both keys name the same entry on the destination.
    pub fn weak_eq(&self, other: &Self) -> bool {
        self.norm == other.norm
    }

    /// `self` is `other` or lies below it, compared on normalized parts.
    pub fn is_relative_to(&self, other: &Self) -> bool {
        self.norm.starts_with(&other.norm)
    }

    /// One key is an ancestor of (or equal to) the other.
    pub fn is_lineage(&self, other: &Self) -> bool {
        self.norm.iter().zip(&other.norm).all(|(a, b)| a == b)
    }

    /// Path with the side's separator, empty for the root.
    pub fn relpath(&self) -> String {
        self.parts.join(&self.sep.to_string())
    }

    /// Path with `/` separators, as matched by a filter.
    pub fn filter_path(&self) -> String {
        self.parts.join("/")
    }

    /// Same components rendered with another separator.
    pub fn with_separator(&self, sep: char) -> Self {
        Self {
            sep,
            ..self.clone()
        }
    }
}

impl PartialEq for PathKey {
    fn eq(&self, other: &Self) -> bool {
        self.parts == other.parts
    }
}

impl Eq for PathKey {}

impl Hash for PathKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.parts.hash(state);
    }
}

impl Ord for PathKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.norm
            .cmp(&other.norm)
            .then_with(|| self.parts.cmp(&other.parts))
    }
}

impl PartialOrd for PathKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for PathKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            f.write_str(".")
        } else {
            f.write_str(&self.relpath())
        }
    }
}

impl fmt::Debug for PathKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PathKey({self})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn posix(s: &str) -> PathKey {
        PathKey::new(s, '/', Platform::Posix).unwrap()
    }

    fn nt(s: &str) -> PathKey {
        PathKey::new(s, '/', Platform::Windows).unwrap()
    }

    #[test]
    fn root_is_empty() {
        let root = posix(".");
        assert!(root.is_root());
        assert_eq!(root.to_string(), ".");
        assert_eq!(root.parent(), None);
        assert!(posix("a/b").is_relative_to(&root));
    }

    #[test]
    fn weak_and_strong_equality() {
        assert_ne!(nt("A.txt"), nt("a.txt"));
        assert!(nt("A.txt").weak_eq(&nt("a.txt")));
        assert!(!posix("A.txt").weak_eq(&posix("a.txt")));
    }

    #[test]
    fn ordering_uses_normalized_parts_first() {
        let mut keys = vec![nt("b"), nt("B"), nt("a")];
        keys.sort();
        assert_eq!(keys, vec![nt("a"), nt("B"), nt("b")]);
    }

    #[test]
    fn reserved_windows_names() {
        for bad in [
            "CON", "con.txt", "nul .txt", "COM1", "lpt\u{b9}", "a.", "a ", "a:b", "a\\b", "x\u{1}",
        ] {
            assert!(
                PathKey::new(bad, '/', Platform::Windows).is_err(),
                "{bad:?} should be rejected"
            );
            assert!(PathKey::new(bad, '/', Platform::Posix).is_ok());
        }
        for ok in ["CONSOLE", "COM10", "com", "a.b", ".git"] {
            assert!(PathKey::new(ok, '/', Platform::Windows).is_ok(), "{ok:?}");
        }
    }

    #[test]
    fn incompatible_path_names_the_full_path() {
        let err = PathKey::new("dir/aux", '/', Platform::Windows).unwrap_err();
        assert_eq!(err.path, "dir/aux");
    }

    #[test]
    fn lineage_and_suffix() {
        assert!(posix("a").is_lineage(&posix("a/b")));
        assert!(posix("a/b").is_lineage(&posix("a")));
        assert!(!posix("a/b").is_lineage(&posix("a/c")));
        assert_eq!(posix("a/b").with_suffix(".tempmove").to_string(), "a/b.tempmove");
        assert_eq!(posix("a/b").name(), "b");
    }

    #[test]
    fn ancestors_end_at_root() {
        let names: Vec<String> = posix("a/b/c").ancestors().map(|k| k.to_string()).collect();
        assert_eq!(names, vec!["a/b", "a", "."]);
    }
}
