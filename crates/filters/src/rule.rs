// crates/filters/src/rule.rs
use regex::Regex;

/// One compiled include or exclude pattern.
#[derive(Clone, Debug)]
pub struct Rule {
    pub(crate) pattern: String,
    pub(crate) include: bool,
    pub(crate) matcher: Regex,
    pub(crate) relative: bool,
    pub(crate) implicit: bool,
}

impl Rule {
    /// Normalized glob pattern, `/` separated.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn is_include(&self) -> bool {
        self.include
    }

    /// Generated as an ancestor of an include, or from a `./` pattern.
    pub fn is_implicit(&self) -> bool {
        self.implicit
    }

    pub fn is_dir_only(&self) -> bool {
        self.pattern.ends_with('/')
    }

    pub(crate) fn matches(&self, path: &str) -> bool {
        self.matcher.is_match(path)
    }
}
