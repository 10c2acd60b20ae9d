// crates/filters/src/filter.rs
use crate::glob::translate;
use crate::token::{Token, tokenize};
use crate::{FilterStats, ParseError, Rule};
use regex::RegexBuilder;
use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;

/// Pattern string used when no filter is given.
pub const DEFAULT_FILTER: &str = "+ **/*/ **/*";

/// Tracing target of [`Filter::report`], shared with the scan log category.
pub const LOG_TARGET: &str = "rensync::scan";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FilterOptions {
    /// Wildcards do not match names starting with a dot.
    pub ignore_hidden: bool,
    pub ignore_case: bool,
}

/// Ordered include/exclude rules; the first matching rule decides.
///
/// Directories are tested with a trailing `/`, files without one.
#[derive(Clone, Debug)]
pub struct Filter {
    rules: Vec<Rule>,
    options: FilterOptions,
    default: bool,
    // Ancestor directories generated since the last exclude.
    tmp_allowed: HashSet<String>,
    stats: RefCell<FilterStats>,
}

/// Includes everything.
impl Default for Filter {
    fn default() -> Self {
        Self::empty(FilterOptions::default()).with_default(true)
    }
}

impl Filter {
    fn empty(options: FilterOptions) -> Self {
        Self {
            rules: Vec::new(),
            options,
            default: false,
            tmp_allowed: HashSet::new(),
            stats: RefCell::new(FilterStats::default()),
        }
    }

    pub fn new(filter: &str) -> Result<Self, ParseError> {
        Self::with_options(filter, FilterOptions::default())
    }

    /// Compiles a filter string. Patterns before the first `+`/`-` are
    /// includes.
    pub fn with_options(filter: &str, options: FilterOptions) -> Result<Self, ParseError> {
        let mut this = Self::empty(options);
        let mut include = true;
        for token in tokenize(filter)? {
            match token {
                Token::Action(action) => include = action,
                Token::Pattern(p) if include => this.allow(&p)?,
                Token::Pattern(p) => this.reject(&p)?,
            }
        }
        tracing::debug!(target: "filter", rules = this.rules.len(), "compiled {this}");
        Ok(this)
    }

    /// Value returned for paths no rule matches.
    #[must_use]
    pub fn with_default(mut self, default: bool) -> Self {
        self.default = default;
        self
    }

    /// Appends an include pattern, given in tokenized glob form.
    pub fn allow(&mut self, pattern: &str) -> Result<(), ParseError> {
        self.add(true, pattern, None, false)
    }

    /// Appends an exclude pattern, given in tokenized glob form.
    pub fn reject(&mut self, pattern: &str) -> Result<(), ParseError> {
        self.tmp_allowed.clear();
        self.add(false, pattern, None, false)
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn options(&self) -> FilterOptions {
        self.options
    }

    /// Decides `relpath`, a `/`-separated path relative to the sync root.
    pub fn matches(&self, relpath: &str, is_dir: bool) -> bool {
        if is_dir && !relpath.ends_with('/') {
            self.matches_raw(&format!("{relpath}/"))
        } else {
            self.matches_raw(relpath)
        }
    }

    /// Like [`Filter::matches`] but the caller supplies the trailing `/`.
    pub fn matches_raw(&self, path: &str) -> bool {
        let hit = self.rules.iter().find(|r| r.matches(path));
        self.stats
            .borrow_mut()
            .record(hit.map(|r| r.pattern.as_str()));
        hit.map_or(self.default, |r| r.include)
    }

    pub fn stats(&self) -> FilterStats {
        self.stats.borrow().clone()
    }

    /// Logs the match counters at debug level on the scan target.
    pub fn report(&self) {
        let stats = self.stats();
        tracing::debug!(
            target: LOG_TARGET,
            matches = stats.matches,
            misses = stats.misses,
            last_rule = stats.last_rule.as_deref().unwrap_or_default(),
            "filter decisions"
        );
    }

    fn push(&mut self, rule: Rule) {
        if rule.include {
            self.tmp_allowed.insert(rule.pattern.clone());
        }
        self.rules.push(rule);
    }

    fn add(
        &mut self,
        include: bool,
        raw: &str,
        is_dir: Option<bool>,
        implicit: bool,
    ) -> Result<(), ParseError> {
        let Some(mut rule) = self.parse(include, raw, is_dir)? else {
            return Ok(());
        };
        if rule.relative && !include {
            return Err(ParseError::RelativeExclude(raw.to_string()));
        }

        if !rule.relative {
            rule.implicit |= implicit;
            let pattern = rule.pattern.clone();
            self.push(rule);
            if include {
                self.add_ancestors(&pattern)?;
            }
            return Ok(());
        }

        // Join onto every explicit directory include of the current run.
        let parents: Vec<String> = self
            .rules
            .iter()
            .rev()
            .take_while(|r| r.include)
            .filter(|r| !r.implicit && r.is_dir_only())
            .map(|r| r.pattern.clone())
            .collect();
        if parents.is_empty() {
            rule.implicit = true;
            rule.relative = false;
            self.push(rule);
            return Ok(());
        }
        for parent in parents {
            self.add(true, &format!("{parent}{}", rule.pattern), is_dir, true)?;
        }
        Ok(())
    }

    fn add_ancestors(&mut self, pattern: &str) -> Result<(), ParseError> {
        let mut parent = pattern.trim_end_matches('/');
        while let Some(idx) = parent.rfind('/') {
            parent = &parent[..idx];
            let dir = format!("{parent}/");
            if self.tmp_allowed.contains(&dir) {
                break;
            }
            match self.parse(true, &dir, Some(true))? {
                Some(mut rule) => {
                    rule.implicit = true;
                    self.push(rule);
                }
                None => break,
            }
        }
        Ok(())
    }

    fn parse(
        &self,
        include: bool,
        raw: &str,
        is_dir: Option<bool>,
    ) -> Result<Option<Rule>, ParseError> {
        let mut pattern = raw;
        let mut relative = false;
        if let Some(rest) = pattern.strip_prefix("./") {
            relative = true;
            pattern = rest.trim_start_matches('/');
        }
        if pattern.is_empty() {
            return Ok(None);
        }
        if pattern == "\\-" || pattern == "\\+" {
            return Err(ParseError::EscapedAction(pattern.to_string()));
        }
        if pattern.split('/').any(|seg| seg == "." || seg == "..") {
            return Err(ParseError::DotSegment(raw.to_string()));
        }
        if pattern.starts_with('/') {
            return Err(ParseError::Absolute(raw.to_string()));
        }

        let mut glob = String::with_capacity(pattern.len() + 1);
        for c in pattern.chars() {
            if !(c == '/' && glob.ends_with('/')) {
                glob.push(c);
            }
        }
        match is_dir {
            Some(true) if !glob.ends_with('/') => glob.push('/'),
            Some(false) => {
                while glob.ends_with('/') {
                    glob.pop();
                }
            }
            _ => {}
        }

        let matcher = RegexBuilder::new(&translate(&glob, self.options.ignore_hidden))
            .case_insensitive(self.options.ignore_case)
            .build()?;
        Ok(Some(Rule {
            pattern: glob,
            include,
            matcher,
            relative,
            implicit: false,
        }))
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut current = None;
        for (i, rule) in self.rules.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            if current != Some(rule.include) {
                f.write_str(if rule.include { "+ " } else { "- " })?;
                current = Some(rule.include);
            }
            f.write_str(&rule.pattern)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_lists_generated_rules() {
        let f = Filter::new("+ audio/music/**/*.flac - **/*/ **/*").unwrap();
        assert_eq!(
            f.to_string(),
            "+ audio/music/**/*.flac audio/music/**/ audio/music/ audio/ - **/*/ **/*"
        );
    }

    #[test]
    fn ancestors_stop_at_known_directory() {
        let f = Filter::new("a/b/c a/b/d").unwrap();
        assert_eq!(f.to_string(), "+ a/b/c a/b/ a/ a/b/d");
    }

    #[test]
    fn exclude_resets_known_ancestors() {
        let f = Filter::new("a/b - x + a/c").unwrap();
        assert_eq!(f.to_string(), "+ a/b a/ - x + a/c a/");
    }

    #[test]
    fn default_includes_everything() {
        let f = Filter::default();
        assert!(f.matches(".git", true));
        assert!(f.matches("a/b/c", false));
    }

    #[test]
    fn stats_count_hits() {
        let f = Filter::new("a").unwrap();
        assert!(f.matches("a", false));
        assert!(!f.matches("b", false));
        let stats = f.stats();
        assert_eq!((stats.matches, stats.misses), (1, 1));
        assert_eq!(stats.last_rule.as_deref(), Some("a"));
    }
}
