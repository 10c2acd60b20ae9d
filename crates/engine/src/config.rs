// crates/engine/src/config.rs
use crate::{EngineError, Result};
use filters::Filter;
use transport::AbstractPath;
use walk::{ScanOptions, SymlinkMode};

/// Default minimum size, in bytes, of a file considered for rename detection.
pub const DEFAULT_RENAME_THRESHOLD: u64 = 10_000;

/// What happens to destination entries that have no source counterpart.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum DeleteMode<P> {
    #[default]
    Keep,
    Delete,
    /// Move them below this directory, mirroring their relative path.
    Trash(P),
}

impl<P> DeleteMode<P> {
    pub fn is_keep(&self) -> bool {
        matches!(self, DeleteMode::Keep)
    }

    pub fn trash(&self) -> Option<&P> {
        match self {
            DeleteMode::Trash(p) => Some(p),
            _ => None,
        }
    }
}

/// Settings of one sync run. Built once through [`SyncConfig::builder`]
/// and shared by reference.
#[derive(Clone, Debug)]
#[non_exhaustive]
pub struct SyncConfig<P: AbstractPath> {
    pub src: P,
    pub dst: P,
    pub filter: Filter,
    pub delete: DeleteMode<P>,
    pub force_update: bool,
    pub force_replace: bool,
    pub global_renames: bool,
    pub renames: bool,
    pub metadata_only: bool,
    /// `None` disables file rename detection.
    pub rename_threshold: Option<u64>,
    pub symlinks: SymlinkMode,
    pub translate_symlinks: bool,
    pub create_dir_tree: bool,
    pub create_files: bool,
    pub dry_run: bool,
    pub max_errors: Option<usize>,
}

impl<P: AbstractPath> SyncConfig<P> {
    pub fn builder(src: P, dst: P) -> SyncConfigBuilder<P> {
        SyncConfigBuilder::new(src, dst)
    }

    /// Listing settings shared by both sides of the walk.
    pub fn scan_options(&self) -> ScanOptions<'_> {
        ScanOptions {
            filter: &self.filter,
            symlinks: self.symlinks,
            platform: self.dst.platform(),
            truncate_mtime: self.src.is_remote() || self.dst.is_remote(),
        }
    }
}

#[derive(Clone, Debug)]
#[must_use]
pub struct SyncConfigBuilder<P: AbstractPath> {
    src: P,
    dst: P,
    filter: Filter,
    trash: Option<P>,
    delete_files: bool,
    force_update: bool,
    force_replace: bool,
    global_renames: bool,
    renames: bool,
    metadata_only: bool,
    rename_threshold: Option<u64>,
    ignore_symlinks: bool,
    follow_symlinks: bool,
    translate_symlinks: bool,
    create_dir_tree: bool,
    create_files: bool,
    dry_run: bool,
    max_errors: Option<usize>,
}

impl<P: AbstractPath> SyncConfigBuilder<P> {
    pub fn new(src: P, dst: P) -> Self {
        Self {
            src,
            dst,
            filter: Filter::default(),
            trash: None,
            delete_files: false,
            force_update: false,
            force_replace: false,
            global_renames: false,
            renames: true,
            metadata_only: false,
            rename_threshold: Some(DEFAULT_RENAME_THRESHOLD),
            ignore_symlinks: false,
            follow_symlinks: false,
            translate_symlinks: false,
            create_dir_tree: true,
            create_files: true,
            dry_run: false,
            max_errors: None,
        }
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }

    pub fn trash(mut self, trash: Option<P>) -> Self {
        self.trash = trash;
        self
    }

    pub fn delete_files(mut self, yes: bool) -> Self {
        self.delete_files = yes;
        self
    }

    pub fn force_update(mut self, yes: bool) -> Self {
        self.force_update = yes;
        self
    }

    pub fn force_replace(mut self, yes: bool) -> Self {
        self.force_replace = yes;
        self
    }

    pub fn global_renames(mut self, yes: bool) -> Self {
        self.global_renames = yes;
        self
    }

    pub fn renames(mut self, yes: bool) -> Self {
        self.renames = yes;
        self
    }

    pub fn metadata_only(mut self, yes: bool) -> Self {
        self.metadata_only = yes;
        self
    }

    pub fn rename_threshold(mut self, threshold: Option<u64>) -> Self {
        self.rename_threshold = threshold;
        self
    }

    pub fn ignore_symlinks(mut self, yes: bool) -> Self {
        self.ignore_symlinks = yes;
        self
    }

    pub fn follow_symlinks(mut self, yes: bool) -> Self {
        self.follow_symlinks = yes;
        self
    }

    pub fn translate_symlinks(mut self, yes: bool) -> Self {
        self.translate_symlinks = yes;
        self
    }

    /// When off, only directories that receive files are created.
    pub fn create_dir_tree(mut self, yes: bool) -> Self {
        self.create_dir_tree = yes;
        self
    }

    pub fn create_files(mut self, yes: bool) -> Self {
        self.create_files = yes;
        self
    }

    pub fn dry_run(mut self, yes: bool) -> Self {
        self.dry_run = yes;
        self
    }

    pub fn max_errors(mut self, max: Option<usize>) -> Self {
        self.max_errors = max;
        self
    }

    pub fn build(self) -> Result<SyncConfig<P>> {
        let input = |msg: String| Err(EngineError::Input(msg));

        if !self.src.exists() {
            return input(format!("'src' does not exist: {}", self.src));
        }
        if !self.src.is_dir() {
            return input(format!("'src' is not a directory: {}", self.src));
        }
        if self.dst.exists() && !self.dst.is_dir() {
            return input(format!("'dst' is not a directory: {}", self.dst));
        }
        if let Some(trash) = &self.trash {
            if trash.exists() && !trash.is_dir() {
                return input(format!("'trash' is not a directory: {trash}"));
            }
            if trash.is_relative_to(&self.dst) {
                return input(format!("'trash' is inside 'dst': {trash}"));
            }
            if trash.exists() && self.dst.exists() && !self.dst.same_filesystem(trash)? {
                return input(format!(
                    "'trash' is not on the same file system as 'dst': {trash}"
                ));
            }
            if self.delete_files {
                return input("Mutually exclusive arguments: 'trash' and 'delete_files'".into());
            }
        }
        if self.ignore_symlinks && self.follow_symlinks {
            return input(
                "Mutually exclusive arguments: 'ignore_symlinks' and 'follow_symlinks'".into(),
            );
        }

        let delete = match (self.trash, self.delete_files) {
            (Some(trash), _) => DeleteMode::Trash(trash),
            (None, true) => DeleteMode::Delete,
            (None, false) => DeleteMode::Keep,
        };
        let symlinks = if self.ignore_symlinks {
            SymlinkMode::Ignore
        } else if self.follow_symlinks {
            SymlinkMode::Follow
        } else {
            SymlinkMode::Copy
        };

        Ok(SyncConfig {
            src: self.src,
            dst: self.dst,
            filter: self.filter,
            delete,
            force_update: self.force_update,
            force_replace: self.force_replace,
            global_renames: self.global_renames,
            renames: self.renames,
            metadata_only: self.metadata_only,
            rename_threshold: self.rename_threshold,
            symlinks,
            translate_symlinks: self.translate_symlinks,
            create_dir_tree: self.create_dir_tree,
            create_files: self.create_files,
            dry_run: self.dry_run,
            max_errors: self.max_errors,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use transport::MemoryFs;

    #[test]
    fn defaults() {
        let fs = MemoryFs::new();
        let root = fs.root();
        root.join("src").mkdir(true, true).unwrap();
        let cfg = SyncConfig::builder(root.join("src"), root.join("dst"))
            .build()
            .unwrap();
        assert!(cfg.delete.is_keep());
        assert_eq!(cfg.rename_threshold, Some(DEFAULT_RENAME_THRESHOLD));
        assert_eq!(cfg.symlinks, SymlinkMode::Copy);
        assert!(cfg.renames && cfg.create_dir_tree && cfg.create_files);
    }

    #[test]
    fn rejects_conflicting_options() {
        let fs = MemoryFs::new();
        let root = fs.root();
        root.join("src").mkdir(true, true).unwrap();
        root.join("file").write(b"x", 1).unwrap();
        let builder = || SyncConfig::builder(root.join("src"), root.join("dst"));

        let err = builder()
            .trash(Some(root.join("trash")))
            .delete_files(true)
            .build()
            .unwrap_err();
        assert!(matches!(err, EngineError::Input(_)));
        assert!(builder().ignore_symlinks(true).follow_symlinks(true).build().is_err());
        assert!(builder().trash(Some(root.join("dst/t"))).build().is_err());
        assert!(builder().trash(Some(root.join("file"))).build().is_err());
        assert!(SyncConfig::builder(root.join("file"), root.join("dst")).build().is_err());
        assert!(SyncConfig::builder(root.join("src"), root.join("file")).build().is_err());
        assert!(SyncConfig::builder(root.join("nope"), root.join("dst")).build().is_err());
    }
}
