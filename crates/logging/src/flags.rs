// crates/logging/src/flags.rs
use clap::ValueEnum;
use std::path::PathBuf;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, ValueEnum)]
#[clap(rename_all = "kebab-case")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Category of a log line; each one has its own tracing target so it can be
/// enabled on its own with `--info`.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, ValueEnum)]
#[clap(rename_all = "kebab-case")]
pub enum Tag {
    Rename,
    Delete,
    Trash,
    Update,
    Create,
    Dir,
    Skip,
    Ignore,
    Scan,
    Summary,
}

impl Tag {
    pub const ALL: [Tag; 10] = [
        Tag::Rename,
        Tag::Delete,
        Tag::Trash,
        Tag::Update,
        Tag::Create,
        Tag::Dir,
        Tag::Skip,
        Tag::Ignore,
        Tag::Scan,
        Tag::Summary,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Tag::Rename => "rename",
            Tag::Delete => "delete",
            Tag::Trash => "trash",
            Tag::Update => "update",
            Tag::Create => "create",
            Tag::Dir => "dir",
            Tag::Skip => "skip",
            Tag::Ignore => "ignore",
            Tag::Scan => "scan",
            Tag::Summary => "summary",
        }
    }

    /// The tag whose [`Tag::target`] is `target`.
    pub fn from_target(target: &str) -> Option<Tag> {
        Tag::ALL.into_iter().find(|t| t.target() == target)
    }

    pub const fn target(self) -> &'static str {
        match self {
            Tag::Rename => "rensync::rename",
            Tag::Delete => "rensync::delete",
            Tag::Trash => "rensync::trash",
            Tag::Update => "rensync::update",
            Tag::Create => "rensync::create",
            Tag::Dir => "rensync::dir",
            Tag::Skip => "rensync::skip",
            Tag::Ignore => "rensync::ignore",
            Tag::Scan => "rensync::scan",
            Tag::Summary => "rensync::summary",
        }
    }
}

impl From<&Tag> for Tag {
    fn from(tag: &Tag) -> Self {
        *tag
    }
}

#[derive(Clone, Debug)]
pub struct SubscriberConfig {
    pub format: LogFormat,
    pub verbose: u8,
    pub debug: bool,
    /// `-q` hides operation lines, `-qq` hides warnings as well.
    pub quiet: u8,
    /// Tags kept at info level regardless of `quiet`.
    pub info: Vec<Tag>,
    pub log_file: Option<PathBuf>,
    pub colored: bool,
    pub timestamps: bool,
}

impl Default for SubscriberConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Text,
            verbose: 0,
            debug: false,
            quiet: 0,
            info: Vec::new(),
            log_file: None,
            colored: true,
            timestamps: false,
        }
    }
}

#[derive(Default)]
pub struct SubscriberConfigBuilder {
    cfg: SubscriberConfig,
}

impl SubscriberConfig {
    pub fn builder() -> SubscriberConfigBuilder {
        SubscriberConfigBuilder::default()
    }
}

impl SubscriberConfigBuilder {
    pub fn format(mut self, format: LogFormat) -> Self {
        self.cfg.format = format;
        self
    }

    pub fn verbose(mut self, verbose: u8) -> Self {
        self.cfg.verbose = verbose;
        self
    }

    pub fn debug(mut self, debug: bool) -> Self {
        self.cfg.debug = debug;
        self
    }

    pub fn quiet(mut self, quiet: u8) -> Self {
        self.cfg.quiet = quiet;
        self
    }

    pub fn info<I>(mut self, info: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Tag>,
    {
        self.cfg.info = info.into_iter().map(Into::into).collect();
        self
    }

    pub fn log_file(mut self, log_file: Option<PathBuf>) -> Self {
        self.cfg.log_file = log_file;
        self
    }

    pub fn colored(mut self, colored: bool) -> Self {
        self.cfg.colored = colored;
        self
    }

    pub fn timestamps(mut self, timestamps: bool) -> Self {
        self.cfg.timestamps = timestamps;
        self
    }

    pub fn build(self) -> SubscriberConfig {
        self.cfg
    }
}
