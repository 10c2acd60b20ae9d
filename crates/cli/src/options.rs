// crates/cli/src/options.rs

use std::path::PathBuf;

use crate::formatter;
use clap::{ArgAction, CommandFactory, Parser};
use engine::DEFAULT_RENAME_THRESHOLD;
use logging::{LogFormat, Tag};

#[derive(Parser, Debug, Clone)]
#[command(
    name = "rensync",
    version,
    about = "One-way directory sync that moves renamed files instead of copying them again"
)]
pub struct ClientOpts {
    /// source directory
    pub src: PathBuf,
    /// destination directory
    pub dst: PathBuf,

    #[arg(
        short = 'f',
        long,
        value_name = "FILTER",
        allow_hyphen_values = true,
        help_heading = "Selection",
        help = "include/exclude groups such as '+ **/*/ **/*.txt - **/*.log'"
    )]
    pub filter: Vec<String>,
    #[arg(
        short = 'H',
        long,
        help_heading = "Selection",
        help = "wildcards do not match names starting with a dot"
    )]
    pub ignore_hidden: bool,
    #[arg(short = 'I', long, help_heading = "Selection")]
    pub ignore_case: bool,
    #[arg(
        short = 'L',
        long,
        help_heading = "Selection",
        conflicts_with = "follow_symlinks"
    )]
    pub ignore_symlinks: bool,
    #[arg(long, help_heading = "Selection")]
    pub follow_symlinks: bool,
    #[arg(
        long,
        help_heading = "Selection",
        help = "rewrite absolute link targets pointing into SRC so they point into DST"
    )]
    pub translate_symlinks: bool,

    #[arg(
        short = 't',
        long,
        value_name = "PATH|auto",
        help_heading = "Delete",
        conflicts_with = "delete_files",
        help = "move deleted entries into a timestamped trash directory"
    )]
    pub trash: Option<String>,
    #[arg(short = 'x', long, help_heading = "Delete")]
    pub delete_files: bool,

    #[arg(
        short = 'F',
        long,
        help_heading = "Update",
        help = "overwrite destination files that are newer than the source"
    )]
    pub force_update: bool,
    #[arg(
        long,
        help_heading = "Update",
        help = "replace a file with a directory of the same name and vice versa"
    )]
    pub force_replace: bool,
    #[arg(
        long = "no-create-dirs",
        help_heading = "Update",
        help = "create only directories that receive files"
    )]
    pub no_create_dirs: bool,
    #[arg(short = 'd', long, help_heading = "Update")]
    pub dry_run: bool,
    #[arg(long, value_name = "NUM", help_heading = "Update")]
    pub max_errors: Option<usize>,

    #[arg(
        short = 'g',
        long,
        help_heading = "Renames",
        help = "match renames across the whole tree, not only within each directory"
    )]
    pub global_renames: bool,
    #[arg(long, help_heading = "Renames")]
    pub no_renames: bool,
    #[arg(
        short = 'm',
        long,
        help_heading = "Renames",
        help = "trust size and mtime without comparing file tails"
    )]
    pub metadata_only: bool,
    #[arg(
        short = 'R',
        long,
        value_name = "BYTES",
        default_value_t = DEFAULT_RENAME_THRESHOLD,
        help_heading = "Renames",
        help = "smallest file size considered for rename detection"
    )]
    pub rename_threshold: u64,

    #[arg(long, value_name = "FILE", help_heading = "Output")]
    pub log: Option<PathBuf>,
    #[arg(
        long,
        value_enum,
        value_name = "FORMAT",
        default_value_t = LogFormat::Text,
        help_heading = "Output"
    )]
    pub log_format: LogFormat,
    #[arg(
        long,
        value_name = "TAGS",
        value_delimiter = ',',
        value_enum,
        help_heading = "Output",
        help = "keep these log categories visible regardless of --quiet"
    )]
    pub info: Vec<Tag>,
    #[arg(long, help_heading = "Output")]
    pub debug: bool,
    #[arg(short, long, action = ArgAction::Count, help_heading = "Output")]
    pub verbose: u8,
    #[arg(short, long, action = ArgAction::Count, help_heading = "Output")]
    pub quiet: u8,
}

pub fn cli_command() -> clap::Command {
    formatter::apply(ClientOpts::command())
}
