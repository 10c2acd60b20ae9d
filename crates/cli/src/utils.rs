// crates/cli/src/utils.rs

use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};

use engine::{EngineError, Result};
use filters::{DEFAULT_FILTER, Filter, FilterOptions};
use logging::SubscriberConfig;
use time::{OffsetDateTime, macros::format_description};

use crate::options::ClientOpts;

/// Value of `--trash` that places the trash next to the destination.
pub const AUTO_TRASH: &str = "auto";

pub(crate) fn init_logging(opts: &ClientOpts) -> io::Result<()> {
    let cfg = SubscriberConfig::builder()
        .format(opts.log_format)
        .verbose(opts.verbose)
        .debug(opts.debug)
        .quiet(opts.quiet)
        .info(opts.info.iter())
        .log_file(opts.log.clone())
        .colored(io::stderr().is_terminal())
        .build();
    logging::init(cfg)
}

/// Compiles the `-f` groups, joined by spaces, or the default filter.
pub fn build_filter(opts: &ClientOpts) -> Result<Filter> {
    let text = if opts.filter.is_empty() {
        DEFAULT_FILTER.to_string()
    } else {
        opts.filter.join(" ")
    };
    let options = FilterOptions {
        ignore_hidden: opts.ignore_hidden,
        ignore_case: opts.ignore_case,
    };
    Ok(Filter::with_options(&text, options)?)
}

/// Where deleted entries go for this run: a `Trash_YYYYmmdd_HHMMSS`
/// directory beside `dst` for `auto`, or below the given directory.
pub fn trash_dir(arg: &str, dst: &Path, now: OffsetDateTime) -> Result<PathBuf> {
    let stamp = now
        .format(format_description!(
            "[year][month][day]_[hour][minute][second]"
        ))
        .map_err(|e| EngineError::Other(format!("cannot format trash timestamp: {e}")))?;
    let name = format!("Trash_{stamp}");
    if arg == AUTO_TRASH {
        let parent = dst
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        Ok(parent.join(name))
    } else {
        Ok(Path::new(arg).join(name))
    }
}

pub(crate) fn local_now() -> OffsetDateTime {
    OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use time::macros::datetime;

    #[test]
    fn auto_trash_sits_beside_the_destination() {
        let now = datetime!(2024-03-05 07:08:09 UTC);
        assert_eq!(
            trash_dir("auto", Path::new("/data/backup"), now).unwrap(),
            PathBuf::from("/data/Trash_20240305_070809")
        );
        assert_eq!(
            trash_dir("auto", Path::new("backup"), now).unwrap(),
            PathBuf::from("./Trash_20240305_070809")
        );
        assert_eq!(
            trash_dir("/bin", Path::new("/data/backup"), now).unwrap(),
            PathBuf::from("/bin/Trash_20240305_070809")
        );
    }

    #[test]
    fn filter_groups_are_joined() {
        let opts = ClientOpts::parse_from(["rensync", "-f", "- **/*.log", "-f", "+ **/*", "a", "b"]);
        let filter = build_filter(&opts).unwrap();
        assert!(!filter.matches("x/y.log", false));
        assert!(filter.matches("x/y.txt", false));

        let opts = ClientOpts::parse_from(["rensync", "a", "b"]);
        assert!(build_filter(&opts).unwrap().matches("x/y.log", false));
    }

    #[test]
    fn bad_filter_is_an_input_error() {
        let opts = ClientOpts::parse_from(["rensync", "-f", "+ 'a", "a", "b"]);
        assert!(matches!(build_filter(&opts), Err(EngineError::Filter(_))));
    }
}
