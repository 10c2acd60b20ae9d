// crates/cli/src/print.rs
use crate::validate::exit_code_from_error_kind;
use engine::Results;
use logging::{LogFormat, Tag};

pub fn handle_clap_error(e: clap::Error) -> ! {
    let code = exit_code_from_error_kind(e.kind());
    // Help and version go to stdout, everything else to stderr.
    let _ = e.print();
    std::process::exit(i32::from(code));
}

/// Reports the end of a run through the summary log target, so the lines
/// reach the log file as well as the console.
pub(crate) fn print_summary(results: &Results, format: LogFormat) {
    match format {
        LogFormat::Text => {
            for line in results.summary_lines() {
                tracing::info!(target: Tag::Summary.target(), "{line}");
            }
        }
        LogFormat::Json => match serde_json::to_string(results) {
            Ok(json) => tracing::info!(target: Tag::Summary.target(), results = %json, "summary"),
            Err(e) => tracing::error!("cannot serialize results: {e}"),
        },
    }
}
