// crates/cli/src/lib.rs
//! Command line front end of `rensync`: option parsing, logging setup,
//! the run itself and the mapping of its outcome to an exit status.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

mod exec;
mod formatter;
pub mod options;
mod print;
pub mod utils;
pub mod validate;

pub use engine::{EngineError, Results, Status};
pub use exec::run_sync;
pub use options::{ClientOpts, cli_command};
pub use print::handle_clap_error;
pub use validate::{ExitCode, exit_code_from_error_kind, exit_code_from_results};

/// Sets up logging, runs the sync described by `opts` and prints the
/// summary.
pub fn run(opts: &ClientOpts) -> ExitCode {
    if let Err(e) = utils::init_logging(opts) {
        eprintln!("cannot set up logging: {e}");
        return ExitCode::InputError;
    }
    let cancel = Arc::new(AtomicBool::new(false));
    register_interrupt(&cancel);

    let results = run_sync(opts, cancel);
    if results.status != Status::InputError {
        print::print_summary(&results, opts.log_format);
    }
    exit_code_from_results(&results)
}

#[cfg(unix)]
fn register_interrupt(cancel: &Arc<AtomicBool>) {
    use signal_hook::consts::{SIGINT, SIGTERM};
    for signal in [SIGINT, SIGTERM] {
        if let Err(e) = signal_hook::flag::register(signal, Arc::clone(cancel)) {
            tracing::warn!("cannot install handler for signal {signal}: {e}");
        }
    }
}

#[cfg(not(unix))]
fn register_interrupt(_cancel: &Arc<AtomicBool>) {}
