// src/bin/rensync/main.rs
use clap::FromArgMatches;
use rensync_cli::{ClientOpts, cli_command, handle_clap_error};

fn main() {
    let mut cmd = cli_command();
    let matches = cmd
        .try_get_matches_from_mut(std::env::args_os())
        .unwrap_or_else(|e| handle_clap_error(e));
    let opts = match ClientOpts::from_arg_matches(&matches) {
        Ok(opts) => opts,
        Err(e) => handle_clap_error(e),
    };
    let code = rensync_cli::run(&opts);
    std::process::exit(i32::from(code));
}
