// crates/cli/src/validate.rs
use engine::{Results, Status};

/// Process exit status of `rensync`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitCode {
    Ok = 0,
    InputError = 1,
    InterruptedByError = 2,
    ConnectionError = 3,
    ErrorLimitReached = 4,
    /// The run completed but some operations failed.
    Partial = 5,
    InterruptedByUser = 130,
}

impl From<ExitCode> for u8 {
    fn from(code: ExitCode) -> u8 {
        code as u8
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> i32 {
        i32::from(code as u8)
    }
}

pub fn exit_code_from_status(status: Status) -> ExitCode {
    match status {
        Status::Completed => ExitCode::Ok,
        Status::InputError => ExitCode::InputError,
        Status::ConnectionError => ExitCode::ConnectionError,
        Status::InterruptedByUser => ExitCode::InterruptedByUser,
        Status::ErrorLimitReached => ExitCode::ErrorLimitReached,
        Status::InterruptedByError | Status::Pending => ExitCode::InterruptedByError,
    }
}

pub fn exit_code_from_results(results: &Results) -> ExitCode {
    if results.is_partial() {
        ExitCode::Partial
    } else {
        exit_code_from_status(results.status)
    }
}

pub fn exit_code_from_error_kind(kind: clap::error::ErrorKind) -> ExitCode {
    use clap::error::ErrorKind::*;
    match kind {
        DisplayHelp | DisplayVersion => ExitCode::Ok,
        _ => ExitCode::InputError,
    }
}
