// crates/engine/src/results.rs
use logging::human_size;
use serde::Serialize;
use std::fmt;

/// Error lines kept in [`Results::errors`]; later ones are only counted.
pub const MAX_RETAINED_ERRORS: usize = 100;

/// Errors are repeated after the summary only up to this many.
const REPRINT_LIMIT: usize = 10;

/// How a run ended.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    #[default]
    Pending,
    Completed,
    InputError,
    ConnectionError,
    InterruptedByUser,
    InterruptedByError,
    ErrorLimitReached,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Status::Pending => "Pending",
            Status::Completed => "Completed",
            Status::InputError => "Input Error",
            Status::ConnectionError => "Connection Error",
            Status::InterruptedByUser => "Interrupted by User",
            Status::InterruptedByError => "Interrupted by Error",
            Status::ErrorLimitReached => "Error Limit Reached",
        })
    }
}

/// Counters of one run.
#[derive(Clone, Debug, Default, Serialize)]
pub struct Results {
    pub status: Status,
    pub dry_run: bool,
    pub rename_success: u64,
    pub rename_error: u64,
    pub delete_success: u64,
    pub delete_error: u64,
    pub trash_success: u64,
    pub trash_error: u64,
    pub create_success: u64,
    pub create_error: u64,
    pub update_success: u64,
    pub update_error: u64,
    pub dir_create_success: u64,
    pub dir_create_error: u64,
    pub dir_delete_success: u64,
    pub dir_delete_error: u64,
    /// Operations not attempted because one they depend on failed.
    pub skipped: u64,
    pub byte_diff: i64,
    pub errors: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trash_root: Option<String>,
}

impl Results {
    pub fn err_count(&self) -> u64 {
        self.rename_error
            + self.delete_error
            + self.trash_error
            + self.create_error
            + self.update_error
            + self.dir_create_error
            + self.dir_delete_error
    }

    pub(crate) fn push_error(&mut self, line: String) {
        if self.errors.len() < MAX_RETAINED_ERRORS {
            self.errors.push(line);
        }
    }

    /// Completed, with at least one failed operation.
    pub fn is_partial(&self) -> bool {
        self.status == Status::Completed && self.err_count() > 0
    }

    /// Human-readable report printed at the end of a run.
    pub fn summary_lines(&self) -> Vec<String> {
        let mut out = Vec::new();
        if self.dry_run {
            out.push(format!("Status: {} (Dry Run)", self.status));
        } else {
            out.push(format!("Status: {}", self.status));
        }
        let counter = |name: &str, ok: u64, failed: u64| {
            if failed > 0 {
                format!("{name} Success: {ok} | Failed: {failed}")
            } else {
                format!("{name} Success: {ok}")
            }
        };
        out.push(counter("Create", self.create_success, self.create_error));
        out.push(counter("Update", self.update_success, self.update_error));
        out.push(counter("Rename", self.rename_success, self.rename_error));
        out.push(counter("Delete", self.delete_success, self.delete_error));
        out.push(counter("Trash", self.trash_success, self.trash_error));
        if self.dir_create_success + self.dir_create_error > 0 {
            out.push(counter(
                "Dir Create",
                self.dir_create_success,
                self.dir_create_error,
            ));
        }
        if self.dir_delete_success + self.dir_delete_error > 0 {
            out.push(counter(
                "Dir Delete",
                self.dir_delete_success,
                self.dir_delete_error,
            ));
        }
        if self.skipped > 0 {
            out.push(format!("Skipped: {}", self.skipped));
        }
        out.push(format!("Net Change: {}", human_size(self.byte_diff)));
        if let Some(trash) = &self.trash_root {
            out.push(format!("Trash: {trash}"));
        }

        let errors = self.err_count();
        if errors > 0 {
            out.push(format!("There were {errors} errors."));
            if errors as usize <= REPRINT_LIMIT {
                out.push("Errors are reprinted below for convenience.".to_string());
                out.extend(self.errors.iter().cloned());
            }
        }
        out
    }
}
