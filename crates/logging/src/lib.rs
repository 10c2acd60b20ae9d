// crates/logging/src/lib.rs
//! Console and file logging for rensync.
//!
//! Everything is emitted through [`tracing`]. Operation lines use the
//! per-[`Tag`] targets so that `--info TAG` can keep a single category
//! visible while `-q` silences the rest.

mod flags;
mod formatter;
mod json_format;
mod sink;
mod subscriber;
mod util;

pub use flags::{LogFormat, SubscriberConfig, SubscriberConfigBuilder, Tag};
pub use formatter::SyncFormatter;
pub use json_format::JsonFormatter;
pub use sink::{ConsoleWriter, MemorySink, NopSink, OperationSink, TracingSink};
pub use subscriber::{ENV_VAR, init, subscriber};
pub use util::human_size;
