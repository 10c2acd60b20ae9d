// crates/logging/src/sink.rs
use crate::Tag;
use std::fs::File;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};
use tracing::{Level, Metadata};
use tracing_subscriber::fmt::writer::MakeWriter;

/// Receives one line per planned or performed operation.
///
/// The engine never logs operations itself; whoever drives a sync decides
/// where the lines go.
pub trait OperationSink {
    fn record(&self, tag: Tag, line: &str);
}

/// Forwards lines to `tracing` under the tag's target. Skips and ignored
/// entries are warnings, everything else is informational.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

macro_rules! emit {
    ($tag:expr, $line:expr; warn: $($w:ident),*; info: $($i:ident),*) => {
        match $tag {
            $(Tag::$w => tracing::warn!(target: Tag::$w.target(), "{}", $line),)*
            $(Tag::$i => tracing::info!(target: Tag::$i.target(), "{}", $line),)*
        }
    };
}

impl OperationSink for TracingSink {
    fn record(&self, tag: Tag, line: &str) {
        emit!(tag, line;
            warn: Skip, Ignore;
            info: Rename, Delete, Trash, Update, Create, Dir, Scan, Summary);
    }
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NopSink;

impl OperationSink for NopSink {
    fn record(&self, _tag: Tag, _line: &str) {}
}

/// Keeps every line in memory, in order.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    lines: Arc<Mutex<Vec<(Tag, String)>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<(Tag, String)> {
        self.lines.lock().map(|l| l.clone()).unwrap_or_default()
    }

    /// Lines without their tags.
    pub fn messages(&self) -> Vec<String> {
        self.lines().into_iter().map(|(_, line)| line).collect()
    }
}

impl OperationSink for MemorySink {
    fn record(&self, tag: Tag, line: &str) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push((tag, line.to_string()));
        }
    }
}

/// Warnings and errors go to stderr, everything else to stdout.
#[derive(Clone, Copy, Debug, Default)]
pub struct ConsoleWriter;

pub enum ConsoleStream {
    Out(io::Stdout),
    Err(io::Stderr),
}

impl Write for ConsoleStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            ConsoleStream::Out(s) => s.write(buf),
            ConsoleStream::Err(s) => s.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            ConsoleStream::Out(s) => s.flush(),
            ConsoleStream::Err(s) => s.flush(),
        }
    }
}

impl<'a> MakeWriter<'a> for ConsoleWriter {
    type Writer = ConsoleStream;

    fn make_writer(&'a self) -> Self::Writer {
        ConsoleStream::Out(io::stdout())
    }

    fn make_writer_for(&'a self, meta: &Metadata<'_>) -> Self::Writer {
        if *meta.level() <= Level::WARN {
            ConsoleStream::Err(io::stderr())
        } else {
            ConsoleStream::Out(io::stdout())
        }
    }
}

/// Appends to a shared log file handle.
#[derive(Clone)]
pub struct FileWriter {
    pub(crate) file: Arc<File>,
}

impl<'a> MakeWriter<'a> for FileWriter {
    type Writer = &'a File;

    fn make_writer(&'a self) -> Self::Writer {
        &self.file
    }
}
