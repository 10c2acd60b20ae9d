// crates/logging/src/formatter.rs
use std::fmt;
use time::{OffsetDateTime, macros::format_description};
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields, format::Writer};
use tracing_subscriber::registry::LookupSpan;

/// Plain console format: the message alone for informational lines and a
/// `WARN: `/`ERROR: ` prefix for problems. Extra fields follow as
/// `key=value`.
#[derive(Clone, Copy, Debug, Default)]
pub struct SyncFormatter {
    timestamps: bool,
}

impl SyncFormatter {
    pub fn new(timestamps: bool) -> Self {
        Self { timestamps }
    }
}

#[derive(Default)]
struct MsgVisitor {
    msg: String,
    fields: Vec<(&'static str, String)>,
}

impl Visit for MsgVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.msg.push_str(value);
        } else {
            self.fields.push((field.name(), value.to_string()));
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.msg.push_str(&format!("{value:?}"));
        } else {
            self.fields.push((field.name(), format!("{value:?}")));
        }
    }
}

fn format_time() -> String {
    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    let fmt = format_description!("[year]/[month]/[day] [hour]:[minute]:[second]");
    now.format(&fmt)
        .unwrap_or_else(|_| String::from("0000/00/00 00:00:00"))
}

fn prefix(level: &Level) -> &'static str {
    match *level {
        Level::ERROR => "ERROR: ",
        Level::WARN => "WARN: ",
        _ => "",
    }
}

impl<S, N> FormatEvent<S, N> for SyncFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let mut visitor = MsgVisitor::default();
        event.record(&mut visitor);
        if self.timestamps {
            write!(writer, "{} ", format_time())?;
        }
        writer.write_str(prefix(event.metadata().level()))?;
        if visitor.msg.is_empty() {
            writer.write_str(event.metadata().target())?;
        } else {
            writer.write_str(&visitor.msg)?;
        }
        for (name, value) in &visitor.fields {
            write!(writer, " {name}={value}")?;
        }
        writer.write_char('\n')
    }
}
