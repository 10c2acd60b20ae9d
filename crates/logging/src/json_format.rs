// crates/logging/src/json_format.rs
use crate::Tag;
use serde_json::{Map, Value};
use time::OffsetDateTime;
use tracing::{Event, Subscriber};
use tracing_serde::fields::AsMap;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields, format::Writer};
use tracing_subscriber::registry::LookupSpan;

/// Writes each event as one JSON object:
///
/// ```json
/// {"timestamp":"2024-03-05T07:08:09Z","level":"WARN","tag":"skip","message":"...","fields":{}}
/// ```
///
/// `tag` is the [`Tag`] of the event, or the raw tracing target for events
/// outside the rensync categories.
#[derive(Default)]
pub struct JsonFormatter;

impl<S, N> FormatEvent<S, N> for JsonFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'writer> FormatFields<'writer> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> std::fmt::Result {
        let meta = event.metadata();
        let timestamp = OffsetDateTime::now_utc()
            .format(&time::macros::format_description!(
                "[year]-[month]-[day]T[hour]:[minute]:[second]Z"
            ))
            .map_err(|_| std::fmt::Error)?;
        let tag = Tag::from_target(meta.target()).map_or(meta.target(), Tag::as_str);

        let mut fields = match serde_json::to_value(event.field_map()) {
            Ok(Value::Object(map)) => map,
            Ok(_) => Map::new(),
            Err(_) => return Err(std::fmt::Error),
        };
        let message = fields.remove("message").unwrap_or(Value::Null);

        let mut obj = Map::new();
        obj.insert("timestamp".into(), Value::String(timestamp));
        obj.insert("level".into(), Value::String(meta.level().to_string()));
        obj.insert("tag".into(), Value::String(tag.to_string()));
        obj.insert("message".into(), message);
        obj.insert("fields".into(), Value::Object(fields));
        let line = serde_json::to_string(&Value::Object(obj)).map_err(|_| std::fmt::Error)?;
        writer.write_str(&line)?;
        writer.write_char('\n')
    }
}
