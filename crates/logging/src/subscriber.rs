// crates/logging/src/subscriber.rs
use crate::flags::{LogFormat, SubscriberConfig};
use crate::formatter::SyncFormatter;
use crate::json_format::JsonFormatter;
use crate::sink::{ConsoleWriter, FileWriter};
use std::fs::OpenOptions;
use std::io;
use std::sync::Arc;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{
    EnvFilter, Layer, fmt as tracing_fmt, layer::SubscriberExt, util::SubscriberInitExt,
};

/// Environment variable holding extra `EnvFilter` directives.
pub const ENV_VAR: &str = "RENSYNC_LOG";

fn level(cfg: &SubscriberConfig) -> LevelFilter {
    if cfg.quiet >= 2 {
        LevelFilter::ERROR
    } else if cfg.quiet == 1 {
        LevelFilter::WARN
    } else if cfg.verbose >= 2 {
        LevelFilter::TRACE
    } else if cfg.verbose == 1 || cfg.debug {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    }
}

/// Build a [`tracing`] subscriber for the console and, optionally, a log
/// file that receives the same events with timestamps.
pub fn subscriber(cfg: SubscriberConfig) -> io::Result<Box<dyn tracing::Subscriber + Send + Sync>> {
    let mut filter = EnvFilter::builder()
        .with_default_directive(level(&cfg).into())
        .with_env_var(ENV_VAR)
        .from_env_lossy();
    for tag in &cfg.info {
        if let Ok(directive) = format!("{}=info", tag.target()).parse() {
            filter = filter.add_directive(directive);
        }
    }

    let base = tracing_fmt::layer()
        .with_writer(ConsoleWriter)
        .with_ansi(cfg.colored);
    let console = match cfg.format {
        LogFormat::Text => base
            .event_format(SyncFormatter::new(cfg.timestamps))
            .boxed(),
        LogFormat::Json => base.event_format(JsonFormatter).boxed(),
    };

    let file_layer = match &cfg.log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            let base = tracing_fmt::layer()
                .with_writer(FileWriter {
                    file: Arc::new(file),
                })
                .with_ansi(false);
            Some(match cfg.format {
                LogFormat::Text => base.event_format(SyncFormatter::new(true)).boxed(),
                LogFormat::Json => base.event_format(JsonFormatter).boxed(),
            })
        }
        None => None,
    };

    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file_layer);
    Ok(Box::new(registry))
}

/// Initialise the global [`tracing`] subscriber.
pub fn init(cfg: SubscriberConfig) -> io::Result<()> {
    subscriber(cfg)?
        .try_init()
        .map_err(|e| io::Error::other(e.to_string()))
}
