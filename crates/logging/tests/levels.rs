// crates/logging/tests/levels.rs
use logging::{SubscriberConfig, Tag, subscriber};
use tracing::Level;
use tracing::subscriber::with_default;

#[test]
fn info_emitted_by_default() {
    let sub = subscriber(SubscriberConfig::default()).unwrap();
    with_default(sub, || {
        assert!(tracing::enabled!(Level::INFO));
        assert!(!tracing::enabled!(Level::DEBUG));
    });
}

#[test]
fn verbose_enables_debug() {
    let sub = subscriber(SubscriberConfig::builder().verbose(1).build()).unwrap();
    with_default(sub, || {
        assert!(tracing::enabled!(Level::DEBUG));
        assert!(!tracing::enabled!(Level::TRACE));
    });
}

#[test]
fn debug_flag_enables_debug() {
    let sub = subscriber(SubscriberConfig::builder().debug(true).build()).unwrap();
    with_default(sub, || {
        assert!(tracing::enabled!(Level::DEBUG));
    });
}

#[test]
fn quiet_levels() {
    let sub = subscriber(SubscriberConfig::builder().quiet(1).build()).unwrap();
    with_default(sub, || {
        assert!(!tracing::enabled!(Level::INFO));
        assert!(tracing::enabled!(Level::WARN));
    });
    let sub = subscriber(SubscriberConfig::builder().quiet(2).build()).unwrap();
    with_default(sub, || {
        assert!(!tracing::enabled!(Level::WARN));
        assert!(tracing::enabled!(Level::ERROR));
    });
}

#[test]
fn info_tag_survives_quiet() {
    let cfg = SubscriberConfig::builder()
        .quiet(1)
        .info([Tag::Rename])
        .build();
    let sub = subscriber(cfg).unwrap();
    with_default(sub, || {
        assert!(tracing::enabled!(target: "rensync::rename", Level::INFO));
        assert!(!tracing::enabled!(target: "rensync::delete", Level::INFO));
    });
}
