use std::{env, sync::OnceLock};

use sentry_tracing::{EventFilter, SentryLayer};
use tracing::Level;

const SENTRY_DSN_VAR: &str = "SENTRY_DSN";

static INIT_GUARD: OnceLock<sentry::ClientInitGuard> = OnceLock::new();

fn environment() -> &'static str {
    if cfg!(debug_assertions) {
        "dev"
    } else {
        "production"
    }
}

/// Initialises the Sentry client once per process. Reporting stays disabled
/// when `SENTRY_DSN` is unset or empty.
pub fn init_once(source: &'static str) {
    INIT_GUARD.get_or_init(|| {
        let dsn = env::var(SENTRY_DSN_VAR)
            .ok()
            .filter(|value| !value.trim().is_empty());
        sentry::init((
            dsn,
            sentry::ClientOptions {
                release: sentry::release_name!(),
                environment: Some(environment().into()),
                ..Default::default()
            },
        ))
    });

    sentry::configure_scope(|scope| {
        scope.set_tag("source", source);
    });
}

fn keeps_span(level: &Level) -> bool {
    matches!(
        *level,
        Level::DEBUG | Level::INFO | Level::WARN | Level::ERROR
    )
}

/// Errors become Sentry events; everything above TRACE rides along as breadcrumbs.
fn event_filter_for(level: &Level) -> EventFilter {
    match *level {
        Level::ERROR => EventFilter::Event,
        Level::DEBUG | Level::INFO | Level::WARN => EventFilter::Breadcrumb,
        Level::TRACE => EventFilter::Ignore,
    }
}

pub fn sentry_layer<S>() -> SentryLayer<S>
where
    S: tracing::Subscriber,
    S: for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    SentryLayer::default()
        .span_filter(|meta| keeps_span(meta.level()))
        .event_filter(|meta| event_filter_for(meta.level()))
}
