use std::sync::Once;

use metrics::{Unit, describe_counter, describe_gauge, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

/// Register help text for the view cache metrics with the installed recorder.
pub fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "boardcache_view_hit_total",
            Unit::Count,
            "Views served from memory with a matching counter."
        );
        describe_counter!(
            "boardcache_view_miss_total",
            Unit::Count,
            "Views missing from memory or built against a stale counter."
        );
        describe_counter!(
            "boardcache_view_build_total",
            Unit::Count,
            "Views rebuilt and stored."
        );
        describe_counter!(
            "boardcache_view_evict_total",
            Unit::Count,
            "Views evicted to stay within the cache capacity."
        );
        describe_gauge!(
            "boardcache_view_bytes",
            Unit::Bytes,
            "Estimated bytes held by cached views."
        );
        describe_histogram!(
            "boardcache_view_build_ms",
            Unit::Milliseconds,
            "View build latency in milliseconds."
        );
    });
}
