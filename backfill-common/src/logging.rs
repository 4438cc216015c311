use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Used when `RUST_LOG` is unset, empty or unparseable.
pub const DEFAULT_DIRECTIVES: &str = "info";

/// Build the log filter from `directives`, falling back to [`DEFAULT_DIRECTIVES`].
pub fn env_filter(directives: Option<&str>) -> EnvFilter {
    directives
        .map(str::trim)
        .filter(|directives| !directives.is_empty())
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_DIRECTIVES))
}

pub fn setup_tracing() {
    let directives = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let log_layer =
        tracing_subscriber::fmt::layer().with_filter(env_filter(directives.as_deref()));
    tracing_subscriber::registry().with(log_layer).init();
}
