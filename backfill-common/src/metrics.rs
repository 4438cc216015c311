use std::net::SocketAddr;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use tracing::info;

const EXPONENTIAL_SECONDS: &[f64] = &[
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

/// Install the global recorder and serve `/metrics` on `bind` for the lifetime of the run.
/// Must be called from within a tokio runtime.
pub fn install_prometheus_exporter(bind: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new()
        .set_buckets(EXPONENTIAL_SECONDS)?
        .with_http_listener(bind)
        .install()?;

    info!("serving metrics on {}", bind);
    Ok(())
}
