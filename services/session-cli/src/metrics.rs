//! Prometheus recorder for the `session_client_*` metrics
//!
//! Installed once at startup; `--metrics` renders the text exposition format
//! to stderr after the request completes.

use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder, PrometheusHandle};

/// Install the Prometheus recorder and return a handle for rendering metrics.
///
/// `session_client_renewal_queue_depth` gets explicit buckets so it renders
/// as a histogram rather than a summary.
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    builder()?.install_recorder()
}

fn builder() -> Result<PrometheusBuilder, BuildError> {
    PrometheusBuilder::new().set_buckets_for_metric(
        Matcher::Full("session_client_renewal_queue_depth".to_string()),
        &[1.0, 2.0, 4.0, 8.0, 16.0, 32.0, 64.0],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_depth_renders_as_histogram() {
        let recorder = builder().unwrap().build_recorder();
        let handle = recorder.handle();
        let _guard = metrics::set_default_local_recorder(&recorder);

        metrics::histogram!("session_client_renewal_queue_depth").record(3.0);

        let output = handle.render();
        assert!(
            output.contains("session_client_renewal_queue_depth_bucket"),
            "got: {output}"
        );
    }
}
