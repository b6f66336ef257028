//! Prometheus metrics exposition
//!
//! The refresh loop emits:
//!
//! - `token_refresh_total` (counter): label `outcome` = `success` | `failure`
//! - `token_refresh_last_success_timestamp_seconds` (gauge)
//!
//! Nothing is recorded unless `[metrics].listen_addr` is configured.

use std::net::SocketAddr;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder with its own HTTP scrape listener.
///
/// Must be called from inside the tokio runtime.
pub fn install_exporter(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    describe();
    Ok(())
}

/// Register help text for the refresh metrics.
pub fn describe() {
    metrics::describe_counter!(
        "token_refresh_total",
        "Background token refresh attempts by outcome"
    );
    metrics::describe_gauge!(
        "token_refresh_last_success_timestamp_seconds",
        "Unix time of the last successful token refresh"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describe_does_not_panic_without_recorder() {
        describe();
    }

    #[test]
    fn described_metrics_render_with_help_text() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        metrics::with_local_recorder(&recorder, || {
            describe();
            metrics::counter!("token_refresh_total", "outcome" => "success").increment(2);
            metrics::counter!("token_refresh_total", "outcome" => "failure").increment(1);
        });

        let output = handle.render();
        assert!(
            output.contains("# HELP token_refresh_total Background token refresh attempts"),
            "got: {output}"
        );
        assert!(
            output.contains(r#"token_refresh_total{outcome="success"} 2"#),
            "got: {output}"
        );
        assert!(
            output.contains(r#"token_refresh_total{outcome="failure"} 1"#),
            "got: {output}"
        );
    }
}
