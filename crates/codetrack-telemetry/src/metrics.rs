//! Prometheus recorder setup and the metric names every crate records against.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::info;

use crate::TelemetryError;

/// Install the process-wide recorder. Fails if one is already installed.
pub fn install_recorder() -> Result<PrometheusHandle, TelemetryError> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| TelemetryError::Recorder(e.to_string()))?;
    info!("prometheus recorder installed");
    Ok(handle)
}

/// A handle backed by a recorder that is not installed globally. Renders
/// whatever was recorded through it, which is nothing unless the caller
/// records against the recorder directly.
pub fn detached_handle() -> PrometheusHandle {
    PrometheusBuilder::new().build_recorder().handle()
}

/// Prometheus text exposition for `/metrics`.
pub fn render(handle: &PrometheusHandle) -> String {
    handle.render()
}

/// Reports generated (counter, labels: format).
pub const REPORTS_GENERATED_TOTAL: &str = "reports_generated_total";
/// Report failures (counter, labels: format, kind).
pub const REPORT_ERRORS_TOTAL: &str = "report_errors_total";
/// End-to-end report duration (histogram, labels: format).
pub const REPORT_DURATION_SECONDS: &str = "report_duration_seconds";
/// Single chart render duration (histogram, labels: chart).
pub const CHART_RENDER_DURATION_SECONDS: &str = "chart_render_duration_seconds";
/// PDF encode duration (histogram).
pub const PDF_ENCODE_DURATION_SECONDS: &str = "pdf_encode_duration_seconds";
/// Rejected bearer tokens (counter, labels: reason).
pub const AUTH_FAILURES_TOTAL: &str = "auth_failures_total";
/// Problems imported from fixtures (counter).
pub const PROBLEMS_IMPORTED_TOTAL: &str = "problems_imported_total";
/// Problem metadata lookups during import (counter, labels: outcome).
pub const METADATA_LOOKUPS_TOTAL: &str = "metadata_lookups_total";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detached_handle_renders_empty() {
        let output = render(&detached_handle());
        assert!(!output.contains(REPORTS_GENERATED_TOTAL));
    }

    #[test]
    fn metric_constants_are_snake_case() {
        let names = [
            REPORTS_GENERATED_TOTAL,
            REPORT_ERRORS_TOTAL,
            REPORT_DURATION_SECONDS,
            CHART_RENDER_DURATION_SECONDS,
            PDF_ENCODE_DURATION_SECONDS,
            AUTH_FAILURES_TOTAL,
            PROBLEMS_IMPORTED_TOTAL,
            METADATA_LOOKUPS_TOTAL,
        ];
        for name in names {
            assert!(
                name.chars().all(|c| c.is_ascii_lowercase() || c == '_'),
                "metric name '{name}' must be snake_case"
            );
        }
    }
}
