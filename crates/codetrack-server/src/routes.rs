//! Route handlers. Each one delegates to [`ReportService`](codetrack_report::ReportService)
//! and maps the outcome to HTTP.

use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use codetrack_core::Statistics;
use codetrack_telemetry::metrics::render as render_metrics;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::health::{self, HealthResponse};
use crate::server::AppState;

const PDF_CONTENT_TYPE: &str = "application/pdf";
const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4";

#[derive(Debug, Serialize)]
pub struct StatisticsResponse {
    pub success: bool,
    pub statistics: Statistics,
}

/// GET /api/reports/statistics
pub async fn statistics(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<StatisticsResponse>, ApiError> {
    let statistics = state.reports.statistics(user).await.map_err(ApiError::Statistics)?;
    Ok(Json(StatisticsResponse {
        success: true,
        statistics,
    }))
}

/// GET /api/reports/pdf
pub async fn pdf_report(State(state): State<AppState>, AuthUser(user): AuthUser) -> Result<Response, ApiError> {
    let bytes = state.reports.pdf_report(user).await.map_err(ApiError::Report)?;
    Ok(pdf_response(bytes, &format!("problem-report-{user}.pdf")))
}

/// GET /api/reports/test
pub async fn test_pdf(State(state): State<AppState>) -> Result<Response, ApiError> {
    let bytes = state.reports.test_pdf().await.map_err(ApiError::Report)?;
    Ok(pdf_response(bytes, "test.pdf"))
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(health::health_check(state.start_time))
}

/// GET /metrics
pub async fn metrics(State(state): State<AppState>) -> Result<Response, ApiError> {
    let handle = state.metrics.as_ref().ok_or(ApiError::MetricsDisabled)?;
    Ok(([(header::CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE)], render_metrics(handle)).into_response())
}

fn pdf_response(bytes: Vec<u8>, filename: &str) -> Response {
    (
        [
            (header::CONTENT_TYPE, PDF_CONTENT_TYPE.to_string()),
            (header::CONTENT_DISPOSITION, format!("attachment; filename={filename}")),
        ],
        bytes,
    )
        .into_response()
}
