//! HTTP error mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use codetrack_core::ReportError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("access denied")]
    Unauthorized,

    #[error("invalid token")]
    Forbidden,

    #[error("error generating statistics: {0}")]
    Statistics(#[source] ReportError),

    #[error("error generating report: {0}")]
    Report(#[source] ReportError),

    #[error("metrics are disabled")]
    MetricsDisabled,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::Statistics(_) | Self::Report(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::MetricsDisabled => StatusCode::NOT_FOUND,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            Self::Unauthorized => json!({ "message": "Access denied" }),
            Self::Forbidden => json!({ "message": "Invalid token" }),
            Self::Statistics(err) => json!({
                "success": false,
                "message": "Error generating statistics",
                "error": err.to_string(),
            }),
            Self::Report(err) => json!({
                "message": "Error generating report",
                "error": err.to_string(),
            }),
            Self::MetricsDisabled => json!({ "message": "Metrics are disabled" }),
        };
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %self, "request failed");
        }
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body(err: ApiError) -> (StatusCode, serde_json::Value) {
        let resp = err.into_response();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), 10_000).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn auth_errors() {
        assert_eq!(
            body(ApiError::Unauthorized).await,
            (StatusCode::UNAUTHORIZED, json!({"message": "Access denied"}))
        );
        assert_eq!(
            body(ApiError::Forbidden).await,
            (StatusCode::FORBIDDEN, json!({"message": "Invalid token"}))
        );
    }

    #[tokio::test]
    async fn statistics_error_shape() {
        let (status, value) = body(ApiError::Statistics(ReportError::NotFound("user 3".into()))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(value["success"], false);
        assert_eq!(value["message"], "Error generating statistics");
        assert_eq!(value["error"], "not found: user 3");
    }

    #[tokio::test]
    async fn report_error_shape() {
        let (status, value) = body(ApiError::Report(ReportError::Render("svg".into()))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(value["message"], "Error generating report");
        assert!(value.get("success").is_none());
    }
}
