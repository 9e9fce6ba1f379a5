//! Router assembly and the listener lifecycle.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::routing::get;
use axum::Router;
use codetrack_telemetry::PrometheusHandle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use codetrack_report::ReportService;

use crate::auth::Authenticator;
use crate::config::ServerConfig;
use crate::routes;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub reports: Arc<ReportService>,
    pub auth: Arc<dyn Authenticator>,
    /// `None` when metrics are disabled; `/metrics` then answers 404.
    pub metrics: Option<PrometheusHandle>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(reports: Arc<ReportService>, auth: Arc<dyn Authenticator>, metrics: Option<PrometheusHandle>) -> Self {
        Self {
            reports,
            auth,
            metrics,
            start_time: Instant::now(),
        }
    }
}

pub fn build_router(state: AppState, request_timeout: Duration) -> Router {
    Router::new()
        .route("/api/reports/statistics", get(routes::statistics))
        .route("/api/reports/pdf", get(routes::pdf_report))
        .route("/api/reports/test", get(routes::test_pdf))
        .route("/health", get(routes::health))
        .route("/metrics", get(routes::metrics))
        .with_state(state)
        .layer(TimeoutLayer::new(request_timeout))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Bind and serve in a background task.
pub async fn start(config: &ServerConfig, state: AppState) -> Result<ServerHandle, std::io::Error> {
    let router = build_router(state, config.request_timeout());
    let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;
    let addr = listener.local_addr()?;
    let token = CancellationToken::new();

    tracing::info!(%addr, "codetrack server started");

    let shutdown = token.clone().cancelled_owned();
    let task = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router).with_graceful_shutdown(shutdown).await {
            tracing::error!(error = %e, "server stopped with error");
        }
    });

    Ok(ServerHandle { addr, token, task })
}

/// Running server. Dropping the handle leaves the server running.
pub struct ServerHandle {
    pub addr: SocketAddr,
    token: CancellationToken,
    task: JoinHandle<()>,
}

impl ServerHandle {
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Stop accepting connections and wait for in-flight requests.
    pub async fn shutdown(self) {
        self.token.cancel();
        if let Err(e) = self.task.await {
            tracing::warn!(error = %e, "server task ended abnormally");
        }
        tracing::info!("codetrack server stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use tower::ServiceExt;

    use codetrack_core::{MemorySource, ProblemMetadata, ProblemRecord, ProblemStatus, ReportError, UserId, UserProfile};
    use codetrack_report::{ComposerOptions, MockChartRenderer, PdfEncoder, ReportComposer};

    use crate::auth::{issue_token, JwtAuthenticator};

    const SECRET: &str = "router-secret";

    fn state_with(source: Arc<MemorySource>, metrics: Option<PrometheusHandle>) -> AppState {
        let composer = ReportComposer::new(Arc::new(MockChartRenderer::new()), ComposerOptions::default());
        let reports = ReportService::new(source, composer, Arc::new(PdfEncoder::default()));
        let auth = JwtAuthenticator::new(SECRET).unwrap();
        AppState::new(Arc::new(reports), Arc::new(auth), metrics)
    }

    fn seeded() -> Arc<MemorySource> {
        let source = MemorySource::new();
        source.insert_user(UserProfile {
            id: UserId::new(7),
            username: "ada".into(),
            email: "ada@example.com".into(),
        });
        source.push_problem(
            UserId::new(7),
            ProblemRecord::new(1, ProblemStatus::Done)
                .with_metadata(ProblemMetadata::default().with_rating("1500").with_tags(["dp"])),
        );
        source.push_problem(
            UserId::new(7),
            ProblemRecord::new(2, ProblemStatus::Pending)
                .with_metadata(ProblemMetadata::default().with_rating("1500").with_tags(["dp", "math"])),
        );
        Arc::new(source)
    }

    fn router() -> Router {
        build_router(state_with(seeded(), None), Duration::from_secs(30))
    }

    fn token(user: i64) -> String {
        issue_token(SECRET, UserId::new(user), Duration::from_secs(60)).unwrap()
    }

    fn get_req(uri: &str, bearer: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(token) = bearer {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn json_body(resp: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(resp.into_body(), 1_000_000).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn statistics_requires_token() {
        let resp = router().oneshot(get_req("/api/reports/statistics", None)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(resp).await, serde_json::json!({"message": "Access denied"}));
    }

    #[tokio::test]
    async fn statistics_rejects_bad_token() {
        let resp = router()
            .oneshot(get_req("/api/reports/statistics", Some("garbage")))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        assert_eq!(json_body(resp).await["message"], "Invalid token");
    }

    #[tokio::test]
    async fn statistics_for_authenticated_user() {
        let resp = router()
            .oneshot(get_req("/api/reports/statistics", Some(&token(7))))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = json_body(resp).await;
        assert_eq!(body["success"], true);
        let stats = &body["statistics"];
        assert_eq!(stats["user"]["username"], "ada");
        assert_eq!(stats["summary"]["totalProblems"], 2);
        assert_eq!(stats["summary"]["completionRate"], 50.0);
        assert_eq!(stats["distributions"]["ratings"]["1500"], 2);
        assert_eq!(stats["distributions"]["tags"]["dp"], 2);
    }

    #[tokio::test]
    async fn statistics_for_unknown_user_is_500() {
        let resp = router()
            .oneshot(get_req("/api/reports/statistics", Some(&token(99))))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = json_body(resp).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Error generating statistics");
        assert_eq!(body["error"], "not found: user 99");
    }

    #[tokio::test]
    async fn pdf_report_is_attachment() {
        let resp = router()
            .oneshot(get_req("/api/reports/pdf", Some(&token(7))))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[header::CONTENT_TYPE], "application/pdf");
        assert_eq!(
            resp.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=problem-report-7.pdf"
        );
        let bytes = axum::body::to_bytes(resp.into_body(), 10_000_000).await.unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[tokio::test]
    async fn pdf_report_upstream_failure_is_500() {
        let source = seeded();
        source.set_failure(Some(ReportError::Upstream("db offline".into())));
        let app = build_router(state_with(source, None), Duration::from_secs(30));
        let resp = app.oneshot(get_req("/api/reports/pdf", Some(&token(7)))).await.unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = json_body(resp).await;
        assert_eq!(body["message"], "Error generating report");
        assert_eq!(body["error"], "upstream failure: db offline");
    }

    #[tokio::test]
    async fn test_pdf_needs_no_token() {
        let resp = router().oneshot(get_req("/api/reports/test", None)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[header::CONTENT_DISPOSITION], "attachment; filename=test.pdf");
    }

    #[tokio::test]
    async fn health_endpoint_returns_ok() {
        let resp = router().oneshot(get_req("/health", None)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = json_body(resp).await;
        assert_eq!(body["status"], "ok");
        assert!(body["uptime_secs"].is_number());
    }

    #[tokio::test]
    async fn metrics_disabled_is_404() {
        let resp = router().oneshot(get_req("/metrics", None)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn metrics_enabled_renders_text() {
        let handle = codetrack_telemetry::metrics::detached_handle();
        let app = build_router(state_with(seeded(), Some(handle)), Duration::from_secs(30));
        let resp = app.oneshot(get_req("/metrics", None)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(resp.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/plain"));
    }

    #[tokio::test]
    async fn unknown_route_returns_404() {
        let resp = router().oneshot(get_req("/nonexistent", None)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn start_and_shutdown() {
        let config = ServerConfig {
            host: "127.0.0.1".into(),
            port: 0,
            request_timeout_secs: 5,
        };
        let handle = start(&config, state_with(seeded(), None)).await.unwrap();
        assert_ne!(handle.addr.port(), 0);
        let token = handle.token();
        handle.shutdown().await;
        assert!(token.is_cancelled());
    }
}
