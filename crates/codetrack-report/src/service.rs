//! End-to-end report pipeline: fetch, aggregate, compose, encode.

use std::sync::Arc;
use std::time::Instant;

use tracing::{info, instrument, warn};

use codetrack_core::{ProblemSource, ReportError, Result, Statistics, UserId};
use codetrack_telemetry::metrics::{
    PDF_ENCODE_DURATION_SECONDS, REPORTS_GENERATED_TOTAL, REPORT_DURATION_SECONDS, REPORT_ERRORS_TOTAL,
};

use crate::aggregate::generate_statistics;
use crate::compose::ReportComposer;
use crate::document::{Align, Document, HeadingLevel, Section};
use crate::encode::DocumentEncoder;

pub const TEST_DOCUMENT_TITLE: &str = "Test PDF Document";

const FORMAT_JSON: &str = "json";
const FORMAT_PDF: &str = "pdf";

/// Wires a [`ProblemSource`], a [`ReportComposer`] and a [`DocumentEncoder`].
///
/// Every operation is all-or-nothing: the first collaborator error aborts
/// and is returned with its original kind.
#[derive(Clone)]
pub struct ReportService {
    source: Arc<dyn ProblemSource>,
    composer: ReportComposer,
    encoder: Arc<dyn DocumentEncoder>,
}

impl ReportService {
    pub fn new(source: Arc<dyn ProblemSource>, composer: ReportComposer, encoder: Arc<dyn DocumentEncoder>) -> Self {
        Self {
            source,
            composer,
            encoder,
        }
    }

    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn statistics(&self, user_id: UserId) -> Result<Statistics> {
        let started = Instant::now();
        let result = generate_statistics(self.source.as_ref(), user_id).await;
        record(FORMAT_JSON, started, result.as_ref().err());
        if let Ok(stats) = &result {
            info!(total = stats.summary.total_problems, "statistics generated");
        }
        result
    }

    /// Statistics composed into a [`Document`], not yet encoded.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn document(&self, user_id: UserId) -> Result<Document> {
        let stats = generate_statistics(self.source.as_ref(), user_id).await?;
        self.composer.compose(&stats).await
    }

    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn pdf_report(&self, user_id: UserId) -> Result<Vec<u8>> {
        let started = Instant::now();
        let result = self.build_pdf(user_id).await;
        record(FORMAT_PDF, started, result.as_ref().err());
        if let Ok(bytes) = &result {
            info!(bytes = bytes.len(), "pdf report generated");
        }
        result
    }

    async fn build_pdf(&self, user_id: UserId) -> Result<Vec<u8>> {
        let document = self.document(user_id).await?;
        self.encode(document).await
    }

    /// One-heading diagnostic PDF. Touches neither the source nor the renderer.
    #[instrument(skip(self))]
    pub async fn test_pdf(&self) -> Result<Vec<u8>> {
        let mut document = Document::new(TEST_DOCUMENT_TITLE);
        document.push(Section::Heading {
            text: TEST_DOCUMENT_TITLE.to_string(),
            level: HeadingLevel::Title,
            align: Align::Center,
        });
        self.encode(document).await
    }

    async fn encode(&self, document: Document) -> Result<Vec<u8>> {
        let started = Instant::now();
        let bytes = self.encoder.encode(document).await?;
        metrics::histogram!(PDF_ENCODE_DURATION_SECONDS).record(started.elapsed().as_secs_f64());
        Ok(bytes)
    }
}

fn record(format: &'static str, started: Instant, error: Option<&ReportError>) {
    metrics::histogram!(REPORT_DURATION_SECONDS, "format" => format).record(started.elapsed().as_secs_f64());
    match error {
        None => metrics::counter!(REPORTS_GENERATED_TOTAL, "format" => format).increment(1),
        Some(err) => {
            metrics::counter!(REPORT_ERRORS_TOTAL, "format" => format, "kind" => err.error_kind()).increment(1);
            if err.is_not_found() {
                info!(format, error = %err, "report subject not found");
            } else {
                warn!(format, kind = err.error_kind(), error = %err, "report generation failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compose::ComposerOptions;
    use crate::encode::PdfEncoder;
    use crate::render::MockChartRenderer;
    use assert_matches::assert_matches;
    use codetrack_core::{MemorySource, ProblemMetadata, ProblemRecord, ProblemStatus, UserProfile};

    struct FailingEncoder;

    #[async_trait::async_trait]
    impl DocumentEncoder for FailingEncoder {
        async fn encode(&self, _document: Document) -> Result<Vec<u8>> {
            Err(ReportError::Render("encoder offline".into()))
        }
    }

    fn source() -> Arc<MemorySource> {
        let source = MemorySource::new();
        source.insert_user(UserProfile {
            id: UserId::new(1),
            username: "ada".into(),
            email: "ada@example.com".into(),
        });
        source.push_problem(
            UserId::new(1),
            ProblemRecord::new(1, ProblemStatus::Done)
                .with_metadata(ProblemMetadata::default().with_rating("1500").with_tags(["dp"])),
        );
        source.push_problem(
            UserId::new(1),
            ProblemRecord::new(2, ProblemStatus::Pending)
                .with_metadata(ProblemMetadata::default().with_rating("1500").with_tags(["dp", "math"])),
        );
        Arc::new(source)
    }

    fn service_with(source: Arc<MemorySource>, encoder: Arc<dyn DocumentEncoder>) -> (ReportService, Arc<MockChartRenderer>) {
        let mock = Arc::new(MockChartRenderer::new());
        let composer = ReportComposer::new(mock.clone(), ComposerOptions::default());
        (ReportService::new(source, composer, encoder), mock)
    }

    fn service() -> (ReportService, Arc<MockChartRenderer>) {
        service_with(source(), Arc::new(PdfEncoder::default()))
    }

    #[tokio::test]
    async fn statistics_for_two_records() {
        let (service, _) = service();
        let stats = service.statistics(UserId::new(1)).await.unwrap();
        assert_eq!(stats.summary.total_problems, 2);
        assert!((stats.summary.completion_rate - 50.0).abs() < f64::EPSILON);
        assert_eq!(stats.distributions.tags.get("dp"), Some(&2));
    }

    #[tokio::test]
    async fn unknown_user_fails_both_paths() {
        let (service, mock) = service();
        assert_matches!(service.statistics(UserId::new(9)).await, Err(ReportError::NotFound(_)));
        assert_matches!(service.pdf_report(UserId::new(9)).await, Err(ReportError::NotFound(_)));
        assert!(mock.seen().is_empty());
    }

    #[tokio::test]
    async fn pdf_report_renders_three_charts() {
        let (service, mock) = service();
        let bytes = service.pdf_report(UserId::new(1)).await.unwrap();
        assert!(bytes.starts_with(b"%PDF"));
        assert_eq!(mock.seen().len(), 3);
    }

    #[tokio::test]
    async fn renderer_failure_surfaces_as_render() {
        let (service, mock) = service();
        mock.fail_on(crate::chart::TAG_CHART_TITLE);
        assert_matches!(service.pdf_report(UserId::new(1)).await, Err(ReportError::Render(_)));
    }

    #[tokio::test]
    async fn encoder_failure_surfaces_as_render() {
        let (service, _) = service_with(source(), Arc::new(FailingEncoder));
        assert_matches!(service.pdf_report(UserId::new(1)).await, Err(ReportError::Render(msg)) if msg == "encoder offline");
    }

    #[tokio::test]
    async fn upstream_failure_keeps_kind() {
        let source = source();
        source.set_failure(Some(ReportError::Upstream("db offline".into())));
        let (service, _) = service_with(source, Arc::new(PdfEncoder::default()));
        assert_matches!(service.pdf_report(UserId::new(1)).await, Err(ReportError::Upstream(_)));
    }

    #[tokio::test]
    async fn test_pdf_skips_source_and_renderer() {
        let source = source();
        source.set_failure(Some(ReportError::Upstream("db offline".into())));
        let (service, mock) = service_with(source, Arc::new(PdfEncoder::default()));
        let bytes = service.test_pdf().await.unwrap();
        assert!(bytes.starts_with(b"%PDF"));
        assert!(mock.seen().is_empty());
    }

    #[tokio::test]
    async fn document_has_tag_breakdown() {
        let (service, _) = service();
        let doc = service.document(UserId::new(1)).await.unwrap();
        assert!(doc.headings().contains(&"Tag Breakdown"));
        let rows: Vec<(String, u64)> = doc.tables().flat_map(<[(String, u64)]>::to_vec).collect();
        assert_eq!(rows, vec![("dp".to_string(), 2), ("math".to_string(), 1)]);
    }
}
