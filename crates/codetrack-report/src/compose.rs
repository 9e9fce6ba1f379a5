//! Builds a [`Document`] from [`Statistics`].

use std::sync::Arc;
use std::time::Instant;

use chrono::{Local, NaiveDate};
use tracing::instrument;

use codetrack_core::{Result, Statistics};
use codetrack_telemetry::metrics::CHART_RENDER_DURATION_SECONDS;

use crate::chart::{self, ChartSpec, DEFAULT_PIE_MAX_SLICES};
use crate::document::{footer_text, Align, Document, HeadingLevel, Section, TextStyle};
use crate::layout::{block_extent, LayoutCursor, PageLayout};
use crate::render::ChartRenderer;

pub const DEFAULT_REPORT_TITLE: &str = "Problem Solving Statistics Report";

#[derive(Clone, Debug)]
pub struct ComposerOptions {
    pub title: String,
    pub fit_width: f32,
    pub fit_height: f32,
    pub pie_max_slices: usize,
    pub layout: PageLayout,
}

impl Default for ComposerOptions {
    fn default() -> Self {
        Self {
            title: DEFAULT_REPORT_TITLE.to_string(),
            fit_width: 500.0,
            fit_height: 300.0,
            pie_max_slices: DEFAULT_PIE_MAX_SLICES,
            layout: PageLayout::A4,
        }
    }
}

/// Turns statistics into a paginated document, rendering charts through
/// the injected [`ChartRenderer`] one at a time.
#[derive(Clone)]
pub struct ReportComposer {
    renderer: Arc<dyn ChartRenderer>,
    options: ComposerOptions,
}

impl ReportComposer {
    pub fn new(renderer: Arc<dyn ChartRenderer>, options: ComposerOptions) -> Self {
        Self { renderer, options }
    }

    pub fn options(&self) -> &ComposerOptions {
        &self.options
    }

    /// Compose with today's local date in the footer.
    pub async fn compose(&self, stats: &Statistics) -> Result<Document> {
        self.compose_on(stats, Local::now().date_naive()).await
    }

    #[instrument(skip_all, fields(user_id = %stats.user.id))]
    pub async fn compose_on(&self, stats: &Statistics, date: NaiveDate) -> Result<Document> {
        let opts = &self.options;
        let mut flow = Flow::new(&opts.title, opts.layout);

        flow.block(Section::centered_heading(&opts.title, HeadingLevel::Title));

        flow.block(Section::heading("User Profile", HeadingLevel::Section));
        flow.block(Section::paragraph([
            format!("Username: {}", stats.user.username),
            format!("Email: {}", stats.user.email),
        ]));

        let s = &stats.summary;
        flow.block(Section::heading("Problem Summary", HeadingLevel::Section));
        flow.block(Section::paragraph([
            format!("Total Problems: {}", s.total_problems),
            format!("Problems Solved: {}", s.solved_problems),
            format!("Problems In Progress: {}", s.started_problems),
            format!("Problems Pending: {}", s.pending_problems),
            format!("Completion Rate: {}%", s.completion_rate),
        ]));

        if let Some(spec) = chart::status_chart(s) {
            self.chart(&mut flow, &spec).await?;
        }

        let distributions = &stats.distributions;
        if let Some(spec) = chart::rating_chart(&distributions.ratings) {
            flow.page_break();
            flow.block(Section::heading("Problem Ratings Distribution", HeadingLevel::Section));
            self.chart(&mut flow, &spec).await?;
        }

        if let Some(spec) = chart::tag_chart(&distributions.tags, opts.pie_max_slices) {
            flow.page_break();
            flow.block(Section::heading("Problem Tags Distribution", HeadingLevel::Section));
            self.chart(&mut flow, &spec).await?;
            flow.block(Section::centered_heading("Tag Breakdown", HeadingLevel::Subsection));
            flow.table(chart::ranked(&distributions.tags));
        }

        flow.block(Section::Paragraph {
            lines: vec![footer_text(date)],
            style: TextStyle::Small,
            align: Align::Center,
        });

        let doc = flow.finish();
        tracing::debug!(
            sections = doc.sections.len(),
            pages = doc.page_count(),
            "report composed"
        );
        Ok(doc)
    }

    async fn chart(&self, flow: &mut Flow, spec: &ChartSpec) -> Result<()> {
        let started = Instant::now();
        let payload = self.renderer.render(spec).await?;
        metrics::histogram!(CHART_RENDER_DURATION_SECONDS, "chart" => spec.kind.as_str())
            .record(started.elapsed().as_secs_f64());
        flow.block(Section::Image {
            payload,
            fit_width: self.options.fit_width,
            fit_height: self.options.fit_height,
            align: Align::Center,
        });
        Ok(())
    }
}

/// Accumulates sections while tracking the page cursor.
struct Flow {
    doc: Document,
    cursor: LayoutCursor,
}

impl Flow {
    fn new(title: &str, layout: PageLayout) -> Self {
        Self {
            doc: Document::new(title),
            cursor: LayoutCursor::new(layout),
        }
    }

    fn page_break(&mut self) {
        self.cursor.new_page();
        self.doc.push(Section::PageBreak);
    }

    /// Push a flowing block, breaking first if it would cross the bottom margin.
    fn block(&mut self, section: Section) {
        if let Some(extent) = block_extent(&section) {
            if self.cursor.needs_break(extent.height) {
                self.page_break();
            }
            self.cursor.place(extent);
        }
        self.doc.push(section);
    }

    /// Push table rows, splitting into a new table after each page break.
    fn table(&mut self, rows: Vec<(String, u64)>) {
        self.cursor.begin_table();
        let mut chunk = Vec::new();
        for row in rows {
            if self.cursor.row_needs_break() {
                if !chunk.is_empty() {
                    self.doc.push(Section::Table {
                        rows: std::mem::take(&mut chunk),
                    });
                }
                self.cursor.break_table();
                self.doc.push(Section::PageBreak);
            }
            self.cursor.place_row();
            chunk.push(row);
        }
        if !chunk.is_empty() {
            self.doc.push(Section::Table { rows: chunk });
        }
    }

    fn finish(self) -> Document {
        self.doc
    }
}
