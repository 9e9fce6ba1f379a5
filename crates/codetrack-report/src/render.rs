//! Chart rendering seam.
//!
//! [`SvgChartRenderer`] draws with `plotters` into an in-memory SVG string.
//! [`MockChartRenderer`] records what it was asked to draw.

use std::f64::consts::{FRAC_PI_2, TAU};

use async_trait::async_trait;
use parking_lot::Mutex;
use plotters::prelude::*;

use codetrack_core::{ReportError, Result};

use crate::chart::{ChartKind, ChartSpec};
use crate::document::RenderedChart;

pub const SVG_MEDIA_TYPE: &str = "image/svg+xml";

#[async_trait]
pub trait ChartRenderer: Send + Sync {
    /// Draw one chart. Failures are [`ReportError::Render`].
    async fn render(&self, spec: &ChartSpec) -> Result<RenderedChart>;
}

/// Reject specs no renderer can draw.
pub fn check_drawable(spec: &ChartSpec) -> Result<()> {
    if spec.is_empty() {
        return Err(ReportError::Render(format!("chart '{}' has no categories", spec.title)));
    }
    if spec.labels.len() != spec.values.len() {
        return Err(ReportError::Render(format!(
            "chart '{}' has {} labels but {} values",
            spec.title,
            spec.labels.len(),
            spec.values.len()
        )));
    }
    if spec.kind == ChartKind::Pie && spec.total() == 0 {
        return Err(ReportError::Render(format!("pie chart '{}' has no data", spec.title)));
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// SVG renderer
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug)]
pub struct SvgChartRenderer {
    width: u32,
    height: u32,
}

impl Default for SvgChartRenderer {
    fn default() -> Self {
        Self::new(600, 400)
    }
}

impl SvgChartRenderer {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Synchronous draw, usable outside a runtime.
    pub fn render_svg(&self, spec: &ChartSpec) -> Result<String> {
        check_drawable(spec)?;
        let mut svg = String::new();
        {
            let root = SVGBackend::with_string(&mut svg, (self.width, self.height)).into_drawing_area();
            root.fill(&WHITE).map_err(draw_err)?;
            match spec.kind {
                ChartKind::Pie => draw_pie(&root, spec)?,
                ChartKind::Bar => draw_bar(&root, spec)?,
            }
            root.present().map_err(draw_err)?;
        }
        Ok(svg)
    }
}

#[async_trait]
impl ChartRenderer for SvgChartRenderer {
    async fn render(&self, spec: &ChartSpec) -> Result<RenderedChart> {
        let svg = self.render_svg(spec)?;
        tracing::debug!(title = %spec.title, bytes = svg.len(), "chart rendered");
        Ok(RenderedChart {
            bytes: svg.into_bytes(),
            media_type: SVG_MEDIA_TYPE.to_string(),
            width: self.width,
            height: self.height,
        })
    }
}

fn draw_err<E: std::fmt::Display>(err: E) -> ReportError {
    ReportError::Render(format!("chart drawing failed: {err}"))
}

fn slice_color(index: usize) -> RGBColor {
    let c = Palette99::pick(index).to_rgba();
    RGBColor(c.0, c.1, c.2)
}

/// Wedges start at twelve o'clock and run clockwise. Legend on the right.
fn draw_pie<DB: DrawingBackend>(root: &DrawingArea<DB, plotters::coord::Shift>, spec: &ChartSpec) -> Result<()>
where
    DB::ErrorType: 'static,
{
    let (width, height) = root.dim_in_pixel();
    let (plot, legend) = root.split_horizontally(width * 3 / 5);

    let mut chart = ChartBuilder::on(&plot)
        .caption(&spec.title, ("sans-serif", 20))
        .margin(20)
        .build_cartesian_2d(-1.1f64..1.1f64, -1.1f64..1.1f64)
        .map_err(draw_err)?;

    let total = spec.total() as f64;
    let mut start = 0.0f64;
    for (index, value) in spec.values.iter().enumerate() {
        let sweep = *value as f64 / total * TAU;
        if sweep > 0.0 {
            let steps = ((sweep.to_degrees()).ceil() as usize).max(2);
            let mut points = Vec::with_capacity(steps + 2);
            points.push((0.0, 0.0));
            for step in 0..=steps {
                let angle = FRAC_PI_2 - (start + sweep * step as f64 / steps as f64);
                points.push((angle.cos(), angle.sin()));
            }
            chart
                .draw_series(std::iter::once(Polygon::new(points, slice_color(index).filled())))
                .map_err(draw_err)?;
        }
        start += sweep;
    }

    let font = ("sans-serif", 14).into_font();
    let row = 22i32;
    let top = (height as i32 - row * spec.labels.len() as i32).max(0) / 2;
    for (index, (label, value)) in spec.labels.iter().zip(&spec.values).enumerate() {
        let y = top + row * index as i32;
        legend
            .draw(&Rectangle::new([(10, y), (24, y + 14)], slice_color(index).filled()))
            .map_err(draw_err)?;
        legend
            .draw(&Text::new(format!("{label} ({value})"), (32, y), font.clone()))
            .map_err(draw_err)?;
    }
    Ok(())
}

fn draw_bar<DB: DrawingBackend>(root: &DrawingArea<DB, plotters::coord::Shift>, spec: &ChartSpec) -> Result<()>
where
    DB::ErrorType: 'static,
{
    let categories = spec.labels.len() as u32;
    let max = spec.values.iter().copied().max().unwrap_or(0).max(1);
    let y_top = max + max / 10 + 1;

    let mut chart = ChartBuilder::on(root)
        .caption(&spec.title, ("sans-serif", 20))
        .margin(15)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d((0u32..categories).into_segmented(), 0u64..y_top)
        .map_err(draw_err)?;

    let label_of = |segment: &SegmentValue<u32>| match segment {
        SegmentValue::CenterOf(i) => spec.labels.get(*i as usize).cloned().unwrap_or_default(),
        _ => String::new(),
    };
    {
        let mut mesh = chart.configure_mesh();
        mesh.disable_x_mesh()
            .x_labels(spec.labels.len())
            .x_label_formatter(&label_of);
        if let Some(axis) = &spec.axis {
            mesh.x_desc(axis.x.as_str()).y_desc(axis.y.as_str());
        }
        mesh.draw().map_err(draw_err)?;
    }

    chart
        .draw_series(
            Histogram::vertical(&chart)
                .style(BLUE.mix(0.6).filled())
                .margin(8)
                .data(spec.values.iter().enumerate().map(|(i, v)| (i as u32, *v))),
        )
        .map_err(draw_err)?;
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Mock
// ─────────────────────────────────────────────────────────────────────────────

/// Returns a fixed SVG and remembers every spec it saw.
#[derive(Default)]
pub struct MockChartRenderer {
    seen: Mutex<Vec<ChartSpec>>,
    fail_on: Mutex<Option<String>>,
}

impl MockChartRenderer {
    pub const SVG: &'static str =
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="600" height="400"><rect width="600" height="400" fill="white"/></svg>"#;

    pub fn new() -> Self {
        Self::default()
    }

    /// Fail any chart whose title matches.
    pub fn fail_on(&self, title: impl Into<String>) {
        *self.fail_on.lock() = Some(title.into());
    }

    pub fn seen(&self) -> Vec<ChartSpec> {
        self.seen.lock().clone()
    }
}

#[async_trait]
impl ChartRenderer for MockChartRenderer {
    async fn render(&self, spec: &ChartSpec) -> Result<RenderedChart> {
        self.seen.lock().push(spec.clone());
        if self.fail_on.lock().as_deref() == Some(spec.title.as_str()) {
            return Err(ReportError::Render(format!("mock failure for '{}'", spec.title)));
        }
        Ok(RenderedChart {
            bytes: Self::SVG.as_bytes().to_vec(),
            media_type: SVG_MEDIA_TYPE.to_string(),
            width: 600,
            height: 400,
        })
    }
}
