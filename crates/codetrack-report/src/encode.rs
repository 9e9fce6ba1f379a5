//! Document encoding seam and the `printpdf` implementation.

use async_trait::async_trait;
use printpdf::{
    BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference, Pt,
    Svg, SvgTransform,
};

use codetrack_core::{ReportError, Result};

use crate::document::{Align, Document, RenderedChart, Section};
use crate::layout::{block_extent, image_size, text_width, LayoutCursor, PageLayout};
use crate::render::SVG_MEDIA_TYPE;

const LAYER_NAME: &str = "Layer 1";
const TABLE_FONT_SIZE: f32 = 10.0;
/// Baseline offset below a line's top edge, as a share of the font size.
const ASCENT: f32 = 0.8;

#[async_trait]
pub trait DocumentEncoder: Send + Sync {
    async fn encode(&self, document: Document) -> Result<Vec<u8>>;
}

/// Lays a [`Document`] out on fixed-size pages and writes PDF bytes.
#[derive(Clone, Copy, Debug, Default)]
pub struct PdfEncoder {
    layout: PageLayout,
}

impl PdfEncoder {
    pub fn new(layout: PageLayout) -> Self {
        Self { layout }
    }

    /// Blocking encode. Prefer [`DocumentEncoder::encode`] from async code.
    pub fn encode_blocking(&self, document: &Document) -> Result<Vec<u8>> {
        let mut writer = PdfWriter::new(&document.title, self.layout)?;
        for section in &document.sections {
            writer.section(section)?;
        }
        let pages = writer.cursor.page();
        let bytes = writer.finish()?;
        tracing::debug!(pages, bytes = bytes.len(), "pdf encoded");
        Ok(bytes)
    }
}

#[async_trait]
impl DocumentEncoder for PdfEncoder {
    async fn encode(&self, document: Document) -> Result<Vec<u8>> {
        let encoder = *self;
        tokio::task::spawn_blocking(move || encoder.encode_blocking(&document))
            .await
            .map_err(|e| ReportError::Render(format!("pdf task failed: {e}")))?
    }
}

fn pdf_err<E: std::fmt::Debug>(err: E) -> ReportError {
    ReportError::Render(format!("pdf encoding failed: {err:?}"))
}

struct PdfWriter {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    cursor: LayoutCursor,
}

impl PdfWriter {
    fn new(title: &str, layout: PageLayout) -> Result<Self> {
        let (doc, page, layer) = PdfDocument::new(title, page_width(&layout), page_height(&layout), LAYER_NAME);
        let regular = doc.add_builtin_font(BuiltinFont::Helvetica).map_err(pdf_err)?;
        let bold = doc.add_builtin_font(BuiltinFont::HelveticaBold).map_err(pdf_err)?;
        let layer = doc.get_page(page).get_layer(layer);
        Ok(Self {
            doc,
            layer,
            regular,
            bold,
            cursor: LayoutCursor::new(layout),
        })
    }

    fn layout(&self) -> PageLayout {
        *self.cursor.layout()
    }

    fn new_page(&mut self) {
        let layout = self.layout();
        let (page, layer) = self.doc.add_page(page_width(&layout), page_height(&layout), LAYER_NAME);
        self.layer = self.doc.get_page(page).get_layer(layer);
    }

    fn break_page(&mut self) {
        self.cursor.new_page();
        self.new_page();
    }

    fn section(&mut self, section: &Section) -> Result<()> {
        match section {
            Section::PageBreak => {
                self.break_page();
                Ok(())
            }
            Section::Table { rows } => {
                self.table(rows);
                Ok(())
            }
            other => self.block(other),
        }
    }

    fn block(&mut self, section: &Section) -> Result<()> {
        let Some(extent) = block_extent(section) else {
            return Ok(());
        };
        if self.cursor.needs_break(extent.height) {
            self.break_page();
        }
        let top = self.cursor.place(extent);

        match section {
            Section::Heading { text, level, align } => {
                let size = level.font_size();
                let font = self.bold.clone();
                self.text(text, size, self.align_x(text, size, *align), top, &font);
            }
            Section::Paragraph { lines, style, align } => {
                let size = style.font_size();
                let line = extent.height / lines.len().max(1) as f32;
                let font = self.regular.clone();
                for (i, text) in lines.iter().enumerate() {
                    let y = top + line * i as f32;
                    self.text(text, size, self.align_x(text, size, *align), y, &font);
                }
            }
            Section::Image {
                payload,
                fit_width,
                fit_height,
                align,
            } => self.image(payload, *fit_width, *fit_height, *align, top)?,
            Section::Table { .. } | Section::PageBreak => {}
        }
        Ok(())
    }

    fn table(&mut self, rows: &[(String, u64)]) {
        let layout = self.layout();
        let font = self.regular.clone();
        self.cursor.begin_table();
        for (label, count) in rows {
            if self.cursor.row_needs_break() {
                self.cursor.break_table();
                self.new_page();
            }
            let top = self.cursor.place_row();
            self.text(&format!("{label}: {count}"), TABLE_FONT_SIZE, layout.table_left, top, &font);
        }
    }

    fn image(&self, payload: &RenderedChart, fit_width: f32, fit_height: f32, align: Align, top: f32) -> Result<()> {
        if payload.media_type != SVG_MEDIA_TYPE {
            return Err(ReportError::Render(format!(
                "unsupported image type: {}",
                payload.media_type
            )));
        }
        let source = std::str::from_utf8(&payload.bytes)
            .map_err(|e| ReportError::Render(format!("svg payload is not utf-8: {e}")))?;
        let svg = Svg::parse(source).map_err(pdf_err)?;

        let (w, h) = image_size(payload, fit_width, fit_height);
        let layout = self.layout();
        let x = match align {
            Align::Left => layout.margin,
            Align::Center => layout.margin + (layout.content_width() - w).max(0.0) / 2.0,
        };
        let scale_x = w / payload.width.max(1) as f32;
        let scale_y = h / payload.height.max(1) as f32;

        svg.into_xobject(&self.layer).add_to_layer(
            &self.layer,
            SvgTransform {
                translate_x: Some(Pt(x)),
                translate_y: Some(Pt(layout.height - top - h)),
                scale_x: Some(scale_x),
                scale_y: Some(scale_y),
                dpi: Some(72.0),
                ..Default::default()
            },
        );
        Ok(())
    }

    fn align_x(&self, text: &str, size: f32, align: Align) -> f32 {
        let layout = self.layout();
        match align {
            Align::Left => layout.margin,
            Align::Center => layout.margin + (layout.content_width() - text_width(text, size)).max(0.0) / 2.0,
        }
    }

    /// Write one line with its top edge at `top`.
    fn text(&self, text: &str, size: f32, x: f32, top: f32, font: &IndirectFontRef) {
        let baseline = self.layout().height - top - size * ASCENT;
        self.layer
            .use_text(text, size, Mm::from(Pt(x)), Mm::from(Pt(baseline)), font);
    }

    fn finish(self) -> Result<Vec<u8>> {
        self.doc.save_to_bytes().map_err(pdf_err)
    }
}

fn page_width(layout: &PageLayout) -> Mm {
    Mm::from(Pt(layout.width))
}

fn page_height(layout: &PageLayout) -> Mm {
    Mm::from(Pt(layout.height))
}
