//! Page geometry and the vertical cursor shared by the composer and the
//! encoder.
//!
//! Coordinates are PDF points measured from the top of the page. The
//! composer runs the cursor to decide where page breaks go; the encoder
//! replays the same walk to place content, so both agree on every row.

use crate::document::{HeadingLevel, RenderedChart, Section, TextStyle};

/// Ratio of line height to font size for the builtin Helvetica faces.
pub const LINE_HEIGHT_FACTOR: f32 = 1.15;

/// Rough Helvetica advance width as a share of the font size.
pub const AVG_CHAR_WIDTH: f32 = 0.5;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PageLayout {
    pub width: f32,
    pub height: f32,
    pub margin: f32,
    /// Where table rows restart after a break.
    pub table_top: f32,
    /// Distance from the page bottom past which no further row starts.
    pub table_bottom_gap: f32,
    pub table_left: f32,
    pub row_height: f32,
}

impl PageLayout {
    pub const A4: Self = Self {
        width: 595.28,
        height: 841.89,
        margin: 50.0,
        table_top: 100.0,
        table_bottom_gap: 100.0,
        table_left: 100.0,
        row_height: 20.0,
    };

    pub fn content_width(&self) -> f32 {
        self.width - 2.0 * self.margin
    }

    pub fn content_bottom(&self) -> f32 {
        self.height - self.margin
    }

    pub fn table_limit(&self) -> f32 {
        self.height - self.table_bottom_gap
    }
}

impl Default for PageLayout {
    fn default() -> Self {
        Self::A4
    }
}

pub fn line_height(font_size: f32) -> f32 {
    font_size * LINE_HEIGHT_FACTOR
}

pub fn text_width(text: &str, font_size: f32) -> f32 {
    text.chars().count() as f32 * font_size * AVG_CHAR_WIDTH
}

/// Scale `(w, h)` to fit inside the box, keeping the aspect ratio. Small
/// images grow to fill the box.
pub fn fit_size(width: u32, height: u32, fit_width: f32, fit_height: f32) -> (f32, f32) {
    if width == 0 || height == 0 {
        return (0.0, 0.0);
    }
    let (w, h) = (width as f32, height as f32);
    let scale = (fit_width / w).min(fit_height / h);
    (w * scale, h * scale)
}

pub fn image_size(payload: &RenderedChart, fit_width: f32, fit_height: f32) -> (f32, f32) {
    fit_size(payload.width, payload.height, fit_width, fit_height)
}

/// Height a block occupies and the gap left after it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BlockExtent {
    pub height: f32,
    pub gap_after: f32,
}

/// Extent of a flowing section. Tables and page breaks are not blocks and
/// return `None`.
pub fn block_extent(section: &Section) -> Option<BlockExtent> {
    match section {
        Section::Heading { level, .. } => {
            let line = line_height(level.font_size());
            let gap = match level {
                HeadingLevel::Title => line,
                HeadingLevel::Section | HeadingLevel::Subsection => line * 0.5,
            };
            Some(BlockExtent {
                height: line,
                gap_after: gap,
            })
        }
        Section::Paragraph { lines, style, .. } => {
            let line = line_height(style.font_size());
            let gap = match style {
                TextStyle::Body => line,
                TextStyle::Small => 0.0,
            };
            Some(BlockExtent {
                height: line * lines.len() as f32,
                gap_after: gap,
            })
        }
        Section::Image {
            payload,
            fit_width,
            fit_height,
            ..
        } => Some(BlockExtent {
            height: image_size(payload, *fit_width, *fit_height).1,
            gap_after: line_height(TextStyle::Body.font_size()),
        }),
        Section::Table { .. } | Section::PageBreak => None,
    }
}

/// Vertical position on the current page.
#[derive(Clone, Debug)]
pub struct LayoutCursor {
    layout: PageLayout,
    y: f32,
    page: usize,
}

impl LayoutCursor {
    pub fn new(layout: PageLayout) -> Self {
        Self {
            y: layout.margin,
            layout,
            page: 1,
        }
    }

    pub fn layout(&self) -> &PageLayout {
        &self.layout
    }

    pub fn y(&self) -> f32 {
        self.y
    }

    /// 1-based page number.
    pub fn page(&self) -> usize {
        self.page
    }

    pub fn new_page(&mut self) {
        self.page += 1;
        self.y = self.layout.margin;
    }

    pub fn at_page_top(&self) -> bool {
        self.y <= self.layout.margin
    }

    pub fn fits(&self, height: f32) -> bool {
        self.y + height <= self.layout.content_bottom()
    }

    /// Whether a block of this height must start on a fresh page. A block
    /// taller than a whole page never asks for a break at the page top.
    pub fn needs_break(&self, height: f32) -> bool {
        !self.fits(height) && !self.at_page_top()
    }

    /// Place a block and return its top edge. The caller decides about page
    /// breaks first via [`needs_break`](Self::needs_break).
    pub fn place(&mut self, extent: BlockExtent) -> f32 {
        let top = self.y;
        self.y += extent.height + extent.gap_after;
        top
    }

    /// Start a table at the cursor, or at the table top margin on a fresh page.
    pub fn begin_table(&mut self) {
        if self.at_page_top() {
            self.y = self.y.max(self.layout.table_top);
        }
    }

    /// Whether the next row has to go to a new page.
    pub fn row_needs_break(&self) -> bool {
        self.y > self.layout.table_limit()
    }

    /// Move to a new page and reset to the table top margin.
    pub fn break_table(&mut self) {
        self.new_page();
        self.y = self.layout.table_top;
    }

    /// Place a row and return its top edge.
    pub fn place_row(&mut self) -> f32 {
        let top = self.y;
        self.y += self.layout.row_height;
        top
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_keeps_aspect_and_scales_both_ways() {
        assert_eq!(fit_size(600, 400, 500.0, 300.0), (450.0, 300.0));
        assert_eq!(fit_size(100, 100, 500.0, 300.0), (300.0, 300.0));
        assert_eq!(fit_size(0, 100, 500.0, 300.0), (0.0, 0.0));
    }

    #[test]
    fn table_rows_break_past_limit() {
        let layout = PageLayout::A4;
        let mut cursor = LayoutCursor::new(layout);
        cursor.begin_table();
        assert!((cursor.y() - 100.0).abs() < f32::EPSILON);

        let mut breaks = 0;
        for _ in 0..40 {
            if cursor.row_needs_break() {
                cursor.break_table();
                breaks += 1;
            }
            cursor.place_row();
        }
        // 100 + 20k > 741.89 first holds at k = 33.
        assert_eq!(breaks, 1);
        assert_eq!(cursor.page(), 2);
    }

    #[test]
    fn table_mid_page_starts_at_cursor() {
        let mut cursor = LayoutCursor::new(PageLayout::A4);
        cursor.place(BlockExtent {
            height: 200.0,
            gap_after: 0.0,
        });
        cursor.begin_table();
        assert!((cursor.y() - 250.0).abs() < f32::EPSILON);
    }

    #[test]
    fn oversized_block_at_top_does_not_break() {
        let cursor = LayoutCursor::new(PageLayout::A4);
        assert!(!cursor.needs_break(2000.0));
    }

    #[test]
    fn heading_extents() {
        let title = block_extent(&Section::heading("t", HeadingLevel::Title)).unwrap();
        assert!((title.height - 28.75).abs() < 1e-4);
        assert!((title.gap_after - 28.75).abs() < 1e-4);
        let section = block_extent(&Section::heading("s", HeadingLevel::Section)).unwrap();
        assert!((section.gap_after - 9.2).abs() < 1e-4);
        assert!(block_extent(&Section::PageBreak).is_none());
    }
}
