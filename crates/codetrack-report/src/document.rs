//! Format-neutral report document.
//!
//! A [`Document`] is an ordered list of [`Section`]s. Page breaks are
//! explicit, so an encoder never has to guess where the composer expected a
//! new page to start.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeadingLevel {
    Title,
    Section,
    Subsection,
}

impl HeadingLevel {
    pub fn font_size(self) -> f32 {
        match self {
            Self::Title => 25.0,
            Self::Section => 16.0,
            Self::Subsection => 14.0,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Align {
    #[default]
    Left,
    Center,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextStyle {
    #[default]
    Body,
    Small,
}

impl TextStyle {
    pub fn font_size(self) -> f32 {
        match self {
            Self::Body => 12.0,
            Self::Small => 10.0,
        }
    }
}

/// Encoded chart image as handed back by a renderer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedChart {
    #[serde(skip)]
    pub bytes: Vec<u8>,
    pub media_type: String,
    /// Intrinsic size in pixels.
    pub width: u32,
    pub height: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Section {
    Heading {
        text: String,
        level: HeadingLevel,
        align: Align,
    },
    Paragraph {
        lines: Vec<String>,
        style: TextStyle,
        align: Align,
    },
    /// Scaled to fit inside `fit_width` × `fit_height` points, aspect kept.
    Image {
        payload: RenderedChart,
        fit_width: f32,
        fit_height: f32,
        align: Align,
    },
    /// `label: count` rows. A table that follows a page break starts at the
    /// table top margin.
    Table { rows: Vec<(String, u64)> },
    PageBreak,
}

impl Section {
    pub fn heading(text: impl Into<String>, level: HeadingLevel) -> Self {
        Self::Heading {
            text: text.into(),
            level,
            align: Align::Left,
        }
    }

    pub fn centered_heading(text: impl Into<String>, level: HeadingLevel) -> Self {
        Self::Heading {
            text: text.into(),
            level,
            align: Align::Center,
        }
    }

    pub fn paragraph<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Paragraph {
            lines: lines.into_iter().map(Into::into).collect(),
            style: TextStyle::Body,
            align: Align::Left,
        }
    }

    pub fn is_page_break(&self) -> bool {
        matches!(self, Self::PageBreak)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub title: String,
    pub sections: Vec<Section>,
}

impl Document {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            sections: Vec::new(),
        }
    }

    pub fn push(&mut self, section: Section) {
        self.sections.push(section);
    }

    /// Number of pages the document spans.
    pub fn page_count(&self) -> usize {
        1 + self.sections.iter().filter(|s| s.is_page_break()).count()
    }

    pub fn images(&self) -> impl Iterator<Item = &RenderedChart> {
        self.sections.iter().filter_map(|s| match s {
            Section::Image { payload, .. } => Some(payload),
            _ => None,
        })
    }

    pub fn tables(&self) -> impl Iterator<Item = &[(String, u64)]> {
        self.sections.iter().filter_map(|s| match s {
            Section::Table { rows } => Some(rows.as_slice()),
            _ => None,
        })
    }

    /// Texts of every heading, in order.
    pub fn headings(&self) -> Vec<&str> {
        self.sections
            .iter()
            .filter_map(|s| match s {
                Section::Heading { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }
}

/// `M/D/YYYY` without zero padding.
pub fn footer_date(date: NaiveDate) -> String {
    format!("{}/{}/{}", date.month(), date.day(), date.year())
}

pub fn footer_text(date: NaiveDate) -> String {
    format!("Report generated on {}", footer_date(date))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn footer_date_is_unpadded() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        assert_eq!(footer_text(date), "Report generated on 3/7/2024");
    }

    #[test]
    fn page_count_follows_breaks() {
        let mut doc = Document::new("r");
        doc.push(Section::heading("a", HeadingLevel::Title));
        assert_eq!(doc.page_count(), 1);
        doc.push(Section::PageBreak);
        doc.push(Section::Table { rows: vec![("dp".into(), 1)] });
        assert_eq!(doc.page_count(), 2);
        assert_eq!(doc.tables().count(), 1);
    }

    #[test]
    fn sections_serialize_with_type_tag() {
        let value = serde_json::to_value(Section::heading("User Profile", HeadingLevel::Section)).unwrap();
        assert_eq!(value["type"], "heading");
        assert_eq!(value["level"], "section");
        assert_eq!(serde_json::to_value(Section::PageBreak).unwrap()["type"], "page_break");
    }
}
