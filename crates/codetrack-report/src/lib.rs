//! # codetrack-report
//!
//! Turns a user's problem records into statistics and a paginated PDF.
//!
//! - [`aggregate`]: records to [`Statistics`](codetrack_core::Statistics)
//! - [`chart`]: chart data shaping (rating sort, pie collapsing)
//! - [`compose`]: statistics to a format-neutral [`Document`]
//! - [`render`] / [`encode`]: chart and document collaborators
//! - [`service`]: the whole pipeline behind [`ReportService`]

#![deny(unsafe_code)]

pub mod aggregate;
pub mod chart;
pub mod compose;
pub mod document;
pub mod encode;
pub mod layout;
pub mod render;
pub mod service;

pub use aggregate::{aggregate, generate_statistics};
pub use chart::{ChartKind, ChartSpec};
pub use compose::{ComposerOptions, ReportComposer};
pub use document::{Document, RenderedChart, Section};
pub use encode::{DocumentEncoder, PdfEncoder};
pub use layout::PageLayout;
pub use render::{ChartRenderer, MockChartRenderer, SvgChartRenderer};
pub use service::ReportService;
