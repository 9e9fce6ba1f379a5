//! Chart data shaping.
//!
//! Builders here turn statistics into [`ChartSpec`]s. Ordering and
//! collapsing happen at this layer so every renderer draws the same data.

use std::cmp::Reverse;

use serde::{Deserialize, Serialize};

use codetrack_core::{Distribution, Summary};

pub const STATUS_CHART_TITLE: &str = "Problem Status Distribution";
pub const RATING_CHART_TITLE: &str = "Problems by Difficulty Rating";
pub const TAG_CHART_TITLE: &str = "Problems by Topic/Tag";

/// Label for the remainder slice of a collapsed pie.
pub const OTHERS_LABEL: &str = "Others";

/// Default category cap for pie charts.
pub const DEFAULT_PIE_MAX_SLICES: usize = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Pie,
    Bar,
}

impl ChartKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pie => "pie",
            Self::Bar => "bar",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxisLabels {
    pub x: String,
    pub y: String,
}

/// What to draw. `labels` and `values` are parallel and already ordered.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartSpec {
    pub kind: ChartKind,
    pub title: String,
    pub labels: Vec<String>,
    pub values: Vec<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub axis: Option<AxisLabels>,
}

impl ChartSpec {
    pub fn pie(title: impl Into<String>, entries: Vec<(String, u64)>) -> Self {
        let (labels, values) = entries.into_iter().unzip();
        Self {
            kind: ChartKind::Pie,
            title: title.into(),
            labels,
            values,
            axis: None,
        }
    }

    pub fn bar(title: impl Into<String>, entries: Vec<(String, u64)>, axis: AxisLabels) -> Self {
        let (labels, values) = entries.into_iter().unzip();
        Self {
            kind: ChartKind::Bar,
            title: title.into(),
            labels,
            values,
            axis: Some(axis),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn total(&self) -> u64 {
        self.values.iter().sum()
    }
}

/// Solved, In Progress, Pending, in that order. `None` when every count is zero.
///
/// Always three slices; the pie cap applies to open-ended categories only.
pub fn status_chart(summary: &Summary) -> Option<ChartSpec> {
    if !summary.has_any_status() {
        return None;
    }
    let entries = vec![
        ("Solved".to_string(), summary.solved_problems),
        ("In Progress".to_string(), summary.started_problems),
        ("Pending".to_string(), summary.pending_problems),
    ];
    Some(ChartSpec::pie(STATUS_CHART_TITLE, entries))
}

/// Bar chart over rating labels sorted by their leading integer.
pub fn rating_chart(ratings: &Distribution) -> Option<ChartSpec> {
    if ratings.is_empty() {
        return None;
    }
    Some(ChartSpec::bar(
        RATING_CHART_TITLE,
        sort_by_rating(ratings),
        AxisLabels {
            x: "Problem Rating".into(),
            y: "Number of Problems".into(),
        },
    ))
}

/// Pie over tags, ranked by count and collapsed past `max_slices`.
pub fn tag_chart(tags: &Distribution, max_slices: usize) -> Option<ChartSpec> {
    if tags.is_empty() {
        return None;
    }
    Some(ChartSpec::pie(TAG_CHART_TITLE, collapse_top(ranked(tags), max_slices)))
}

/// Entries by count descending. Ties keep encounter order.
pub fn ranked(distribution: &Distribution) -> Vec<(String, u64)> {
    let mut entries: Vec<(String, u64)> = distribution
        .iter()
        .map(|(label, count)| (label.clone(), *count))
        .collect();
    entries.sort_by_key(|(_, count)| Reverse(*count));
    entries
}

/// Entries ordered by the leading integer of their label, ascending.
///
/// Labels with no leading integer sort after every numeric one, in
/// encounter order.
pub fn sort_by_rating(distribution: &Distribution) -> Vec<(String, u64)> {
    let mut entries: Vec<(Option<i64>, String, u64)> = distribution
        .iter()
        .map(|(label, count)| (leading_int(label), label.clone(), *count))
        .collect();
    entries.sort_by_key(|(parsed, _, _)| (parsed.is_none(), parsed.unwrap_or_default()));
    entries.into_iter().map(|(_, label, count)| (label, count)).collect()
}

/// Keep the `max_slices - 1` largest entries and fold the rest into
/// [`OTHERS_LABEL`].
///
/// A no-op when the input already fits. Assumes `entries` is ranked when
/// the caller wants "largest" to mean anything.
pub fn collapse_top(mut entries: Vec<(String, u64)>, max_slices: usize) -> Vec<(String, u64)> {
    let max_slices = max_slices.max(2);
    if entries.len() <= max_slices {
        return entries;
    }
    let rest: u64 = entries.drain(max_slices - 1..).map(|(_, count)| count).sum();
    entries.push((OTHERS_LABEL.to_string(), rest));
    entries
}

/// Leading-integer parse in the manner of `parseInt` without a radix:
/// optional whitespace, optional sign, then decimal digits, or hex digits
/// after a `0x`/`0X` prefix. Anything after the digits is ignored.
/// Saturates instead of overflowing.
pub fn leading_int(label: &str) -> Option<i64> {
    let s = label.trim_start();
    let (negative, unsigned) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let (radix, digits) = match unsigned.get(..2) {
        Some("0x" | "0X") => (16, &unsigned[2..]),
        _ => (10, unsigned),
    };

    let mut value: i64 = 0;
    let mut seen = false;
    for digit in digits.chars().map_while(|c| c.to_digit(radix)) {
        seen = true;
        value = value.saturating_mul(i64::from(radix)).saturating_add(i64::from(digit));
    }
    if !seen {
        return None;
    }
    Some(if negative { -value } else { value })
}
