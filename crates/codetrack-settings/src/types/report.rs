use serde::{Deserialize, Serialize};

/// Report rendering settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReportSettings {
    /// Title heading on the first page.
    pub title: String,
    /// Intrinsic chart size in pixels.
    pub chart_width: u32,
    pub chart_height: u32,
    /// Box each chart image is scaled into, in points.
    pub image_fit_width: f32,
    pub image_fit_height: f32,
    /// Pie charts with more categories than this collapse the tail into "Others".
    pub pie_max_slices: usize,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            title: "Problem Solving Statistics Report".to_string(),
            chart_width: 600,
            chart_height: 400,
            image_fit_width: 500.0,
            image_fit_height: 300.0,
            pie_max_slices: 10,
        }
    }
}
