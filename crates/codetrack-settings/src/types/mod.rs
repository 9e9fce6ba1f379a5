//! Settings type definitions.
//!
//! Every section is `#[serde(rename_all = "camelCase", default)]` so a
//! partial `settings.json` fills the gaps from [`Default`].

mod report;
mod server;

pub use report::*;
pub use server::*;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

/// Root settings type.
///
/// ```json
/// {
///   "server": { "port": 5000 },
///   "auth": { "jwtSecret": "..." },
///   "report": { "pieMaxSlices": 8 }
/// }
/// ```
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CodetrackSettings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub auth: AuthSettings,
    pub report: ReportSettings,
    pub logging: LoggingSettings,
    pub metrics: MetricsSettings,
}

impl CodetrackSettings {
    /// Clamp out-of-range values back into bounds.
    ///
    /// Called during loading. Each correction is logged at warn level.
    pub fn validate(&mut self) {
        fn clamp_u32(val: &mut u32, min: u32, max: u32, name: &str) {
            if *val < min || *val > max {
                let clamped = (*val).clamp(min, max);
                tracing::warn!("{name} out of range ({val}), clamped to {clamped}");
                *val = clamped;
            }
        }

        fn clamp_f32(val: &mut f32, min: f32, max: f32, name: &str) {
            if !(*val >= min && *val <= max) {
                let clamped = if val.is_nan() { max } else { val.clamp(min, max) };
                tracing::warn!("{name} out of range ({val}), clamped to {clamped}");
                *val = clamped;
            }
        }

        let report = &mut self.report;
        clamp_u32(&mut report.chart_width, 100, 4000, "chart_width");
        clamp_u32(&mut report.chart_height, 100, 4000, "chart_height");
        clamp_f32(&mut report.image_fit_width, 50.0, 595.0, "image_fit_width");
        clamp_f32(&mut report.image_fit_height, 50.0, 741.0, "image_fit_height");
        if report.pie_max_slices < 2 || report.pie_max_slices > 50 {
            let clamped = report.pie_max_slices.clamp(2, 50);
            tracing::warn!(
                "pie_max_slices out of range ({}), clamped to {clamped}",
                report.pie_max_slices
            );
            report.pie_max_slices = clamped;
        }

        if self.server.request_timeout_secs == 0 {
            tracing::warn!("request_timeout_secs must be positive, using default");
            self.server.request_timeout_secs = ServerSettings::default().request_timeout_secs;
        }

        let level = self.logging.level.to_ascii_lowercase();
        if LOG_LEVELS.contains(&level.as_str()) {
            self.logging.level = level;
        } else {
            tracing::warn!(level = %self.logging.level, "unknown log level, using info");
            self.logging.level = "info".to_string();
        }
    }

    /// The secret used to sign and verify bearer tokens.
    ///
    /// Fails when no secret has been configured.
    pub fn jwt_secret(&self) -> Result<&str> {
        let secret = self.auth.jwt_secret.trim();
        if secret.is_empty() {
            return Err(SettingsError::InvalidValue(
                "auth.jwtSecret is empty; set it in settings.json or CODETRACK_JWT_SECRET".into(),
            ));
        }
        Ok(secret)
    }
}

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
