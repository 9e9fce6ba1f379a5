//! Reading `settings.json` and layering it between the compiled defaults and
//! `CODETRACK_*` environment overrides.

use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::errors::{Result, SettingsError};
use crate::types::CodetrackSettings;

/// `~/.codetrack`, or `/tmp/.codetrack` when `HOME` is unset.
pub fn settings_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map_or_else(|| PathBuf::from("/tmp"), PathBuf::from)
        .join(".codetrack")
}

pub fn settings_path() -> PathBuf {
    settings_dir().join("settings.json")
}

pub fn load_settings() -> Result<CodetrackSettings> {
    load_settings_from_path(&settings_path())
}

/// Defaults, then the file at `path` if present, then the environment.
/// Out-of-range values are clamped last.
pub fn load_settings_from_path(path: &Path) -> Result<CodetrackSettings> {
    let mut document = serde_json::to_value(CodetrackSettings::default())?;

    match std::fs::read_to_string(path) {
        Ok(raw) => {
            let overlay: Value = serde_json::from_str(&raw).map_err(|source| SettingsError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
            debug!(path = %path.display(), "merging settings file over defaults");
            merge_json(&mut document, overlay);
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no settings file, using defaults");
        }
        Err(source) => {
            return Err(SettingsError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    }

    let mut settings: CodetrackSettings = serde_json::from_value(document)?;
    apply_env_overrides(&mut settings, |name| std::env::var(name).ok());
    settings.validate();
    Ok(settings)
}

/// Overlay `patch` onto `base` in place.
///
/// Objects merge key by key, anything else replaces. A `null` in the patch
/// leaves the base value untouched.
pub fn merge_json(base: &mut Value, patch: Value) {
    match (base, patch) {
        (_, Value::Null) => {}
        (Value::Object(base_map), Value::Object(patch_map)) => merge_objects(base_map, patch_map),
        (slot, replacement) => *slot = replacement,
    }
}

fn merge_objects(base: &mut Map<String, Value>, patch: Map<String, Value>) {
    for (key, value) in patch {
        match base.get_mut(&key) {
            Some(existing) => merge_json(existing, value),
            None if value.is_null() => {}
            None => {
                let _ = base.insert(key, value);
            }
        }
    }
}

/// Apply `CODETRACK_*` overrides read through `lookup`. Values that fail to
/// parse or fall outside their range are ignored with a warning.
pub fn apply_env_overrides<F>(settings: &mut CodetrackSettings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let env = EnvReader { lookup };

    if let Some(host) = env.text("CODETRACK_HOST") {
        settings.server.host = host;
    }
    if let Some(port) = env.number("CODETRACK_PORT", 1..=u16::MAX) {
        settings.server.port = port;
    }
    if let Some(secs) = env.number("CODETRACK_REQUEST_TIMEOUT_SECS", 1..=3600) {
        settings.server.request_timeout_secs = secs;
    }
    if let Some(path) = env.text("CODETRACK_DB_PATH") {
        settings.database.path = path;
    }
    if let Some(secret) = env.text("CODETRACK_JWT_SECRET").or_else(|| env.text("JWT_SECRET")) {
        settings.auth.jwt_secret = secret;
    }
    if let Some(level) = env.text("CODETRACK_LOG_LEVEL") {
        settings.logging.level = level;
    }
    if let Some(json) = env.flag("CODETRACK_LOG_JSON") {
        settings.logging.json = json;
    }
    if let Some(enabled) = env.flag("CODETRACK_METRICS_ENABLED") {
        settings.metrics.enabled = enabled;
    }
}

/// `true`/`1`/`yes`/`on` and their negatives, case-insensitive.
pub fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

pub fn parse_in_range<T>(raw: &str, range: RangeInclusive<T>) -> Option<T>
where
    T: FromStr + PartialOrd,
{
    raw.trim().parse().ok().filter(|n| range.contains(n))
}

struct EnvReader<F> {
    lookup: F,
}

impl<F: Fn(&str) -> Option<String>> EnvReader<F> {
    fn text(&self, name: &str) -> Option<String> {
        (self.lookup)(name).filter(|v| !v.is_empty())
    }

    fn flag(&self, name: &str) -> Option<bool> {
        let raw = self.text(name)?;
        let parsed = parse_flag(&raw);
        if parsed.is_none() {
            warn!(var = name, value = %raw, "ignoring non-boolean env override");
        }
        parsed
    }

    fn number<T>(&self, name: &str, range: RangeInclusive<T>) -> Option<T>
    where
        T: FromStr + PartialOrd,
    {
        let raw = self.text(name)?;
        let parsed = parse_in_range(&raw, range);
        if parsed.is_none() {
            warn!(var = name, value = %raw, "ignoring out-of-range env override");
        }
        parsed
    }
}
