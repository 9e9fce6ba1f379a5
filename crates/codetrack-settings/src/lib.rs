//! # codetrack-settings
//!
//! Layered configuration for the codetrack service.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`CodetrackSettings::default()`]
//! 2. **User file**: `~/.codetrack/settings.json` (deep-merged over defaults)
//! 3. **Environment variables**: `CODETRACK_*` overrides (highest priority)
//!
//! The global snapshot is reloadable: [`reload_settings_from_path`] swaps
//! the cached value so later [`get_settings`] calls see the new file.
//!
//! ```no_run
//! use codetrack_settings::get_settings;
//!
//! let settings = get_settings();
//! println!("listening on {}:{}", settings.server.host, settings.server.port);
//! ```

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{load_settings, load_settings_from_path, merge_json, settings_dir, settings_path};
pub use types::*;

use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;

static SETTINGS: RwLock<Option<Arc<CodetrackSettings>>> = parking_lot::const_rwlock(None);

/// Get the global settings snapshot.
///
/// The first call loads `~/.codetrack/settings.json` with env overrides and
/// falls back to compiled defaults if loading fails.
pub fn get_settings() -> Arc<CodetrackSettings> {
    if let Some(s) = SETTINGS.read().as_ref() {
        return Arc::clone(s);
    }

    let mut guard = SETTINGS.write();
    if let Some(s) = guard.as_ref() {
        return Arc::clone(s);
    }

    let settings = Arc::new(match load_settings() {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!(error = %e, "failed to load settings, using defaults");
            CodetrackSettings::default()
        }
    });
    *guard = Some(Arc::clone(&settings));
    settings
}

/// Replace the global settings with a specific value.
pub fn init_settings(settings: CodetrackSettings) {
    *SETTINGS.write() = Some(Arc::new(settings));
}

/// Reload settings from a file and swap the global snapshot.
///
/// Unlike [`get_settings`], a broken file is reported to the caller and the
/// previous snapshot stays in place.
pub fn reload_settings_from_path(path: &Path) -> Result<Arc<CodetrackSettings>> {
    let new = Arc::new(load_settings_from_path(path)?);
    *SETTINGS.write() = Some(Arc::clone(&new));
    tracing::info!(?path, "settings reloaded from disk");
    Ok(new)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
