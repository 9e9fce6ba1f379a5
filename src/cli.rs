//! Command-line surface and settings resolution.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::Level;

use codetrack_settings::CodetrackSettings;
use codetrack_telemetry::{parse_level, TelemetryConfig};

/// Problem tracking statistics and PDF reports.
#[derive(Parser, Debug)]
#[command(name = "codetrack", version, about = "Problem tracking statistics and PDF reports")]
pub struct Cli {
    /// Settings file (defaults to `~/.codetrack/settings.json`).
    #[arg(long, global = true)]
    pub settings: Option<PathBuf>,

    /// SQLite database path, overriding `database.path`.
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Start the HTTP server.
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
    },
    /// Print a user's statistics as JSON.
    Stats {
        #[arg(long)]
        user: i64,
    },
    /// Write a user's PDF report.
    Report {
        #[arg(long)]
        user: i64,
        #[arg(long)]
        out: PathBuf,
    },
    /// Mint a bearer token signed with `auth.jwtSecret`.
    Token {
        #[arg(long)]
        user: i64,
        #[arg(long)]
        ttl_secs: Option<u64>,
    },
    /// Load users and problems from a JSON fixture.
    Import {
        file: PathBuf,
        /// Skip the Codeforces lookup for problems without metadata.
        #[arg(long)]
        offline: bool,
    },
}

impl Command {
    pub fn is_serve(&self) -> bool {
        matches!(self, Self::Serve { .. })
    }
}

impl Cli {
    fn settings_file(&self) -> PathBuf {
        self.settings.clone().unwrap_or_else(codetrack_settings::settings_path)
    }

    /// Layered settings with the command-line overrides applied last.
    pub fn load_settings(&self) -> Result<CodetrackSettings> {
        let path = self.settings_file();
        let mut settings = codetrack_settings::load_settings_from_path(&path)
            .with_context(|| format!("failed to load settings from {}", path.display()))?;

        if let Command::Serve { host, port } = &self.command {
            if let Some(host) = host {
                settings.server.host.clone_from(host);
            }
            if let Some(port) = port {
                settings.server.port = *port;
            }
        }
        Ok(settings)
    }

    /// `--db` wins; otherwise `database.path` relative to the settings file.
    pub fn database_path(&self, settings: &CodetrackSettings) -> PathBuf {
        if let Some(db) = &self.db {
            return db.clone();
        }
        let file = self.settings_file();
        let base = file.parent().map_or_else(codetrack_settings::settings_dir, Path::to_path_buf);
        settings.database.resolve(&base)
    }
}

/// Telemetry derived from `logging` and `metrics`. One-shot commands never
/// install the Prometheus recorder.
pub fn telemetry_config(settings: &CodetrackSettings, serving: bool) -> TelemetryConfig {
    let log_level = parse_level(&settings.logging.level).unwrap_or_else(|| {
        eprintln!("unknown log level {:?}, using info", settings.logging.level);
        Level::INFO
    });
    let module_levels = settings
        .logging
        .module_levels
        .iter()
        .filter_map(|(module, level)| parse_level(level).map(|l| (module.clone(), l)))
        .collect();

    TelemetryConfig {
        log_level,
        module_levels,
        json: settings.logging.json,
        metrics_enabled: serving && settings.metrics.enabled,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("codetrack").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn parses_report_command() {
        let cli = parse(&["report", "--user", "7", "--out", "r.pdf"]);
        assert_eq!(
            cli.command,
            Command::Report {
                user: 7,
                out: PathBuf::from("r.pdf")
            }
        );
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = parse(&["stats", "--user", "3", "--db", "/tmp/x.db"]);
        assert_eq!(cli.db, Some(PathBuf::from("/tmp/x.db")));
        assert_eq!(cli.command, Command::Stats { user: 3 });
    }

    #[test]
    fn token_ttl_is_optional() {
        let cli = parse(&["token", "--user", "1"]);
        assert_eq!(cli.command, Command::Token { user: 1, ttl_secs: None });
    }

    #[test]
    fn import_looks_up_metadata_by_default() {
        let cli = parse(&["import", "fixture.json"]);
        assert_eq!(
            cli.command,
            Command::Import {
                file: PathBuf::from("fixture.json"),
                offline: false
            }
        );
        let cli = parse(&["import", "fixture.json", "--offline"]);
        assert_matches::assert_matches!(cli.command, Command::Import { offline: true, .. });
    }

    #[test]
    fn missing_user_is_rejected() {
        assert!(Cli::try_parse_from(["codetrack", "stats"]).is_err());
    }

    #[test]
    fn serve_flags_override_settings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"server": {"port": 8080}}"#).unwrap();
        let path_arg = path.to_string_lossy().into_owned();

        let cli = parse(&["--settings", &path_arg, "serve", "--host", "0.0.0.0"]);
        let settings = cli.load_settings().unwrap();
        assert_eq!(settings.server.host, "0.0.0.0");
        assert_eq!(settings.server.port, 8080);
        assert!(cli.command.is_serve());
    }

    #[test]
    fn database_path_resolves_next_to_settings_file() {
        let cli = parse(&["--settings", "/srv/codetrack/settings.json", "stats", "--user", "1"]);
        let path = cli.database_path(&CodetrackSettings::default());
        assert_eq!(path, PathBuf::from("/srv/codetrack/database/codetrack.db"));
    }

    #[test]
    fn db_flag_wins() {
        let cli = parse(&["--db", "/tmp/other.db", "stats", "--user", "1"]);
        assert_eq!(cli.database_path(&CodetrackSettings::default()), PathBuf::from("/tmp/other.db"));
    }

    #[test]
    fn one_shot_commands_skip_metrics() {
        let settings = CodetrackSettings::default();
        assert!(!telemetry_config(&settings, false).metrics_enabled);
        assert!(telemetry_config(&settings, true).metrics_enabled);
    }

    #[test]
    fn module_levels_carry_over() {
        let mut settings = CodetrackSettings::default();
        settings.logging.level = "warn".into();
        settings
            .logging
            .module_levels
            .insert("codetrack_store".into(), "debug".into());
        settings.logging.module_levels.insert("noisy".into(), "bogus".into());

        let config = telemetry_config(&settings, false);
        assert_eq!(config.log_level, Level::WARN);
        assert_eq!(config.module_levels, vec![("codetrack_store".to_string(), Level::DEBUG)]);
    }
}
