//! # codetrack
//!
//! Binary entry point: wires settings, telemetry, the SQLite store, the report
//! pipeline and the HTTP server.

#![deny(unsafe_code)]

mod cli;
mod codeforces;
mod import;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;

use codetrack_core::UserId;
use codetrack_report::{ComposerOptions, PageLayout, PdfEncoder, ReportComposer, ReportService, SvgChartRenderer};
use codetrack_server::{issue_token, AppState, JwtAuthenticator, ServerConfig};
use codetrack_settings::CodetrackSettings;
use codetrack_store::{Database, SqliteProblemSource};
use codetrack_telemetry::PrometheusHandle;

use crate::cli::{Cli, Command};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = cli.load_settings()?;
    let telemetry = codetrack_telemetry::init_telemetry(&cli::telemetry_config(&settings, cli.command.is_serve()))
        .context("failed to initialize telemetry")?;
    codetrack_settings::init_settings(settings.clone());

    let db_path = cli.database_path(&settings);

    match cli.command {
        Command::Serve { .. } => serve(&settings, &db_path, telemetry.metrics().cloned()).await,
        Command::Stats { user } => {
            let reports = report_service(&settings, open_db(&db_path)?);
            let stats = reports.statistics(UserId::new(user)).await?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
            Ok(())
        }
        Command::Report { user, out } => {
            let reports = report_service(&settings, open_db(&db_path)?);
            let bytes = reports.pdf_report(UserId::new(user)).await?;
            tokio::fs::write(&out, &bytes)
                .await
                .with_context(|| format!("failed to write {}", out.display()))?;
            tracing::info!(path = %out.display(), bytes = bytes.len(), "report written");
            Ok(())
        }
        Command::Token { user, ttl_secs } => {
            let ttl = Duration::from_secs(ttl_secs.unwrap_or(settings.auth.token_ttl_secs));
            let token = issue_token(settings.jwt_secret()?, UserId::new(user), ttl).context("failed to sign token")?;
            println!("{token}");
            Ok(())
        }
        Command::Import { file, offline } => {
            let db = open_db(&db_path)?;
            let mut fixture = import::load_fixture(&file)?;
            if !offline {
                let _ = import::resolve_metadata(&codeforces::CodeforcesClient::new(), &mut fixture).await;
            }
            let summary = tokio::task::spawn_blocking(move || import::import_fixture(&db, fixture))
                .await
                .context("import task panicked")??;
            println!(
                "imported {} problems ({} users created, {} reused)",
                summary.problems, summary.users_created, summary.users_reused
            );
            Ok(())
        }
    }
}

fn open_db(path: &Path) -> Result<Database> {
    Database::open(path).with_context(|| format!("failed to open database {}", path.display()))
}

/// The pipeline as configured by the `report` settings section.
fn report_service(settings: &CodetrackSettings, db: Database) -> ReportService {
    let report = &settings.report;
    let layout = PageLayout::A4;
    let options = ComposerOptions {
        title: report.title.clone(),
        fit_width: report.image_fit_width,
        fit_height: report.image_fit_height,
        pie_max_slices: report.pie_max_slices,
        layout,
    };
    let renderer = Arc::new(SvgChartRenderer::new(report.chart_width, report.chart_height));
    ReportService::new(
        Arc::new(SqliteProblemSource::new(db)),
        ReportComposer::new(renderer, options),
        Arc::new(PdfEncoder::new(layout)),
    )
}

async fn serve(settings: &CodetrackSettings, db_path: &Path, metrics: Option<PrometheusHandle>) -> Result<()> {
    let auth = JwtAuthenticator::new(settings.jwt_secret()?).context("failed to configure token validation")?;
    let reports = report_service(settings, open_db(db_path)?);
    let state = AppState::new(Arc::new(reports), Arc::new(auth), metrics);

    let config = ServerConfig::from(&settings.server);
    let server = codetrack_server::start(&config, state)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr()))?;
    tracing::info!(addr = %server.addr, db = %db_path.display(), "codetrack ready");

    tokio::signal::ctrl_c().await.context("failed to listen for ctrl-c")?;
    tracing::info!("shutting down");
    server.shutdown().await;
    Ok(())
}
