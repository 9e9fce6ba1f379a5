//! JSON fixture import into the SQLite store.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{info, instrument, warn};

use codetrack_core::{ProblemMetadata, ProblemStatus};
use codetrack_store::{Database, NewProblem, ProblemRepo, UserRepo};
use codetrack_telemetry::metrics::{METADATA_LOOKUPS_TOTAL, PROBLEMS_IMPORTED_TOTAL};

use crate::codeforces::{parse_problem_link, MetadataFetcher};

#[derive(Debug, Deserialize)]
pub struct Fixture {
    #[serde(default)]
    pub users: Vec<FixtureUser>,
}

#[derive(Debug, Deserialize)]
pub struct FixtureUser {
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub problems: Vec<FixtureProblem>,
}

#[derive(Debug, Deserialize)]
pub struct FixtureProblem {
    pub link: String,
    pub status: ProblemStatus,
    #[serde(default)]
    pub deadline: Option<String>,
    #[serde(default)]
    pub metadata: Option<ProblemMetadata>,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub users_created: usize,
    pub users_reused: usize,
    pub problems: usize,
}

pub fn load_fixture(path: &Path) -> Result<Fixture> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("invalid fixture {}", path.display()))
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct LookupSummary {
    pub resolved: usize,
    pub unlisted: usize,
    pub failed: usize,
}

/// Fill in metadata for problems that carry none and link to a problemset
/// entry. Lookup failures leave the problem without metadata.
#[instrument(skip_all)]
pub async fn resolve_metadata(fetcher: &dyn MetadataFetcher, fixture: &mut Fixture) -> LookupSummary {
    let mut summary = LookupSummary::default();
    let pending = fixture
        .users
        .iter_mut()
        .flat_map(|u| u.problems.iter_mut())
        .filter(|p| p.metadata.is_none());

    for problem in pending {
        let Some(reference) = parse_problem_link(&problem.link) else {
            continue;
        };
        let outcome = match fetcher.fetch(&reference).await {
            Ok(Some(metadata)) => {
                problem.metadata = Some(metadata);
                summary.resolved += 1;
                "resolved"
            }
            Ok(None) => {
                warn!(link = %problem.link, "problem not listed, importing without metadata");
                summary.unlisted += 1;
                "unlisted"
            }
            Err(e) => {
                warn!(link = %problem.link, error = %format!("{e:#}"), "metadata lookup failed");
                summary.failed += 1;
                "failed"
            }
        };
        metrics::counter!(METADATA_LOOKUPS_TOTAL, "outcome" => outcome).increment(1);
    }

    info!(
        resolved = summary.resolved,
        unlisted = summary.unlisted,
        failed = summary.failed,
        "metadata lookup done"
    );
    summary
}

/// Users are matched by email, so importing the same file twice appends
/// problems to the existing accounts.
#[instrument(skip_all, fields(users = fixture.users.len()))]
pub fn import_fixture(db: &Database, fixture: Fixture) -> Result<ImportSummary> {
    let users = UserRepo::new(db.clone());
    let problems = ProblemRepo::new(db.clone());
    let mut summary = ImportSummary::default();

    for user in fixture.users {
        let row = match users.find_by_email(&user.email)? {
            Some(existing) => {
                summary.users_reused += 1;
                existing
            }
            None => {
                summary.users_created += 1;
                users
                    .create(&user.username, &user.email)
                    .with_context(|| format!("failed to create user {}", user.email))?
            }
        };

        for problem in user.problems {
            let link = problem.link.clone();
            let _ = problems
                .create(&NewProblem {
                    user_id: row.id,
                    link: problem.link,
                    status: problem.status,
                    deadline: problem.deadline,
                    metadata: problem.metadata,
                })
                .with_context(|| format!("failed to import {link} for {}", user.email))?;
            summary.problems += 1;
            metrics::counter!(PROBLEMS_IMPORTED_TOTAL).increment(1);
        }
    }

    info!(
        created = summary.users_created,
        reused = summary.users_reused,
        problems = summary.problems,
        "fixture imported"
    );
    Ok(summary)
}
