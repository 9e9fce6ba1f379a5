//! Reduces a user's problem records into [`Statistics`].

use tracing::instrument;

use codetrack_core::{
    Distributions, ProblemRecord, ProblemSource, ProblemStatus, Result, Statistics, Summary,
    UserId, UserProfile,
};

/// Pure reduction of records into counts and distributions.
///
/// Records without metadata still count toward the status totals. Each tag
/// on a record bumps its own bucket, so tag counts may exceed the total.
pub fn aggregate(user: UserProfile, problems: &[ProblemRecord]) -> Statistics {
    let mut summary = Summary {
        total_problems: problems.len() as u64,
        ..Summary::default()
    };
    let mut distributions = Distributions::default();

    for problem in problems {
        match problem.status {
            ProblemStatus::Done => summary.solved_problems += 1,
            ProblemStatus::Started => summary.started_problems += 1,
            ProblemStatus::Pending => summary.pending_problems += 1,
        }
        if let Some(rating) = problem.rating() {
            distributions.record_rating(rating);
        }
        for tag in problem.tags() {
            distributions.record_tag(tag);
        }
    }

    summary.completion_rate = completion_rate(summary.solved_problems, summary.total_problems);

    Statistics {
        user,
        summary,
        distributions,
    }
}

/// `solved / total * 100` rounded to two decimals, `0` for an empty set.
pub fn completion_rate(solved: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let rate = solved as f64 / total as f64 * 100.0;
    (rate * 100.0).round() / 100.0
}

/// Fetch the user and their problems, then aggregate.
///
/// An unknown user surfaces as `NotFound` before any problem query runs.
#[instrument(skip(source), fields(user_id = %user_id))]
pub async fn generate_statistics<S>(source: &S, user_id: UserId) -> Result<Statistics>
where
    S: ProblemSource + ?Sized,
{
    let user = source.find_user_by_id(user_id).await?;
    let problems = source.find_problems_by_user(user_id).await?;
    let stats = aggregate(user, &problems);
    tracing::debug!(
        total = stats.summary.total_problems,
        ratings = stats.distributions.ratings.len(),
        tags = stats.distributions.tags.len(),
        "statistics aggregated"
    );
    Ok(stats)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
