//! [`ProblemSource`] backed by the SQLite repositories.

use async_trait::async_trait;

use codetrack_core::{ProblemRecord, ProblemSource, ReportError, UserId, UserProfile};

use crate::database::Database;
use crate::error::StoreError;
use crate::problems::ProblemRepo;
use crate::users::UserRepo;

/// Runs repository calls on the blocking pool so the connection mutex is
/// never held on a runtime worker.
#[derive(Clone)]
pub struct SqliteProblemSource {
    users: UserRepo,
    problems: ProblemRepo,
}

impl SqliteProblemSource {
    pub fn new(db: Database) -> Self {
        Self {
            users: UserRepo::new(db.clone()),
            problems: ProblemRepo::new(db),
        }
    }
}

async fn blocking<T, F>(f: F) -> Result<T, ReportError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, StoreError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ReportError::Upstream(format!("store task failed: {e}")))?
        .map_err(ReportError::from)
}

#[async_trait]
impl ProblemSource for SqliteProblemSource {
    async fn find_user_by_id(&self, id: UserId) -> Result<UserProfile, ReportError> {
        let users = self.users.clone();
        let row = blocking(move || users.get(id)).await?;
        Ok(row.into_profile())
    }

    async fn find_problems_by_user(&self, id: UserId) -> Result<Vec<ProblemRecord>, ReportError> {
        let problems = self.problems.clone();
        let rows = blocking(move || problems.list_for_user(id)).await?;
        Ok(rows.into_iter().map(crate::problems::ProblemRow::into_record).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problems::NewProblem;
    use assert_matches::assert_matches;
    use codetrack_core::{ProblemMetadata, ProblemStatus};

    #[tokio::test]
    async fn resolves_user_and_problems() {
        let db = Database::in_memory().unwrap();
        let user = UserRepo::new(db.clone()).create("ada", "ada@example.com").unwrap();
        let repo = ProblemRepo::new(db.clone());
        for status in [ProblemStatus::Done, ProblemStatus::Pending] {
            repo.create(&NewProblem {
                user_id: user.id,
                link: "https://leetcode.com/problems/two-sum".into(),
                status,
                deadline: None,
                metadata: Some(ProblemMetadata::default().with_rating("1500")),
            })
            .unwrap();
        }

        let source = SqliteProblemSource::new(db);
        let profile = source.find_user_by_id(user.id).await.unwrap();
        assert_eq!(profile.username, "ada");

        let records = source.find_problems_by_user(user.id).await.unwrap();
        let statuses: Vec<ProblemStatus> = records.iter().map(|r| r.status).collect();
        assert_eq!(statuses, vec![ProblemStatus::Done, ProblemStatus::Pending]);
    }

    #[tokio::test]
    async fn unknown_user_maps_to_not_found() {
        let source = SqliteProblemSource::new(Database::in_memory().unwrap());
        assert_matches!(
            source.find_user_by_id(UserId::new(5)).await,
            Err(ReportError::NotFound(msg)) if msg == "user 5"
        );
    }

    #[tokio::test]
    async fn corrupt_rows_map_to_upstream() {
        let db = Database::in_memory().unwrap();
        let user = UserRepo::new(db.clone()).create("ada", "ada@example.com").unwrap();
        db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO problems (user_id, link, status, metadata, created_at, updated_at) \
                 VALUES (?1, 'x', 'done', 'not json', 'now', 'now')",
                [user.id.get()],
            )?;
            Ok(())
        })
        .unwrap();

        let source = SqliteProblemSource::new(db);
        assert_matches!(
            source.find_problems_by_user(user.id).await,
            Err(ReportError::Upstream(_))
        );
    }
}
