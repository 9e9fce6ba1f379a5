use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use codetrack_core::{ProblemId, ProblemMetadata, ProblemRecord, ProblemStatus, UserId};

use crate::database::Database;
use crate::error::StoreError;
use crate::row_helpers::Columns;

/// Input for [`ProblemRepo::create`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProblem {
    pub user_id: UserId,
    pub link: String,
    pub status: ProblemStatus,
    pub deadline: Option<String>,
    pub metadata: Option<ProblemMetadata>,
}

impl NewProblem {
    fn validate(&self) -> Result<(), StoreError> {
        if self.link.trim().is_empty() {
            return Err(StoreError::Invalid("problem link is required".into()));
        }
        if self.status == ProblemStatus::Started && self.deadline.is_none() {
            return Err(StoreError::Invalid("deadline is required for started problems".into()));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProblemRow {
    pub id: ProblemId,
    pub user_id: UserId,
    pub link: String,
    pub status: ProblemStatus,
    pub start_time: Option<String>,
    pub deadline: Option<String>,
    pub metadata: Option<ProblemMetadata>,
    pub created_at: String,
    pub updated_at: String,
}

impl ProblemRow {
    fn from_row(row: &rusqlite::Row<'_>) -> Result<Self, StoreError> {
        let cols = Columns::new(row, "problems");
        Ok(Self {
            id: ProblemId::new(cols.get(0, "id")?),
            user_id: UserId::new(cols.get(1, "user_id")?),
            link: cols.get(2, "link")?,
            status: cols.parsed(3, "status")?,
            start_time: cols.get(4, "start_time")?,
            deadline: cols.get(5, "deadline")?,
            metadata: cols.json(6, "metadata")?,
            created_at: cols.get(7, "created_at")?,
            updated_at: cols.get(8, "updated_at")?,
        })
    }

    pub fn into_record(self) -> ProblemRecord {
        ProblemRecord {
            id: self.id,
            status: self.status,
            metadata: self.metadata,
        }
    }
}

const SELECT_PROBLEM: &str = "SELECT id, user_id, link, status, start_time, deadline, metadata, \
                              created_at, updated_at FROM problems";

#[derive(Clone)]
pub struct ProblemRepo {
    db: Database,
}

impl ProblemRepo {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Insert a problem for an existing user.
    ///
    /// A `started` problem gets its start time stamped on insert.
    #[instrument(skip(self, new), fields(user_id = %new.user_id, status = %new.status))]
    pub fn create(&self, new: &NewProblem) -> Result<ProblemRow, StoreError> {
        new.validate()?;
        let metadata = new.metadata.as_ref().map(serde_json::to_string).transpose()?;

        self.db.with_conn(|conn| {
            let exists: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM users WHERE id = ?1)",
                [new.user_id.get()],
                |row| row.get(0),
            )?;
            if !exists {
                return Err(StoreError::NotFound(format!("user {}", new.user_id)));
            }

            let now = Utc::now().to_rfc3339();
            let start_time = (new.status == ProblemStatus::Started).then(|| now.clone());
            conn.execute(
                "INSERT INTO problems (user_id, link, status, start_time, deadline, metadata, \
                 created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
                rusqlite::params![
                    new.user_id.get(),
                    new.link.trim(),
                    new.status.as_str(),
                    start_time,
                    new.deadline,
                    metadata,
                    now,
                ],
            )?;

            Ok(ProblemRow {
                id: ProblemId::new(conn.last_insert_rowid()),
                user_id: new.user_id,
                link: new.link.trim().to_string(),
                status: new.status,
                start_time,
                deadline: new.deadline.clone(),
                metadata: new.metadata.clone(),
                created_at: now.clone(),
                updated_at: now,
            })
        })
    }

    #[instrument(skip(self), fields(problem_id = %id))]
    pub fn get(&self, id: ProblemId) -> Result<ProblemRow, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!("{SELECT_PROBLEM} WHERE id = ?1"))?;
            let mut rows = stmt.query([id.get()])?;
            let problem = match rows.next()? {
                Some(row) => ProblemRow::from_row(row)?,
                None => return Err(StoreError::NotFound(format!("problem {id}"))),
            };
            Ok(problem)
        })
    }

    /// All problems owned by a user, oldest first.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub fn list_for_user(&self, user_id: UserId) -> Result<Vec<ProblemRow>, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!("{SELECT_PROBLEM} WHERE user_id = ?1 ORDER BY id"))?;
            let mut rows = stmt.query([user_id.get()])?;
            let mut out = Vec::new();
            while let Some(row) = rows.next()? {
                out.push(ProblemRow::from_row(row)?);
            }
            Ok(out)
        })
    }

    /// Move a problem to a new status. Entering `started` stamps the start
    /// time once; later transitions keep it.
    #[instrument(skip(self), fields(problem_id = %id, status = %status))]
    pub fn update_status(&self, id: ProblemId, status: ProblemStatus) -> Result<ProblemRow, StoreError> {
        let now = Utc::now().to_rfc3339();
        let changed = self.db.with_conn(|conn| {
            Ok(conn.execute(
                "UPDATE problems SET status = ?1, updated_at = ?2, \
                 start_time = CASE WHEN ?1 = 'started' AND start_time IS NULL THEN ?2 ELSE start_time END \
                 WHERE id = ?3",
                rusqlite::params![status.as_str(), now, id.get()],
            )?)
        })?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("problem {id}")));
        }
        self.get(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::UserRepo;
    use assert_matches::assert_matches;

    fn setup() -> (ProblemRepo, UserId) {
        let db = Database::in_memory().unwrap();
        let user = UserRepo::new(db.clone()).create("ada", "ada@example.com").unwrap();
        (ProblemRepo::new(db), user.id)
    }

    fn new_problem(user_id: UserId, status: ProblemStatus) -> NewProblem {
        NewProblem {
            user_id,
            link: "https://codeforces.com/problemset/problem/1/A".into(),
            status,
            deadline: None,
            metadata: Some(ProblemMetadata::default().with_rating("1500").with_tags(["dp", "math"])),
        }
    }

    #[test]
    fn create_and_list_round_trip_metadata() {
        let (repo, user) = setup();
        let created = repo.create(&new_problem(user, ProblemStatus::Done)).unwrap();
        let listed = repo.list_for_user(user).unwrap();
        assert_eq!(listed, vec![created]);
        assert_eq!(listed[0].metadata.as_ref().unwrap().tags, vec!["dp", "math"]);
    }

    #[test]
    fn started_requires_deadline() {
        let (repo, user) = setup();
        let result = repo.create(&new_problem(user, ProblemStatus::Started));
        assert_matches!(result, Err(StoreError::Invalid(msg)) if msg.contains("deadline"));
    }

    #[test]
    fn started_with_deadline_stamps_start_time() {
        let (repo, user) = setup();
        let mut new = new_problem(user, ProblemStatus::Started);
        new.deadline = Some("2026-12-01T00:00:00Z".into());
        let row = repo.create(&new).unwrap();
        assert!(row.start_time.is_some());
    }

    #[test]
    fn empty_link_is_invalid() {
        let (repo, user) = setup();
        let mut new = new_problem(user, ProblemStatus::Pending);
        new.link = "   ".into();
        assert_matches!(repo.create(&new), Err(StoreError::Invalid(_)));
    }

    #[test]
    fn unknown_user_is_not_found() {
        let (repo, _) = setup();
        let result = repo.create(&new_problem(UserId::new(404), ProblemStatus::Pending));
        assert_matches!(result, Err(StoreError::NotFound(msg)) if msg == "user 404");
    }

    #[test]
    fn update_status_keeps_first_start_time() {
        let (repo, user) = setup();
        let row = repo.create(&new_problem(user, ProblemStatus::Pending)).unwrap();
        assert!(row.start_time.is_none());

        let started = repo.update_status(row.id, ProblemStatus::Started).unwrap();
        let first_start = started.start_time.clone();
        assert!(first_start.is_some());

        let done = repo.update_status(row.id, ProblemStatus::Done).unwrap();
        assert_eq!(done.status, ProblemStatus::Done);
        assert_eq!(done.start_time, first_start);
    }

    #[test]
    fn update_missing_problem_is_not_found() {
        let (repo, _) = setup();
        assert_matches!(
            repo.update_status(ProblemId::new(77), ProblemStatus::Done),
            Err(StoreError::NotFound(_))
        );
    }

    #[test]
    fn corrupt_metadata_is_reported() {
        let (repo, user) = setup();
        let row = repo.create(&new_problem(user, ProblemStatus::Pending)).unwrap();
        repo.db
            .with_conn(|conn| {
                conn.execute("UPDATE problems SET metadata = '{oops' WHERE id = ?1", [row.id.get()])?;
                Ok(())
            })
            .unwrap();
        assert_matches!(
            repo.get(row.id),
            Err(StoreError::CorruptRow { table: "problems", column: "metadata", .. })
        );
    }

    #[test]
    fn into_record_carries_status_and_metadata() {
        let (repo, user) = setup();
        let record = repo.create(&new_problem(user, ProblemStatus::Done)).unwrap().into_record();
        assert_eq!(record.status, ProblemStatus::Done);
        assert_eq!(record.rating(), Some("1500"));
    }
}
