use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use codetrack_core::{UserId, UserProfile};

use crate::database::Database;
use crate::error::StoreError;
use crate::row_helpers::Columns;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRow {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub created_at: String,
}

impl UserRow {
    fn from_row(row: &rusqlite::Row<'_>) -> Result<Self, StoreError> {
        let cols = Columns::new(row, "users");
        Ok(Self {
            id: UserId::new(cols.get(0, "id")?),
            username: cols.get(1, "username")?,
            email: cols.get(2, "email")?,
            created_at: cols.get(3, "created_at")?,
        })
    }

    pub fn into_profile(self) -> UserProfile {
        UserProfile {
            id: self.id,
            username: self.username,
            email: self.email,
        }
    }
}

const SELECT_USER: &str = "SELECT id, username, email, created_at FROM users";

#[derive(Clone)]
pub struct UserRepo {
    db: Database,
}

impl UserRepo {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Insert a user. A duplicate email is a `Conflict`.
    #[instrument(skip(self))]
    pub fn create(&self, username: &str, email: &str) -> Result<UserRow, StoreError> {
        let username = username.trim();
        let email = email.trim();
        if username.is_empty() || email.is_empty() {
            return Err(StoreError::Invalid("username and email are required".into()));
        }

        self.db.with_conn(|conn| {
            let now = Utc::now().to_rfc3339();
            conn.execute(
                "INSERT INTO users (username, email, created_at) VALUES (?1, ?2, ?3)",
                rusqlite::params![username, email, now],
            )
            .map_err(|e| match StoreError::from(e) {
                StoreError::Conflict(_) => StoreError::Conflict(format!("email {email} already registered")),
                other => other,
            })?;

            Ok(UserRow {
                id: UserId::new(conn.last_insert_rowid()),
                username: username.to_string(),
                email: email.to_string(),
                created_at: now,
            })
        })
    }

    /// Get a user by ID.
    #[instrument(skip(self), fields(user_id = %id))]
    pub fn get(&self, id: UserId) -> Result<UserRow, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!("{SELECT_USER} WHERE id = ?1"))?;
            let mut rows = stmt.query([id.get()])?;
            let user = match rows.next()? {
                Some(row) => UserRow::from_row(row)?,
                None => return Err(StoreError::NotFound(format!("user {id}"))),
            };
            Ok(user)
        })
    }

    #[instrument(skip(self))]
    pub fn find_by_email(&self, email: &str) -> Result<Option<UserRow>, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!("{SELECT_USER} WHERE email = ?1"))?;
            let mut rows = stmt.query([email.trim()])?;
            let user = match rows.next()? {
                Some(row) => Some(UserRow::from_row(row)?),
                None => None,
            };
            Ok(user)
        })
    }

    #[instrument(skip(self))]
    pub fn list(&self) -> Result<Vec<UserRow>, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!("{SELECT_USER} ORDER BY id"))?;
            let mut rows = stmt.query([])?;
            let mut out = Vec::new();
            while let Some(row) = rows.next()? {
                out.push(UserRow::from_row(row)?);
            }
            Ok(out)
        })
    }
}
