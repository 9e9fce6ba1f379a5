//! Persistence seam for the statistics path, plus an in-memory implementation.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::errors::{ReportError, Result};
use crate::ids::UserId;
use crate::problem::{ProblemRecord, UserProfile};

/// Read access to users and their problems.
#[async_trait]
pub trait ProblemSource: Send + Sync {
    /// Resolve a user, failing with [`ReportError::NotFound`] when unknown.
    async fn find_user_by_id(&self, id: UserId) -> Result<UserProfile>;

    /// All problems owned by the user, in storage order.
    async fn find_problems_by_user(&self, id: UserId) -> Result<Vec<ProblemRecord>>;
}

/// In-memory [`ProblemSource`] for tests and fixtures.
///
/// A configured failure is returned by every call until cleared.
#[derive(Default)]
pub struct MemorySource {
    users: RwLock<HashMap<UserId, UserProfile>>,
    problems: RwLock<HashMap<UserId, Vec<ProblemRecord>>>,
    failure: RwLock<Option<ReportError>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_user(&self, user: UserProfile) {
        let _ = self.users.write().insert(user.id, user);
    }

    pub fn push_problem(&self, user: UserId, record: ProblemRecord) {
        self.problems.write().entry(user).or_default().push(record);
    }

    pub fn set_failure(&self, failure: Option<ReportError>) {
        *self.failure.write() = failure;
    }

    fn check_failure(&self) -> Result<()> {
        match self.failure.read().as_ref() {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ProblemSource for MemorySource {
    async fn find_user_by_id(&self, id: UserId) -> Result<UserProfile> {
        self.check_failure()?;
        self.users
            .read()
            .get(&id)
            .cloned()
            .ok_or_else(|| ReportError::NotFound(format!("user {id}")))
    }

    async fn find_problems_by_user(&self, id: UserId) -> Result<Vec<ProblemRecord>> {
        self.check_failure()?;
        Ok(self.problems.read().get(&id).cloned().unwrap_or_default())
    }
}
