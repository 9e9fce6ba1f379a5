use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use rusqlite::Connection;
use tracing::{debug, info};

use crate::error::StoreError;
use crate::schema;

/// Shared handle to one SQLite connection.
///
/// Calls are synchronous and serialized by the mutex. Async code reaches the
/// database through `spawn_blocking`, see [`SqliteProblemSource`](crate::SqliteProblemSource).
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
    path: PathBuf,
}

impl Database {
    /// Open (creating parent directories and the file if needed) and bring
    /// the schema up to date.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)
                .map_err(|e| StoreError::Io(format!("{}: {e}", dir.display())))?;
        }
        let db = Self::prepare(Connection::open(path)?, path.to_path_buf())?;
        info!(path = %path.display(), "database ready");
        Ok(db)
    }

    pub fn in_memory() -> Result<Self, StoreError> {
        Self::prepare(Connection::open_in_memory()?, PathBuf::from(":memory:"))
    }

    fn prepare(conn: Connection, path: PathBuf) -> Result<Self, StoreError> {
        conn.execute_batch(schema::PRAGMAS)?;
        migrate(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path,
        })
    }

    /// Run `f` while holding the connection lock.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&Connection) -> Result<T, StoreError>,
    {
        f(&self.conn.lock())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn migrate(conn: &Connection) -> Result<(), StoreError> {
    let current: u32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    if current > schema::SCHEMA_VERSION {
        return Err(StoreError::Database(format!(
            "database schema v{current} is newer than supported v{}",
            schema::SCHEMA_VERSION
        )));
    }
    conn.execute_batch(schema::CREATE_TABLES)?;
    if current < schema::SCHEMA_VERSION {
        conn.pragma_update(None, "user_version", schema::SCHEMA_VERSION)?;
        debug!(from = current, to = schema::SCHEMA_VERSION, "schema migrated");
    }
    Ok(())
}
