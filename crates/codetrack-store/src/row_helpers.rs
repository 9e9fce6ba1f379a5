//! Column decoding that reports which `table.column` held the bad value.

use rusqlite::types::FromSql;
use rusqlite::Row;
use serde::de::DeserializeOwned;

use crate::error::StoreError;

/// A row plus the table it came from.
pub struct Columns<'a, 'stmt> {
    row: &'a Row<'stmt>,
    table: &'static str,
}

impl<'a, 'stmt> Columns<'a, 'stmt> {
    pub fn new(row: &'a Row<'stmt>, table: &'static str) -> Self {
        Self { row, table }
    }

    fn corrupt(&self, column: &'static str, detail: String) -> StoreError {
        StoreError::CorruptRow {
            table: self.table,
            column,
            detail,
        }
    }

    /// Decode column `idx`. Use an `Option<T>` target for nullable columns.
    pub fn get<T: FromSql>(&self, idx: usize, column: &'static str) -> Result<T, StoreError> {
        self.row.get(idx).map_err(|e| self.corrupt(column, e.to_string()))
    }

    /// A text column holding a `FromStr` value such as a status.
    pub fn parsed<T: std::str::FromStr>(&self, idx: usize, column: &'static str) -> Result<T, StoreError> {
        let raw: String = self.get(idx, column)?;
        raw.parse()
            .map_err(|_| self.corrupt(column, format!("unrecognized value {raw:?}")))
    }

    /// A nullable text column holding JSON.
    pub fn json<T: DeserializeOwned>(&self, idx: usize, column: &'static str) -> Result<Option<T>, StoreError> {
        let raw: Option<String> = self.get(idx, column)?;
        raw.as_deref()
            .map(serde_json::from_str)
            .transpose()
            .map_err(|e| self.corrupt(column, format!("invalid JSON: {e}")))
    }
}
