//! # codetrack-store
//!
//! SQLite persistence for users and their tracked problems, and the
//! [`SqliteProblemSource`] adapter the report pipeline reads through.

#![deny(unsafe_code)]

pub mod database;
pub mod error;
pub mod problems;
pub mod row_helpers;
pub mod schema;
pub mod source;
pub mod users;

pub use database::Database;
pub use error::StoreError;
pub use problems::{NewProblem, ProblemRepo, ProblemRow};
pub use source::SqliteProblemSource;
pub use users::{UserRepo, UserRow};
