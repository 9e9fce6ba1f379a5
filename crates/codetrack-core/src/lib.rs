//! # codetrack-core
//!
//! Domain types shared by every codetrack crate.
//!
//! - [`ProblemRecord`] / [`UserProfile`]: what the persistence layer hands out
//! - [`Statistics`]: the aggregate computed per request
//! - [`ReportError`]: the error taxonomy surfaced to the HTTP boundary
//! - [`ProblemSource`]: the async seam over persistence, with an in-memory
//!   implementation for tests and fixtures

#![deny(unsafe_code)]

pub mod errors;
pub mod ids;
pub mod problem;
pub mod source;
pub mod statistics;

pub use errors::{ReportError, Result};
pub use ids::{ProblemId, UserId};
pub use problem::{rating_label, ProblemMetadata, ProblemRecord, ProblemStatus, UserProfile};
pub use source::{MemorySource, ProblemSource};
pub use statistics::{Distribution, Distributions, Statistics, Summary};
