//! # codetrack-server
//!
//! Axum HTTP surface for statistics and PDF reports.
//!
//! - `GET /api/reports/statistics` and `GET /api/reports/pdf` behind bearer auth
//! - `GET /api/reports/test` diagnostic PDF
//! - `GET /health`, `GET /metrics`
//! - Graceful shutdown through a `CancellationToken`

#![deny(unsafe_code)]

pub mod auth;
pub mod config;
pub mod error;
pub mod health;
pub mod routes;
pub mod server;

pub use auth::{issue_token, AuthError, AuthUser, Authenticator, JwtAuthenticator};
pub use config::ServerConfig;
pub use error::ApiError;
pub use server::{build_router, start, AppState, ServerHandle};
