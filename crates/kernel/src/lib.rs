//! Sunset kernel library.
//!
//! Content expiration for a host CMS: the evaluator, the sweep, visibility
//! rules, the editor field, and the HTTP surface that ties them together.
//! The main entry point for running the server is the `sunset` binary.

pub mod config;
pub mod cron;
pub mod db;
pub mod error;
pub mod expiration;
pub mod form;
pub mod host;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod theme;

pub use config::Config;
pub use cron::{CronService, EXPIRATION_CHECK_HOOK};
pub use error::{AppError, AppResult};
pub use host::{HostServices, MemoryHost, PgHost};
pub use services::expiration::{ExpirationService, ExpirationSettings, SweepReport};
pub use state::AppState;
