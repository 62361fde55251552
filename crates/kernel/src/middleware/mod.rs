//! HTTP middleware components.
//!
//! Editor authentication for the admin surface and the per-request
//! expiration sweep for the public one.

pub mod editor_auth;
pub mod sweep_on_request;

pub use editor_auth::{Editor, require_editor};
pub use sweep_on_request::sweep_on_request;
