//! Kernel services.
//!
//! Services sit between the route handlers and the host collaborators.

pub mod expiration;
