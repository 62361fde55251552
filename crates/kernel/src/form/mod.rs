//! Editor form handling: the expiration field and its CSRF tokens.

pub mod csrf;
pub mod expiration_field;

pub use csrf::{ActionTokens, expiration_action};
pub use expiration_field::{ExpirationField, ExpirationSubmission, SaveOutcome, SkipReason};
