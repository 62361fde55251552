//! Content expiration.
//!
//! The evaluator and visibility rules are pure; [`meta`] is the only part
//! that talks to a host collaborator.

pub mod clock;
pub mod column;
pub mod evaluator;
pub mod meta;
pub mod visibility;

pub use clock::{SiteClock, parse_utc_offset};
pub use column::{ColumnState, ExpirationColumn};
pub use evaluator::{
    ContentItem, ExpirationStatus, ExpiresAt, Remaining, SortOrder, compare_expiration,
    is_expired, remaining, select_expired, sort_by_expiration, status, sweep,
};
pub use visibility::{AccessDecision, AccessPolicy};
