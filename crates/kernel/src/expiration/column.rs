//! Expiration column for admin listings.

use chrono::NaiveDateTime;
use serde::Serialize;

use super::evaluator::{self, ContentItem, ExpirationStatus, ExpiresAt};

/// Display format for expiration timestamps.
pub const DISPLAY_FORMAT: &str = "%d/%m/%Y %H:%M";

/// Label shown for items without an expiration.
pub const NEVER_EXPIRES: &str = "never expires";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnState {
    Expired,
    Active,
    NoExpiration,
}

impl ColumnState {
    pub fn css_class(&self) -> &'static str {
        match self {
            ColumnState::Expired => "expired-post",
            ColumnState::Active => "active-post",
            ColumnState::NoExpiration => "no-expiration",
        }
    }
}

/// One cell of the expiration column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExpirationColumn {
    pub state: ColumnState,
    pub css_class: &'static str,
    pub label: String,
    /// Expiration in [`DISPLAY_FORMAT`].
    pub expires: Option<String>,
    /// Remaining time, only while active.
    pub remaining: Option<String>,
}

pub fn format_display(at: ExpiresAt) -> String {
    at.as_naive().format(DISPLAY_FORMAT).to_string()
}

impl ExpirationColumn {
    pub fn for_item(item: &ContentItem, now: NaiveDateTime) -> Self {
        let (state, label, expires, remaining) = match evaluator::status(item, now) {
            ExpirationStatus::NoExpiration => {
                (ColumnState::NoExpiration, NEVER_EXPIRES.to_string(), None, None)
            }
            ExpirationStatus::Expired { expires_at } => (
                ColumnState::Expired,
                "EXPIRED".to_string(),
                Some(format_display(expires_at)),
                None,
            ),
            ExpirationStatus::Active {
                expires_at,
                remaining,
            } => (
                ColumnState::Active,
                "ACTIVE".to_string(),
                Some(format_display(expires_at)),
                Some(remaining.to_string()),
            ),
        };

        Self {
            state,
            css_class: state.css_class(),
            label,
            expires,
            remaining,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::models::ItemStatus;
    use chrono::Duration;
    use uuid::Uuid;

    fn item(expires_at: Option<NaiveDateTime>) -> ContentItem {
        ContentItem {
            id: Uuid::now_v7(),
            item_type: "post".to_string(),
            status: ItemStatus::Published,
            expires_at: expires_at.map(ExpiresAt::new),
        }
    }

    fn now() -> NaiveDateTime {
        NaiveDateTime::parse_from_str("2024-01-01 10:00:00", "%Y-%m-%d %H:%M:%S").unwrap()
    }

    #[test]
    fn never_expires_label() {
        let col = ExpirationColumn::for_item(&item(None), now());
        assert_eq!(col.state, ColumnState::NoExpiration);
        assert_eq!(col.label, "never expires");
        assert_eq!(col.css_class, "no-expiration");
        assert!(col.expires.is_none());
    }

    #[test]
    fn expired_shows_date_without_remaining() {
        let col = ExpirationColumn::for_item(&item(Some(now())), now());
        assert_eq!(col.state, ColumnState::Expired);
        assert_eq!(col.expires.as_deref(), Some("01/01/2024 10:00"));
        assert!(col.remaining.is_none());
    }

    #[test]
    fn active_shows_remaining() {
        let col = ExpirationColumn::for_item(&item(Some(now() + Duration::hours(25))), now());
        assert_eq!(col.state, ColumnState::Active);
        assert_eq!(col.remaining.as_deref(), Some("1 day(s)"));
        assert_eq!(col.css_class, "active-post");
    }
}
