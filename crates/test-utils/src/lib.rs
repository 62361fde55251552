//! Sunset test utilities.
//!
//! Fixture builders for items, expirations, and editors, plus assertion
//! helpers. Plain data only; the kernel tests map them onto kernel types.

use chrono::{Duration, NaiveDateTime};
use uuid::Uuid;

/// Format of civil date-times accepted by [`civil`].
pub const CIVIL_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Parse a civil date-time such as `2024-01-01 10:00:00`.
///
/// Panics on malformed input; fixtures are expected to be literal.
pub fn civil(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, CIVIL_FORMAT)
        .unwrap_or_else(|e| panic!("bad civil fixture {s:?}: {e}"))
}

/// Create a test item with default values: published, no expiration.
pub fn test_item(item_type: &str, title: &str) -> TestItem {
    TestItem {
        id: Uuid::now_v7(),
        item_type: item_type.to_string(),
        title: title.to_string(),
        status: "published".to_string(),
        expiration_date: None,
        expiration_time: None,
    }
}

/// A test item builder for creating test fixtures.
#[derive(Debug, Clone)]
pub struct TestItem {
    pub id: Uuid,
    pub item_type: String,
    pub title: String,
    pub status: String,
    /// Raw `expiration_date` meta value.
    pub expiration_date: Option<String>,
    /// Raw `expiration_time` meta value.
    pub expiration_time: Option<String>,
}

impl TestItem {
    /// Set a custom ID.
    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = id;
        self
    }

    /// Set as unpublished.
    pub fn unpublished(mut self) -> Self {
        self.status = "draft".to_string();
        self
    }

    /// Set as published.
    pub fn published(mut self) -> Self {
        self.status = "published".to_string();
        self
    }

    /// Set an arbitrary status.
    pub fn with_status(mut self, status: &str) -> Self {
        self.status = status.to_string();
        self
    }

    /// Expire at a civil date-time.
    pub fn expires_at(mut self, at: NaiveDateTime) -> Self {
        self.expiration_date = Some(at.format("%Y-%m-%d").to_string());
        self.expiration_time = Some(at.format("%H:%M:%S").to_string());
        self
    }

    /// Expire `offset` after `now`. Negative offsets are in the past.
    pub fn expires_in(self, now: NaiveDateTime, offset: Duration) -> Self {
        self.expires_at(now + offset)
    }

    /// Store only the date half of an expiration.
    pub fn with_partial_expiration(mut self, date: &str) -> Self {
        self.expiration_date = Some(date.to_string());
        self.expiration_time = None;
        self
    }

    /// Whether both halves of the expiration are present.
    pub fn has_expiration(&self) -> bool {
        self.expiration_date.is_some() && self.expiration_time.is_some()
    }

    /// Public URL of the item.
    pub fn url(&self) -> String {
        format!("/item/{}", self.id)
    }
}

/// Create an editor with a fresh bearer token.
pub fn test_editor() -> TestEditor {
    TestEditor {
        id: Uuid::now_v7(),
        token: format!("editor-{}", Uuid::now_v7().simple()),
    }
}

/// An editor and the bearer token that authenticates it.
#[derive(Debug, Clone)]
pub struct TestEditor {
    pub id: Uuid,
    pub token: String,
}

impl TestEditor {
    /// `Authorization` header value.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

/// Assertion helpers for JSON content.
pub mod assert {
    use serde_json::Value;

    /// Assert that a JSON value has a specific key.
    pub fn has_key(value: &Value, key: &str) {
        assert!(
            value.get(key).is_some(),
            "Expected JSON to have key '{key}', got: {value}"
        );
    }

    /// Assert that a string contains a substring.
    pub fn contains(haystack: &str, needle: &str) {
        assert!(
            haystack.contains(needle),
            "Expected string to contain '{needle}'\nActual: {haystack}"
        );
    }

    /// Assert that a string does not contain a substring.
    pub fn not_contains(haystack: &str, needle: &str) {
        assert!(
            !haystack.contains(needle),
            "Expected string NOT to contain '{needle}'\nActual: {haystack}"
        );
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_item_builder() {
        let item = test_item("post", "Hello").unpublished();
        assert_eq!(item.item_type, "post");
        assert_eq!(item.status, "draft");
        assert!(!item.has_expiration());
    }

    #[test]
    fn expiration_halves() {
        let now = civil("2024-01-01 10:00:00");
        let item = test_item("post", "Soon").expires_in(now, Duration::minutes(90));
        assert_eq!(item.expiration_date.as_deref(), Some("2024-01-01"));
        assert_eq!(item.expiration_time.as_deref(), Some("11:30:00"));

        let partial = item.with_partial_expiration("2024-01-01");
        assert!(!partial.has_expiration());
    }

    #[test]
    fn editor_bearer() {
        let editor = test_editor();
        assert!(editor.bearer().starts_with("Bearer editor-"));
    }
}
