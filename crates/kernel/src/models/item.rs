//! Item model.
//!
//! Items are the host's content records. The kernel only needs their
//! identity, type, title, and publication status; everything else stays
//! with the host.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Publication status of an item.
///
/// Stored as text. Anything other than `published` or `draft` is kept
/// verbatim so hosts with extra workflow states round-trip cleanly.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ItemStatus {
    Published,
    Draft,
    Other(String),
}

impl ItemStatus {
    pub fn as_str(&self) -> &str {
        match self {
            ItemStatus::Published => "published",
            ItemStatus::Draft => "draft",
            ItemStatus::Other(s) => s,
        }
    }

    pub fn is_published(&self) -> bool {
        matches!(self, ItemStatus::Published)
    }
}

impl From<String> for ItemStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "published" => ItemStatus::Published,
            "draft" => ItemStatus::Draft,
            _ => ItemStatus::Other(s),
        }
    }
}

impl From<&str> for ItemStatus {
    fn from(s: &str) -> Self {
        ItemStatus::from(s.to_string())
    }
}

impl From<ItemStatus> for String {
    fn from(status: ItemStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Item record (content record).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Unique identifier (UUIDv7).
    pub id: Uuid,

    /// Content type machine name.
    #[serde(rename = "type")]
    pub item_type: String,

    /// Item title.
    pub title: String,

    /// Publication status.
    pub status: ItemStatus,

    /// Unix timestamp when last changed.
    pub changed: i64,
}

impl Item {
    /// Public URL of the item.
    pub fn url(&self) -> String {
        format!("/item/{}", self.id)
    }
}

/// Listing query handed to the host's item store.
///
/// `exclude` is applied by the store before the query runs, so excluded
/// items never count towards `limit`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingQuery {
    pub item_type: Option<String>,
    pub published_only: bool,
    pub exclude: BTreeSet<Uuid>,
    pub limit: Option<u64>,
}

impl ListingQuery {
    /// Public listing of published items, optionally of a single type.
    pub fn public(item_type: Option<String>) -> Self {
        Self {
            item_type,
            published_only: true,
            ..Self::default()
        }
    }

    /// Admin listing: every status.
    pub fn admin(item_type: Option<String>) -> Self {
        Self {
            item_type,
            ..Self::default()
        }
    }

    pub fn exclude_ids(&mut self, ids: impl IntoIterator<Item = Uuid>) {
        self.exclude.extend(ids);
    }

    /// Whether an item passes every filter of this query.
    pub fn matches(&self, item: &Item) -> bool {
        if self.published_only && !item.status.is_published() {
            return false;
        }
        if let Some(item_type) = &self.item_type
            && &item.item_type != item_type
        {
            return false;
        }
        !self.exclude.contains(&item.id)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn item(item_type: &str, status: ItemStatus) -> Item {
        Item {
            id: Uuid::now_v7(),
            item_type: item_type.to_string(),
            title: "Hello".to_string(),
            status,
            changed: 0,
        }
    }

    #[test]
    fn status_round_trips_through_text() {
        assert_eq!(ItemStatus::from("published"), ItemStatus::Published);
        assert_eq!(ItemStatus::from("draft"), ItemStatus::Draft);
        assert_eq!(ItemStatus::from("pending").as_str(), "pending");

        let json = serde_json::to_string(&ItemStatus::Draft).unwrap();
        assert_eq!(json, "\"draft\"");
        let parsed: ItemStatus = serde_json::from_str("\"future\"").unwrap();
        assert_eq!(parsed, ItemStatus::Other("future".to_string()));
    }

    #[test]
    fn public_query_filters_status_type_and_exclusions() {
        let post = item("post", ItemStatus::Published);
        let draft = item("post", ItemStatus::Draft);
        let page = item("page", ItemStatus::Published);

        let mut query = ListingQuery::public(Some("post".to_string()));
        assert!(query.matches(&post));
        assert!(!query.matches(&draft));
        assert!(!query.matches(&page));

        query.exclude_ids([post.id]);
        assert!(!query.matches(&post));

        assert!(ListingQuery::admin(None).matches(&draft));
    }

    #[test]
    fn item_url() {
        let it = item("post", ItemStatus::Published);
        assert_eq!(it.url(), format!("/item/{}", it.id));
    }
}
