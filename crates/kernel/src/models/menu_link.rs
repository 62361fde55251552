//! Menu link model.
//!
//! Navigational links organized into named menus (e.g., "main", "footer").
//! A link may point at an item; those are the links expiration can hide.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Menu link record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct MenuLink {
    /// Unique identifier (UUIDv7).
    pub id: Uuid,

    /// Menu machine name (e.g., "main", "footer").
    pub menu_name: String,

    /// Link destination path.
    pub path: String,

    /// Display title.
    pub title: String,

    /// Item this link points at, if any.
    pub item_id: Option<Uuid>,

    /// Sort weight (lower = higher priority).
    pub weight: i32,
}

impl MenuLink {
    /// A link to an arbitrary path.
    pub fn new(menu_name: &str, path: &str, title: &str) -> Self {
        Self {
            id: Uuid::now_v7(),
            menu_name: menu_name.to_string(),
            path: path.to_string(),
            title: title.to_string(),
            item_id: None,
            weight: 0,
        }
    }

    /// A link to an item's public URL.
    pub fn to_item(menu_name: &str, item_id: Uuid, title: &str) -> Self {
        Self {
            item_id: Some(item_id),
            ..Self::new(menu_name, &format!("/item/{item_id}"), title)
        }
    }

    pub fn weight(mut self, weight: i32) -> Self {
        self.weight = weight;
        self
    }
}
