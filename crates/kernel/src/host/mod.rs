//! Host collaborator contracts.
//!
//! Everything the expiration logic needs from the surrounding CMS is
//! behind one of these traits: per-item metadata, item storage and
//! listing, menu links, recurring task registration, and edit permissions.
//! The kernel ships two adapters: [`memory::MemoryHost`] and
//! [`pg::PgHost`].

pub mod memory;
pub mod pg;

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Item, ItemStatus, ListingQuery, MenuLink};

pub use memory::MemoryHost;
pub use pg::PgHost;

/// Per-item key/value metadata.
#[async_trait]
pub trait MetaStore: Send + Sync {
    /// Read a value. Empty values are reported as `None`.
    async fn get_meta(&self, item_id: Uuid, key: &str) -> Result<Option<String>>;

    /// Insert or overwrite a value.
    async fn set_meta(&self, item_id: Uuid, key: &str, value: &str) -> Result<()>;

    /// Remove a value. Removing a missing key is not an error.
    async fn delete_meta(&self, item_id: Uuid, key: &str) -> Result<()>;

    /// Every non-empty value stored under one of `keys`, in a single read.
    async fn meta_values(&self, keys: &[&str]) -> Result<Vec<MetaValue>>;
}

/// One stored metadata value.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct MetaValue {
    pub item_id: Uuid,
    pub key: String,
    pub value: String,
}

/// Item storage.
#[async_trait]
pub trait ItemStore: Send + Sync {
    async fn load(&self, id: Uuid) -> Result<Option<Item>>;

    /// Load several items. Missing IDs are skipped.
    async fn load_many(&self, ids: &[Uuid]) -> Result<Vec<Item>>;

    /// Run a listing query. Exclusions are applied before the limit.
    async fn list(&self, query: &ListingQuery) -> Result<Vec<Item>>;

    /// Change an item's status.
    ///
    /// Returns `false` when the item is missing or already has `status`;
    /// repeating a transition is a no-op, never an error.
    async fn set_status(&self, id: Uuid, status: &ItemStatus) -> Result<bool>;
}

/// Source of navigation menu links.
#[async_trait]
pub trait MenuSource: Send + Sync {
    /// Links of a menu ordered by weight.
    async fn menu_links(&self, menu_name: &str) -> Result<Vec<MenuLink>>;
}

/// A registered recurring hook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ScheduledHook {
    pub name: String,
    /// Seconds between runs.
    pub recurrence_secs: i64,
    /// Unix timestamp of the next run.
    pub next_run: i64,
}

/// Persistent recurring task registration.
#[async_trait]
pub trait Scheduler: Send + Sync {
    async fn next_scheduled(&self, hook: &str) -> Result<Option<ScheduledHook>>;

    /// Register (or re-register) a recurring hook.
    async fn schedule(&self, hook: &str, first_run: i64, recurrence: Duration) -> Result<()>;

    /// Hooks due at `now`. Each claimed hook is pushed forward to
    /// `now + recurrence`, so a hook runs no more often than its recurrence.
    async fn claim_due(&self, now: i64) -> Result<Vec<String>>;

    /// Remove a hook. Returns whether it was registered.
    async fn clear(&self, hook: &str) -> Result<bool>;
}

/// Edit permission check for the expiration form.
#[async_trait]
pub trait EditPermissions: Send + Sync {
    async fn can_edit(&self, editor: Uuid, item_id: Uuid) -> Result<bool>;
}

/// The full set of collaborators, as shared trait objects.
#[derive(Clone)]
pub struct HostServices {
    pub items: std::sync::Arc<dyn ItemStore>,
    pub meta: std::sync::Arc<dyn MetaStore>,
    pub menus: std::sync::Arc<dyn MenuSource>,
    pub scheduler: std::sync::Arc<dyn Scheduler>,
    pub permissions: std::sync::Arc<dyn EditPermissions>,
}

impl HostServices {
    /// Use one adapter for every collaborator.
    pub fn from_adapter<H>(host: std::sync::Arc<H>) -> Self
    where
        H: ItemStore + MetaStore + MenuSource + Scheduler + EditPermissions + 'static,
    {
        Self {
            items: host.clone(),
            meta: host.clone(),
            menus: host.clone(),
            scheduler: host.clone(),
            permissions: host,
        }
    }
}

impl std::fmt::Debug for HostServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostServices").finish()
    }
}
