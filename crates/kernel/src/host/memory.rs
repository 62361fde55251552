//! In-memory host adapter.
//!
//! Backs the standalone binary when no database is configured, and every
//! test. Nothing survives a restart.

use std::collections::HashSet;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::RwLock;
use uuid::Uuid;

use super::{
    EditPermissions, ItemStore, MenuSource, MetaStore, MetaValue, ScheduledHook, Scheduler,
};
use crate::models::{Item, ItemStatus, ListingQuery, MenuLink};

/// In-memory implementation of every host collaborator.
#[derive(Default)]
pub struct MemoryHost {
    items: DashMap<Uuid, Item>,
    meta: DashMap<(Uuid, String), String>,
    menus: DashMap<String, Vec<MenuLink>>,
    hooks: DashMap<String, ScheduledHook>,
    editors: RwLock<HashSet<Uuid>>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_item(&self, item: Item) {
        self.items.insert(item.id, item);
    }

    pub fn insert_menu_link(&self, link: MenuLink) {
        let mut links = self.menus.entry(link.menu_name.clone()).or_default();
        links.push(link);
        links.sort_by(|a, b| a.weight.cmp(&b.weight).then_with(|| a.title.cmp(&b.title)));
    }

    /// Allow `editor` to edit every item.
    pub fn grant_editor(&self, editor: Uuid) {
        self.editors.write().insert(editor);
    }

    pub fn status_of(&self, id: Uuid) -> Option<ItemStatus> {
        self.items.get(&id).map(|item| item.status.clone())
    }
}

#[async_trait]
impl MetaStore for MemoryHost {
    async fn get_meta(&self, item_id: Uuid, key: &str) -> Result<Option<String>> {
        Ok(self
            .meta
            .get(&(item_id, key.to_string()))
            .map(|v| v.clone())
            .filter(|v| !v.is_empty()))
    }

    async fn set_meta(&self, item_id: Uuid, key: &str, value: &str) -> Result<()> {
        self.meta
            .insert((item_id, key.to_string()), value.to_string());
        Ok(())
    }

    async fn delete_meta(&self, item_id: Uuid, key: &str) -> Result<()> {
        self.meta.remove(&(item_id, key.to_string()));
        Ok(())
    }

    async fn meta_values(&self, keys: &[&str]) -> Result<Vec<MetaValue>> {
        let mut values: Vec<MetaValue> = self
            .meta
            .iter()
            .filter(|entry| !entry.value().is_empty() && keys.contains(&entry.key().1.as_str()))
            .map(|entry| MetaValue {
                item_id: entry.key().0,
                key: entry.key().1.clone(),
                value: entry.value().clone(),
            })
            .collect();
        values.sort_by(|a, b| a.item_id.cmp(&b.item_id).then_with(|| a.key.cmp(&b.key)));
        Ok(values)
    }
}

#[async_trait]
impl ItemStore for MemoryHost {
    async fn load(&self, id: Uuid) -> Result<Option<Item>> {
        Ok(self.items.get(&id).map(|item| item.clone()))
    }

    async fn load_many(&self, ids: &[Uuid]) -> Result<Vec<Item>> {
        Ok(ids
            .iter()
            .filter_map(|id| self.items.get(id).map(|item| item.clone()))
            .collect())
    }

    async fn list(&self, query: &ListingQuery) -> Result<Vec<Item>> {
        let mut items: Vec<Item> = self
            .items
            .iter()
            .filter(|entry| query.matches(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();

        // Newest first, like the Postgres adapter.
        items.sort_by(|a, b| b.changed.cmp(&a.changed).then_with(|| a.id.cmp(&b.id)));

        if let Some(limit) = query.limit {
            items.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        }
        Ok(items)
    }

    async fn set_status(&self, id: Uuid, status: &ItemStatus) -> Result<bool> {
        let Some(mut item) = self.items.get_mut(&id) else {
            return Ok(false);
        };
        if &item.status == status {
            return Ok(false);
        }
        item.status = status.clone();
        item.changed = chrono::Utc::now().timestamp();
        Ok(true)
    }
}

#[async_trait]
impl MenuSource for MemoryHost {
    async fn menu_links(&self, menu_name: &str) -> Result<Vec<MenuLink>> {
        Ok(self
            .menus
            .get(menu_name)
            .map(|links| links.clone())
            .unwrap_or_default())
    }
}

#[async_trait]
impl Scheduler for MemoryHost {
    async fn next_scheduled(&self, hook: &str) -> Result<Option<ScheduledHook>> {
        Ok(self.hooks.get(hook).map(|h| h.clone()))
    }

    async fn schedule(&self, hook: &str, first_run: i64, recurrence: Duration) -> Result<()> {
        self.hooks.insert(
            hook.to_string(),
            ScheduledHook {
                name: hook.to_string(),
                recurrence_secs: i64::try_from(recurrence.as_secs()).unwrap_or(i64::MAX),
                next_run: first_run,
            },
        );
        Ok(())
    }

    async fn claim_due(&self, now: i64) -> Result<Vec<String>> {
        let mut due = Vec::new();
        for mut hook in self.hooks.iter_mut() {
            if hook.next_run <= now {
                hook.next_run = now.saturating_add(hook.recurrence_secs);
                due.push(hook.name.clone());
            }
        }
        due.sort();
        Ok(due)
    }

    async fn clear(&self, hook: &str) -> Result<bool> {
        Ok(self.hooks.remove(hook).is_some())
    }
}

#[async_trait]
impl EditPermissions for MemoryHost {
    async fn can_edit(&self, editor: Uuid, item_id: Uuid) -> Result<bool> {
        Ok(self.items.contains_key(&item_id) && self.editors.read().contains(&editor))
    }
}

impl std::fmt::Debug for MemoryHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryHost")
            .field("items", &self.items.len())
            .field("hooks", &self.hooks.len())
            .finish()
    }
}
