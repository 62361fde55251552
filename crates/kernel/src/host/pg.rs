//! PostgreSQL host adapter.
//!
//! Stores items, metadata, menu links, and recurring hooks in the tables
//! created by the bundled migrations.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use sea_query::{Alias, Expr, Order, PostgresQueryBuilder, Query};
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use super::{
    EditPermissions, ItemStore, MenuSource, MetaStore, MetaValue, ScheduledHook, Scheduler,
};
use crate::models::{Item, ItemStatus, ListingQuery, MenuLink};

/// Item row as stored; status is plain text.
#[derive(Debug, sqlx::FromRow)]
struct ItemRow {
    id: Uuid,
    #[sqlx(rename = "type")]
    item_type: String,
    title: String,
    status: String,
    changed: i64,
}

impl From<ItemRow> for Item {
    fn from(row: ItemRow) -> Self {
        Item {
            id: row.id,
            item_type: row.item_type,
            title: row.title,
            status: ItemStatus::from(row.status),
            changed: row.changed,
        }
    }
}

/// Postgres-backed implementation of every host collaborator.
#[derive(Clone)]
pub struct PgHost {
    pool: PgPool,
}

impl PgHost {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Apply the bundled schema migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("failed to run migrations")?;
        Ok(())
    }
}

/// Build the SELECT for a listing query.
fn build_listing(query: &ListingQuery) -> String {
    let mut select = Query::select();
    select
        .columns([
            Alias::new("id"),
            Alias::new("type"),
            Alias::new("title"),
            Alias::new("status"),
            Alias::new("changed"),
        ])
        .from(Alias::new("item"));

    if let Some(item_type) = &query.item_type {
        select.and_where(Expr::col(Alias::new("type")).eq(item_type.as_str()));
    }
    if query.published_only {
        select.and_where(Expr::col(Alias::new("status")).eq(ItemStatus::Published.as_str()));
    }
    if !query.exclude.is_empty() {
        select.and_where(Expr::col(Alias::new("id")).is_not_in(query.exclude.iter().copied()));
    }

    select
        .order_by(Alias::new("changed"), Order::Desc)
        .order_by(Alias::new("id"), Order::Asc);

    if let Some(limit) = query.limit {
        select.limit(limit);
    }

    select.to_string(PostgresQueryBuilder)
}

#[async_trait]
impl MetaStore for PgHost {
    async fn get_meta(&self, item_id: Uuid, key: &str) -> Result<Option<String>> {
        let value: Option<String> = sqlx::query_scalar(
            "SELECT meta_value FROM item_meta WHERE item_id = $1 AND meta_key = $2",
        )
        .bind(item_id)
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .context("failed to read item meta")?;

        Ok(value.filter(|v| !v.is_empty()))
    }

    async fn set_meta(&self, item_id: Uuid, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO item_meta (item_id, meta_key, meta_value)
            VALUES ($1, $2, $3)
            ON CONFLICT (item_id, meta_key) DO UPDATE
            SET meta_value = EXCLUDED.meta_value
            "#,
        )
        .bind(item_id)
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await
        .context("failed to write item meta")?;

        Ok(())
    }

    async fn delete_meta(&self, item_id: Uuid, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM item_meta WHERE item_id = $1 AND meta_key = $2")
            .bind(item_id)
            .bind(key)
            .execute(&self.pool)
            .await
            .context("failed to delete item meta")?;

        Ok(())
    }

    async fn meta_values(&self, keys: &[&str]) -> Result<Vec<MetaValue>> {
        let keys: Vec<String> = keys.iter().map(|key| (*key).to_string()).collect();
        let values = sqlx::query_as::<_, MetaValue>(
            r#"
            SELECT item_id, meta_key AS key, meta_value AS value
            FROM item_meta
            WHERE meta_key = ANY($1) AND meta_value <> ''
            ORDER BY item_id, meta_key
            "#,
        )
        .bind(keys)
        .fetch_all(&self.pool)
        .await
        .context("failed to read item meta values")?;

        Ok(values)
    }
}

#[async_trait]
impl ItemStore for PgHost {
    async fn load(&self, id: Uuid) -> Result<Option<Item>> {
        let row = sqlx::query_as::<_, ItemRow>(
            "SELECT id, type, title, status, changed FROM item WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("failed to load item")?;

        Ok(row.map(Item::from))
    }

    async fn load_many(&self, ids: &[Uuid]) -> Result<Vec<Item>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, ItemRow>(
            "SELECT id, type, title, status, changed FROM item WHERE id = ANY($1)",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await
        .context("failed to load items")?;

        Ok(rows.into_iter().map(Item::from).collect())
    }

    async fn list(&self, query: &ListingQuery) -> Result<Vec<Item>> {
        let sql = build_listing(query);
        debug!(sql = %sql, "item listing");

        let rows = sqlx::query_as::<_, ItemRow>(&sql)
            .fetch_all(&self.pool)
            .await
            .context("failed to list items")?;

        Ok(rows.into_iter().map(Item::from).collect())
    }

    async fn set_status(&self, id: Uuid, status: &ItemStatus) -> Result<bool> {
        let now = chrono::Utc::now().timestamp();

        let result = sqlx::query(
            r#"
            UPDATE item
            SET status = $1, changed = $2
            WHERE id = $3 AND status <> $1
            "#,
        )
        .bind(status.as_str())
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await
        .context("failed to update item status")?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl MenuSource for PgHost {
    async fn menu_links(&self, menu_name: &str) -> Result<Vec<MenuLink>> {
        let links = sqlx::query_as::<_, MenuLink>(
            r#"
            SELECT id, menu_name, path, title, item_id, weight
            FROM menu_link
            WHERE menu_name = $1
            ORDER BY weight ASC, title ASC
            "#,
        )
        .bind(menu_name)
        .fetch_all(&self.pool)
        .await
        .context("failed to fetch menu links")?;

        Ok(links)
    }
}

#[async_trait]
impl Scheduler for PgHost {
    async fn next_scheduled(&self, hook: &str) -> Result<Option<ScheduledHook>> {
        let scheduled = sqlx::query_as::<_, ScheduledHook>(
            "SELECT name, recurrence_secs, next_run FROM scheduled_hook WHERE name = $1",
        )
        .bind(hook)
        .fetch_optional(&self.pool)
        .await
        .context("failed to read scheduled hook")?;

        Ok(scheduled)
    }

    async fn schedule(&self, hook: &str, first_run: i64, recurrence: Duration) -> Result<()> {
        let recurrence_secs = i64::try_from(recurrence.as_secs()).unwrap_or(i64::MAX);

        sqlx::query(
            r#"
            INSERT INTO scheduled_hook (name, recurrence_secs, next_run)
            VALUES ($1, $2, $3)
            ON CONFLICT (name) DO UPDATE
            SET recurrence_secs = EXCLUDED.recurrence_secs, next_run = EXCLUDED.next_run
            "#,
        )
        .bind(hook)
        .bind(recurrence_secs)
        .bind(first_run)
        .execute(&self.pool)
        .await
        .context("failed to schedule hook")?;

        Ok(())
    }

    async fn claim_due(&self, now: i64) -> Result<Vec<String>> {
        let mut due: Vec<String> = sqlx::query_scalar(
            r#"
            UPDATE scheduled_hook
            SET next_run = $1 + recurrence_secs
            WHERE next_run <= $1
            RETURNING name
            "#,
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await
        .context("failed to claim due hooks")?;

        due.sort();
        Ok(due)
    }

    async fn clear(&self, hook: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM scheduled_hook WHERE name = $1")
            .bind(hook)
            .execute(&self.pool)
            .await
            .context("failed to clear scheduled hook")?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl EditPermissions for PgHost {
    async fn can_edit(&self, editor: Uuid, item_id: Uuid) -> Result<bool> {
        let allowed: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM item_editor
                WHERE user_id = $1 AND (item_id IS NULL OR item_id = $2)
            )
            "#,
        )
        .bind(editor)
        .bind(item_id)
        .fetch_one(&self.pool)
        .await
        .context("failed to check edit permission")?;

        Ok(allowed)
    }
}

impl std::fmt::Debug for PgHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgHost").finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn listing_sql_applies_exclusions_before_limit() {
        let excluded = Uuid::now_v7();
        let mut query = ListingQuery::public(Some("post".to_string()));
        query.exclude_ids([excluded]);
        query.limit = Some(10);

        let sql = build_listing(&query);
        assert!(sql.contains(r#""type" = 'post'"#), "{sql}");
        assert!(sql.contains(r#""status" = 'published'"#), "{sql}");
        assert!(sql.contains("NOT IN"), "{sql}");
        assert!(sql.contains(&excluded.to_string()), "{sql}");
        assert!(sql.ends_with("LIMIT 10"), "{sql}");
    }

    #[test]
    fn admin_listing_sql_has_no_status_filter() {
        let sql = build_listing(&ListingQuery::admin(None));
        assert!(!sql.contains("status\" ="), "{sql}");
        assert!(!sql.contains("NOT IN"), "{sql}");
    }
}
