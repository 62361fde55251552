//! Content expiration service.
//!
//! Joins the pure evaluator to the host collaborators: reads expiration
//! meta, runs the sweep, filters listings and menus, decides direct access,
//! and handles the editor form.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::Config;
use crate::expiration::meta;
use crate::expiration::visibility::{self, decide_access};
use crate::expiration::{
    AccessDecision, AccessPolicy, ContentItem, ExpirationColumn, ExpiresAt, SiteClock, SortOrder,
    compare_expiration, evaluator,
};
use crate::form::{
    ActionTokens, ExpirationField, ExpirationSubmission, SaveOutcome, SkipReason,
    expiration_action,
};
use crate::host::HostServices;
use crate::models::{Item, ItemStatus, ListingQuery, MenuLink};

/// Which items expire and what happens when an expired one is requested.
#[derive(Debug, Clone)]
pub struct ExpirationSettings {
    pub content_type: String,
    pub access_policy: AccessPolicy,
    pub fallback_url: String,
}

impl ExpirationSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            content_type: config.expiration_content_type.clone(),
            access_policy: config.expired_access_policy,
            fallback_url: config.expired_fallback_url.clone(),
        }
    }
}

impl Default for ExpirationSettings {
    fn default() -> Self {
        Self {
            content_type: "post".to_string(),
            access_policy: AccessPolicy::Redirect,
            fallback_url: "/".to_string(),
        }
    }
}

/// Result of one sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Managed items carrying an expiration.
    pub examined: usize,
    /// Items moved from published to draft by this sweep.
    pub transitioned: Vec<Uuid>,
}

/// One row of the admin content listing.
#[derive(Debug, Clone, Serialize)]
pub struct AdminRow {
    pub item: Item,
    pub url: String,
    pub expiration: Option<ExpirationColumn>,
    /// Expiration form, present for managed items.
    pub edit_url: Option<String>,
}

/// Content expiration service.
pub struct ExpirationService {
    host: HostServices,
    clock: SiteClock,
    settings: ExpirationSettings,
    tokens: ActionTokens,
}

impl ExpirationService {
    pub fn new(
        host: HostServices,
        clock: SiteClock,
        settings: ExpirationSettings,
        tokens: ActionTokens,
    ) -> Self {
        Self {
            host,
            clock,
            settings,
            tokens,
        }
    }

    pub fn host(&self) -> &HostServices {
        &self.host
    }

    pub fn clock(&self) -> &SiteClock {
        &self.clock
    }

    pub fn settings(&self) -> &ExpirationSettings {
        &self.settings
    }

    /// Whether items of `item_type` are subject to expiration.
    pub fn manages(&self, item_type: &str) -> bool {
        self.settings.content_type == item_type
    }

    /// Stored expiration of an item.
    pub async fn expiration(&self, item_id: Uuid) -> Result<Option<ExpiresAt>> {
        meta::read_expiration(self.host.meta.as_ref(), item_id).await
    }

    /// Evaluator view of a host item.
    pub async fn content_item(&self, item: &Item) -> Result<ContentItem> {
        Ok(content_of(item, self.expiration(item.id).await?))
    }

    /// Managed items that carry a complete expiration.
    ///
    /// Meta and items are each fetched in one bulk read.
    async fn candidates(&self) -> Result<Vec<ContentItem>> {
        let expirations = meta::read_all_expirations(self.host.meta.as_ref())
            .await
            .context("failed to read stored expirations")?;
        if expirations.is_empty() {
            return Ok(Vec::new());
        }

        let mut ids: Vec<Uuid> = expirations.keys().copied().collect();
        ids.sort();
        let items = self
            .host
            .items
            .load_many(&ids)
            .await
            .context("failed to load expiration candidates")?;

        Ok(items
            .iter()
            .filter(|item| self.manages(&item.item_type))
            .map(|item| content_of(item, expirations.get(&item.id).copied()))
            .collect())
    }

    /// Published managed items expired at `now`.
    pub async fn expired_ids_at(&self, now: NaiveDateTime) -> Result<BTreeSet<Uuid>> {
        let candidates = self.candidates().await?;
        Ok(evaluator::sweep(&candidates, &self.settings.content_type, now))
    }

    /// Unpublish every published managed item expired at `now`.
    ///
    /// Items already in draft are left alone, so running twice is harmless.
    pub async fn sweep_at(&self, now: NaiveDateTime) -> Result<SweepReport> {
        let candidates = self.candidates().await?;
        let expired = evaluator::sweep(&candidates, &self.settings.content_type, now);

        let mut report = SweepReport {
            examined: candidates.len(),
            transitioned: Vec::with_capacity(expired.len()),
        };

        for id in expired {
            let changed = self
                .host
                .items
                .set_status(id, &ItemStatus::Draft)
                .await
                .with_context(|| format!("failed to unpublish expired item {id}"))?;
            if changed {
                info!(item_id = %id, "unpublished expired item");
                report.transitioned.push(id);
            }
        }

        debug!(
            examined = report.examined,
            transitioned = report.transitioned.len(),
            "expiration sweep finished"
        );
        Ok(report)
    }

    pub async fn sweep_now(&self) -> Result<SweepReport> {
        self.sweep_at(self.clock.now()).await
    }

    /// Exclude every currently expired managed item from a listing query.
    pub async fn hide_expired(&self, query: &mut ListingQuery) -> Result<()> {
        let expired = self.expired_ids_at(self.clock.now()).await?;
        visibility::exclude_expired(query, &expired);
        Ok(())
    }

    /// Drop menu links that point at expired managed items.
    ///
    /// Status is ignored here: a link to an expired draft is dropped too.
    pub async fn filter_menu(&self, links: Vec<MenuLink>) -> Result<Vec<MenuLink>> {
        if links.iter().all(|link| link.item_id.is_none()) {
            return Ok(links);
        }
        let now = self.clock.now();
        let hidden: BTreeSet<Uuid> = self
            .candidates()
            .await?
            .iter()
            .filter(|item| evaluator::is_expired(item, now))
            .map(|item| item.id)
            .collect();
        Ok(visibility::retain_visible_links(links, &hidden))
    }

    /// Decide how a direct request for `item` is answered.
    pub async fn access_decision(&self, item: &Item) -> Result<AccessDecision> {
        if !self.manages(&item.item_type) {
            return Ok(AccessDecision::Render);
        }
        let content = self.content_item(item).await?;
        Ok(decide_access(
            &content,
            &self.settings.content_type,
            self.clock.now(),
            self.settings.access_policy,
            &self.settings.fallback_url,
        ))
    }

    /// Expiration column for a managed item; `None` for other types.
    pub async fn column(&self, item: &Item) -> Result<Option<ExpirationColumn>> {
        if !self.manages(&item.item_type) {
            return Ok(None);
        }
        let content = self.content_item(item).await?;
        Ok(Some(ExpirationColumn::for_item(&content, self.clock.now())))
    }

    /// Admin listing rows, optionally sorted by expiration.
    pub async fn admin_rows(
        &self,
        item_type: Option<String>,
        sort: Option<SortOrder>,
    ) -> Result<Vec<AdminRow>> {
        let items = self
            .host
            .items
            .list(&ListingQuery::admin(item_type))
            .await
            .context("failed to list content")?;
        let expirations = meta::read_all_expirations(self.host.meta.as_ref())
            .await
            .context("failed to read stored expirations")?;
        let now = self.clock.now();

        let mut rows = Vec::with_capacity(items.len());
        for item in items {
            let content = content_of(&item, expirations.get(&item.id).copied());
            let expiration = self
                .manages(&item.item_type)
                .then(|| ExpirationColumn::for_item(&content, now));
            let edit_url = expiration.is_some().then(|| edit_url(item.id));
            rows.push((content.expires_at, AdminRow {
                url: item.url(),
                item,
                expiration,
                edit_url,
            }));
        }

        if let Some(order) = sort {
            rows.sort_by(|(a, row_a), (b, row_b)| {
                // Unmanaged items carry no column and sort with the unset ones.
                let a = row_a.expiration.as_ref().and(*a);
                let b = row_b.expiration.as_ref().and(*b);
                match compare_expiration(a, b, order) {
                    Ordering::Equal => row_a.item.title.cmp(&row_b.item.title),
                    other => other,
                }
            });
        }

        Ok(rows.into_iter().map(|(_, row)| row).collect())
    }

    /// Build the editor form field for an item.
    ///
    /// Returns `None` when the item does not exist or is not managed.
    pub async fn field(&self, editor: Uuid, item_id: Uuid) -> Result<Option<ExpirationField>> {
        let Some(item) = self.host.items.load(item_id).await? else {
            return Ok(None);
        };
        if !self.manages(&item.item_type) {
            return Ok(None);
        }

        let content = self.content_item(&item).await?;
        let token = self.tokens.issue(
            &expiration_action(item_id),
            editor,
            chrono::Utc::now().timestamp(),
        )?;

        Ok(Some(ExpirationField::new(
            content.expires_at,
            evaluator::is_expired(&content, self.clock.now()),
            token,
            self.clock.label(),
            edit_url(item_id),
        )))
    }

    /// Apply a submitted form value.
    ///
    /// Token, autosave and permission failures skip the save without error.
    /// A blank or unparseable value clears the expiration.
    pub async fn save_submission(
        &self,
        editor: Uuid,
        item_id: Uuid,
        submission: &ExpirationSubmission,
    ) -> Result<SaveOutcome> {
        let now = chrono::Utc::now().timestamp();
        if !self.tokens.verify(
            &expiration_action(item_id),
            editor,
            &submission.expiration_token,
            now,
        ) {
            debug!(item_id = %item_id, editor = %editor, "expiration save skipped: bad token");
            return Ok(SaveOutcome::Skipped(SkipReason::InvalidToken));
        }

        if submission.autosave {
            debug!(item_id = %item_id, "expiration save skipped: autosave");
            return Ok(SaveOutcome::Skipped(SkipReason::Autosave));
        }

        if !self.host.permissions.can_edit(editor, item_id).await? {
            debug!(item_id = %item_id, editor = %editor, "expiration save skipped: forbidden");
            return Ok(SaveOutcome::Skipped(SkipReason::Forbidden));
        }

        let parsed = submission
            .expiration_datetime
            .as_deref()
            .and_then(meta::parse_submitted);

        match parsed {
            Some(at) => {
                meta::write_expiration(self.host.meta.as_ref(), item_id, at).await?;
                info!(item_id = %item_id, expires_at = %at.as_naive(), "expiration set");
                Ok(SaveOutcome::Saved(at))
            }
            None => {
                meta::clear_expiration(self.host.meta.as_ref(), item_id).await?;
                info!(item_id = %item_id, "expiration cleared");
                Ok(SaveOutcome::Cleared)
            }
        }
    }
}

fn content_of(item: &Item, expires_at: Option<ExpiresAt>) -> ContentItem {
    ContentItem {
        id: item.id,
        item_type: item.item_type.clone(),
        status: item.status.clone(),
        expires_at,
    }
}

/// Path of an item's expiration form.
pub fn edit_url(item_id: Uuid) -> String {
    format!("/admin/content/{item_id}/expiration")
}

impl std::fmt::Debug for ExpirationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExpirationService")
            .field("content_type", &self.settings.content_type)
            .field("offset", &self.clock.label())
            .finish()
    }
}
