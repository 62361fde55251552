//! Visibility rules for expired items.
//!
//! Listings and menus drop expired items outright. Direct access goes
//! through [`decide_access`], which applies the configured policy.

use std::collections::BTreeSet;
use std::str::FromStr;

use anyhow::bail;
use chrono::NaiveDateTime;
use serde::Serialize;
use uuid::Uuid;

use super::evaluator::{self, ContentItem};
use crate::models::{ListingQuery, MenuLink};

/// What happens when an expired item is requested directly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessPolicy {
    /// Redirect to the fallback destination.
    #[default]
    Redirect,
    /// Respond as if the item did not exist.
    NotFound,
}

impl FromStr for AccessPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "redirect" => Ok(AccessPolicy::Redirect),
            "not_found" | "not-found" | "404" => Ok(AccessPolicy::NotFound),
            other => bail!("unknown expired access policy {other:?}"),
        }
    }
}

/// Outcome of a direct request for an item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDecision {
    Render,
    Redirect(String),
    NotFound,
}

/// Decide how to answer a direct request for `item`.
///
/// Only items of the managed type are intercepted. The check runs on the
/// expiration itself, so an item that expired but has not been swept yet
/// is intercepted the same way as one already moved to draft.
pub fn decide_access(
    item: &ContentItem,
    managed_type: &str,
    now: NaiveDateTime,
    policy: AccessPolicy,
    fallback_url: &str,
) -> AccessDecision {
    if item.item_type != managed_type || !evaluator::is_expired(item, now) {
        return AccessDecision::Render;
    }
    match policy {
        AccessPolicy::Redirect => AccessDecision::Redirect(fallback_url.to_string()),
        AccessPolicy::NotFound => AccessDecision::NotFound,
    }
}

/// Add expired IDs to a listing query's exclusions.
pub fn exclude_expired(query: &mut ListingQuery, expired: &BTreeSet<Uuid>) {
    query.exclude_ids(expired.iter().copied());
}

/// Drop links whose target item is hidden.
pub fn retain_visible_links(links: Vec<MenuLink>, hidden: &BTreeSet<Uuid>) -> Vec<MenuLink> {
    links
        .into_iter()
        .filter(|link| link.item_id.is_none_or(|id| !hidden.contains(&id)))
        .collect()
}

/// Whether a redirect target is safe to put in a `Location` header.
///
/// Relative paths (but not protocol-relative ones) and absolute http(s)
/// URLs are accepted.
pub fn validate_redirect_destination(destination: &str) -> bool {
    if destination.is_empty() || destination.contains(['\r', '\n']) {
        return false;
    }
    if destination.starts_with('/') && !destination.starts_with("//") {
        return true;
    }
    destination.starts_with("https://") || destination.starts_with("http://")
}
