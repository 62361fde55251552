//! Persisted expiration state.
//!
//! Two metadata fields per item, set together or cleared together.

use std::collections::HashMap;

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use uuid::Uuid;

use super::ExpiresAt;
use crate::host::MetaStore;

/// Meta key of the civil date component.
pub const EXPIRATION_DATE_KEY: &str = "expiration_date";

/// Meta key of the civil time component.
pub const EXPIRATION_TIME_KEY: &str = "expiration_time";

/// Value format of a `datetime-local` input.
pub const INPUT_FORMAT: &str = "%Y-%m-%dT%H:%M";

/// Formats accepted from the form field, most specific first.
const ACCEPTED_INPUT_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    INPUT_FORMAT,
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// Read an item's expiration. Missing or partial data reads as `None`.
pub async fn read_expiration(meta: &dyn MetaStore, item_id: Uuid) -> Result<Option<ExpiresAt>> {
    let date = meta.get_meta(item_id, EXPIRATION_DATE_KEY).await?;
    let time = meta.get_meta(item_id, EXPIRATION_TIME_KEY).await?;
    Ok(ExpiresAt::from_parts(date.as_deref(), time.as_deref()))
}

/// Read every stored expiration with one bulk meta read.
///
/// Items with only one of the two fields are left out.
pub async fn read_all_expirations(meta: &dyn MetaStore) -> Result<HashMap<Uuid, ExpiresAt>> {
    let values = meta
        .meta_values(&[EXPIRATION_DATE_KEY, EXPIRATION_TIME_KEY])
        .await?;

    let mut parts: HashMap<Uuid, (Option<String>, Option<String>)> = HashMap::new();
    for value in values {
        let entry = parts.entry(value.item_id).or_default();
        match value.key.as_str() {
            EXPIRATION_DATE_KEY => entry.0 = Some(value.value),
            EXPIRATION_TIME_KEY => entry.1 = Some(value.value),
            _ => {}
        }
    }

    Ok(parts
        .into_iter()
        .filter_map(|(id, (date, time))| {
            ExpiresAt::from_parts(date.as_deref(), time.as_deref()).map(|at| (id, at))
        })
        .collect())
}

pub async fn write_expiration(meta: &dyn MetaStore, item_id: Uuid, at: ExpiresAt) -> Result<()> {
    meta.set_meta(item_id, EXPIRATION_DATE_KEY, &at.date_part())
        .await
        .context("failed to store expiration date")?;
    meta.set_meta(item_id, EXPIRATION_TIME_KEY, &at.time_part())
        .await
        .context("failed to store expiration time")?;
    Ok(())
}

pub async fn clear_expiration(meta: &dyn MetaStore, item_id: Uuid) -> Result<()> {
    meta.delete_meta(item_id, EXPIRATION_DATE_KEY)
        .await
        .context("failed to delete expiration date")?;
    meta.delete_meta(item_id, EXPIRATION_TIME_KEY)
        .await
        .context("failed to delete expiration time")?;
    Ok(())
}

/// Parse a submitted `datetime-local` value.
///
/// Blank or unparseable input yields `None`, which callers treat as
/// "clear the expiration".
pub fn parse_submitted(raw: &str) -> Option<ExpiresAt> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    ACCEPTED_INPUT_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(ExpiresAt::new)
}

/// Render an expiration as a `datetime-local` input value.
pub fn format_for_input(at: ExpiresAt) -> String {
    at.as_naive().format(INPUT_FORMAT).to_string()
}
