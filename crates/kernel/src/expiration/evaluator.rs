//! Expiration evaluation.
//!
//! Pure functions over civil timestamps. Nothing in here reads storage or
//! the wall clock; callers pass `now` (already converted to site civil time
//! by [`SiteClock`](super::SiteClock)).

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::ItemStatus;

/// Storage format of the date component.
pub const STORED_DATE_FORMAT: &str = "%Y-%m-%d";

/// Storage format of the time component.
pub const STORED_TIME_FORMAT: &str = "%H:%M:%S";

const SECS_PER_HOUR: i64 = 60 * 60;
const SECS_PER_DAY: i64 = 24 * SECS_PER_HOUR;

/// Civil date and time at (and after) which an item counts as expired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExpiresAt(NaiveDateTime);

impl ExpiresAt {
    pub fn new(at: NaiveDateTime) -> Self {
        Self(at)
    }

    /// Rebuild an expiration from its stored date and time components.
    ///
    /// Returns `None` unless both components are present and parse; partial
    /// data means "no expiration".
    pub fn from_parts(date: Option<&str>, time: Option<&str>) -> Option<Self> {
        let date = NaiveDate::parse_from_str(date?.trim(), STORED_DATE_FORMAT).ok()?;
        let time = time?.trim();
        let time = NaiveTime::parse_from_str(time, STORED_TIME_FORMAT)
            .or_else(|_| NaiveTime::parse_from_str(time, "%H:%M"))
            .ok()?;
        Some(Self(date.and_time(time)))
    }

    /// The date component in storage format.
    pub fn date_part(&self) -> String {
        self.0.format(STORED_DATE_FORMAT).to_string()
    }

    /// The time component in storage format.
    pub fn time_part(&self) -> String {
        self.0.format(STORED_TIME_FORMAT).to_string()
    }

    pub fn as_naive(&self) -> NaiveDateTime {
        self.0
    }
}

impl From<NaiveDateTime> for ExpiresAt {
    fn from(at: NaiveDateTime) -> Self {
        Self(at)
    }
}

/// What the evaluator needs to know about a content item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: Uuid,
    pub item_type: String,
    pub status: ItemStatus,
    pub expires_at: Option<ExpiresAt>,
}

/// Time left before an item expires, coarsened for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Remaining {
    Days(i64),
    Hours(i64),
    LessThanAnHour,
}

impl Remaining {
    /// Floor the gap between `now` and `at` to whole days, then whole hours.
    ///
    /// A gap that is already closed reports [`Remaining::LessThanAnHour`].
    pub fn between(at: ExpiresAt, now: NaiveDateTime) -> Self {
        let secs = (at.0 - now).num_seconds().max(0);
        let days = secs / SECS_PER_DAY;
        if days > 0 {
            return Remaining::Days(days);
        }
        let hours = secs / SECS_PER_HOUR;
        if hours > 0 {
            Remaining::Hours(hours)
        } else {
            Remaining::LessThanAnHour
        }
    }
}

impl fmt::Display for Remaining {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Remaining::Days(n) => write!(f, "{n} day(s)"),
            Remaining::Hours(n) => write!(f, "{n} hour(s)"),
            Remaining::LessThanAnHour => f.write_str("less than an hour"),
        }
    }
}

/// Expiration state of a single item at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpirationStatus {
    NoExpiration,
    Active {
        expires_at: ExpiresAt,
        remaining: Remaining,
    },
    Expired {
        expires_at: ExpiresAt,
    },
}

/// Whether the item's expiration has been reached.
///
/// The boundary is inclusive. Items without an expiration never expire.
pub fn is_expired(item: &ContentItem, now: NaiveDateTime) -> bool {
    item.expires_at.is_some_and(|at| at.0 <= now)
}

/// Remaining time label, or `None` when the item has no expiration.
pub fn remaining(item: &ContentItem, now: NaiveDateTime) -> Option<Remaining> {
    item.expires_at.map(|at| Remaining::between(at, now))
}

pub fn status(item: &ContentItem, now: NaiveDateTime) -> ExpirationStatus {
    match item.expires_at {
        None => ExpirationStatus::NoExpiration,
        Some(expires_at) if expires_at.0 <= now => ExpirationStatus::Expired { expires_at },
        Some(expires_at) => ExpirationStatus::Active {
            expires_at,
            remaining: Remaining::between(expires_at, now),
        },
    }
}

/// IDs of published items whose expiration has been reached.
pub fn select_expired<'a, I>(items: I, now: NaiveDateTime) -> BTreeSet<Uuid>
where
    I: IntoIterator<Item = &'a ContentItem>,
{
    items
        .into_iter()
        .filter(|item| item.status.is_published() && is_expired(item, now))
        .map(|item| item.id)
        .collect()
}

/// IDs the sweep should move to draft: [`select_expired`] limited to the
/// managed content type.
pub fn sweep<'a, I>(items: I, managed_type: &str, now: NaiveDateTime) -> BTreeSet<Uuid>
where
    I: IntoIterator<Item = &'a ContentItem>,
{
    select_expired(
        items
            .into_iter()
            .filter(|item| item.item_type == managed_type),
        now,
    )
}

/// Direction of the expiration column sort.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

/// Order two expirations. Items without an expiration sort last in both
/// directions.
pub fn compare_expiration(a: Option<ExpiresAt>, b: Option<ExpiresAt>, order: SortOrder) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => match order {
            SortOrder::Asc => a.cmp(&b),
            SortOrder::Desc => b.cmp(&a),
        },
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Stable sort by expiration.
pub fn sort_by_expiration(items: &mut [ContentItem], order: SortOrder) {
    items.sort_by(|a, b| compare_expiration(a.expires_at, b.expires_at, order));
}
