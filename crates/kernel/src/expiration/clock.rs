//! Site civil time.
//!
//! Expirations are stored as naive civil date+time with no offset. The
//! offset lives in configuration and is applied whenever "now" is needed.

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Duration, FixedOffset, NaiveDateTime, Offset, TimeZone, Utc};

/// Converts between UTC instants and site civil time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SiteClock {
    offset: FixedOffset,
}

impl SiteClock {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Current site civil time.
    pub fn now(&self) -> NaiveDateTime {
        self.civil(Utc::now())
    }

    /// Civil time at the given instant.
    pub fn civil(&self, instant: DateTime<Utc>) -> NaiveDateTime {
        instant.with_timezone(&self.offset).naive_local()
    }

    /// Instant a civil time refers to.
    pub fn instant(&self, civil: NaiveDateTime) -> DateTime<Utc> {
        let utc = civil - Duration::seconds(i64::from(self.offset.local_minus_utc()));
        Utc.from_utc_datetime(&utc)
    }

    /// Human-readable offset, e.g. `UTC-03:00`.
    pub fn label(&self) -> String {
        let secs = self.offset.local_minus_utc();
        let sign = if secs < 0 { '-' } else { '+' };
        let abs = secs.abs();
        format!("UTC{sign}{:02}:{:02}", abs / 3600, (abs % 3600) / 60)
    }
}

impl Default for SiteClock {
    fn default() -> Self {
        Self::new(Utc.fix())
    }
}

/// Parse an operator-supplied UTC offset.
///
/// Accepts `-03:00`, `-0300`, `-3`, optionally prefixed with `UTC` or `GMT`.
/// An empty remainder (`UTC`) is offset zero.
pub fn parse_utc_offset(raw: &str) -> Result<FixedOffset> {
    let trimmed = raw.trim();
    let upper = trimmed.to_ascii_uppercase();
    let rest = upper
        .strip_prefix("UTC")
        .or_else(|| upper.strip_prefix("GMT"))
        .unwrap_or(&upper)
        .trim();

    if rest.is_empty() || rest == "Z" {
        return Ok(Utc.fix());
    }

    let (sign, digits) = if let Some(d) = rest.strip_prefix('-') {
        (-1, d)
    } else {
        (1, rest.strip_prefix('+').unwrap_or(rest))
    };

    let (hours, minutes) = match digits.split_once(':') {
        Some((h, m)) => (h, m),
        None if digits.len() == 4 && digits.is_ascii() => digits.split_at(2),
        None => (digits, "0"),
    };

    let hours = offset_component(hours)
        .with_context(|| format!("invalid hours in UTC offset {trimmed:?}"))?;
    let minutes = offset_component(minutes)
        .with_context(|| format!("invalid minutes in UTC offset {trimmed:?}"))?;
    if hours > 14 || minutes > 59 {
        bail!("UTC offset {trimmed:?} is out of range");
    }

    let secs = i32::try_from(hours * 3600 + minutes * 60)
        .with_context(|| format!("UTC offset {trimmed:?} is out of range"))?;
    FixedOffset::east_opt(sign * secs)
        .with_context(|| format!("UTC offset {trimmed:?} is out of range"))
}

/// Unsigned digits only; the sign is consumed once, up front.
fn offset_component(raw: &str) -> Result<u32> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        bail!("expected digits, got {raw:?}");
    }
    Ok(raw.parse::<u32>()?)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn parses_common_offset_spellings() {
        for raw in ["-03:00", "-0300", "-3", "UTC-3", "utc-03:00", "GMT-3"] {
            assert_eq!(parse_utc_offset(raw).unwrap().local_minus_utc(), -3 * 3600, "{raw}");
        }
        assert_eq!(parse_utc_offset("+05:30").unwrap().local_minus_utc(), 19800);
        assert_eq!(parse_utc_offset("UTC").unwrap().local_minus_utc(), 0);
        assert_eq!(parse_utc_offset("Z").unwrap().local_minus_utc(), 0);
    }

    #[test]
    fn rejects_garbage_offsets() {
        assert!(parse_utc_offset("-25").is_err());
        assert!(parse_utc_offset("+03:75").is_err());
        assert!(parse_utc_offset("brasilia").is_err());
    }

    #[test]
    fn rejects_repeated_signs() {
        for raw in ["+-3", "-+3", "--3", "-03:-30", "-03:+30", "+03:", "-:30"] {
            assert!(parse_utc_offset(raw).is_err(), "{raw}");
        }
    }

    #[test]
    fn civil_and_instant_round_trip() {
        let clock = SiteClock::new(parse_utc_offset("-03:00").unwrap());
        let instant = Utc.with_ymd_and_hms(2024, 1, 1, 13, 0, 0).unwrap();
        let civil = clock.civil(instant);
        assert_eq!(civil.format("%H:%M").to_string(), "10:00");
        assert_eq!(clock.instant(civil), instant);
    }

    #[test]
    fn label_formats_sign_and_minutes() {
        assert_eq!(SiteClock::new(parse_utc_offset("-3").unwrap()).label(), "UTC-03:00");
        assert_eq!(SiteClock::new(parse_utc_offset("+0530").unwrap()).label(), "UTC+05:30");
        assert_eq!(SiteClock::default().label(), "UTC+00:00");
    }
}
