//! Configuration loaded from environment variables.

use std::collections::HashMap;
use std::env;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use chrono::{FixedOffset, Offset, Utc};
use uuid::Uuid;

use crate::expiration::visibility::validate_redirect_destination;
use crate::expiration::{AccessPolicy, parse_utc_offset};

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port (default: 3000).
    pub port: u16,

    /// PostgreSQL connection URL. When None, the in-memory host is used.
    pub database_url: Option<String>,

    /// Maximum database connections in pool (default: 10).
    pub database_max_connections: u32,

    /// Fixed offset stored expirations are interpreted in (default: -03:00).
    pub site_utc_offset: FixedOffset,

    /// Content type whose items expire (default: post).
    pub expiration_content_type: String,

    /// Response to direct requests for expired items (default: redirect).
    pub expired_access_policy: AccessPolicy,

    /// Redirect target for expired items (default: /).
    pub expired_fallback_url: String,

    /// Run the sweep before serving public requests (default: true).
    pub sweep_on_request: bool,

    /// Recurrence of the expiration check (default: 1 hour).
    pub expiration_check_interval: Duration,

    /// How often the cron loop looks for due hooks (default: 60 seconds).
    pub cron_poll_interval: Duration,

    /// Secret path segment for triggering cron over HTTP.
    pub cron_key: String,

    /// Secret for signing form tokens. When None, a random one is used.
    pub form_secret: Option<Vec<u8>>,

    /// Bearer tokens mapped to editor user IDs (EDITOR_TOKENS=token=uuid,...).
    pub editor_tokens: HashMap<String, Uuid>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .context("PORT must be a valid u16")?;

        let database_url = env::var("DATABASE_URL").ok().filter(|v| !v.is_empty());

        let database_max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .context("DATABASE_MAX_CONNECTIONS must be a valid u32")?;

        let site_utc_offset =
            parse_utc_offset(&env::var("SITE_UTC_OFFSET").unwrap_or_else(|_| "-03:00".to_string()))
                .context("SITE_UTC_OFFSET must be a UTC offset such as -03:00")?;

        let expiration_content_type =
            env::var("EXPIRATION_CONTENT_TYPE").unwrap_or_else(|_| "post".to_string());

        let expired_access_policy = env::var("EXPIRED_ACCESS_POLICY")
            .unwrap_or_else(|_| "redirect".to_string())
            .parse()
            .context("EXPIRED_ACCESS_POLICY must be redirect or not_found")?;

        let expired_fallback_url =
            env::var("EXPIRED_FALLBACK_URL").unwrap_or_else(|_| "/".to_string());
        if !validate_redirect_destination(&expired_fallback_url) {
            bail!("EXPIRED_FALLBACK_URL must be a relative path or an http(s) URL");
        }

        let sweep_on_request = parse_bool(
            &env::var("SWEEP_ON_REQUEST").unwrap_or_else(|_| "true".to_string()),
        )
        .context("SWEEP_ON_REQUEST must be true or false")?;

        let expiration_check_interval = parse_interval_secs(
            &env::var("EXPIRATION_CHECK_INTERVAL_SECS").unwrap_or_else(|_| "3600".to_string()),
        )
        .context("EXPIRATION_CHECK_INTERVAL_SECS must be a positive number of seconds")?;

        let cron_poll_interval = parse_interval_secs(
            &env::var("CRON_POLL_INTERVAL_SECS").unwrap_or_else(|_| "60".to_string()),
        )
        .context("CRON_POLL_INTERVAL_SECS must be a positive number of seconds")?;

        let cron_key = env::var("CRON_KEY").unwrap_or_else(|_| "default-cron-key".to_string());

        let form_secret = env::var("FORM_SECRET")
            .ok()
            .filter(|v| !v.is_empty())
            .map(String::into_bytes);

        let editor_tokens = parse_editor_tokens(&env::var("EDITOR_TOKENS").unwrap_or_default())
            .context("EDITOR_TOKENS must be comma-separated token=uuid pairs")?;

        Ok(Self {
            port,
            database_url,
            database_max_connections,
            site_utc_offset,
            expiration_content_type,
            expired_access_policy,
            expired_fallback_url,
            sweep_on_request,
            expiration_check_interval,
            cron_poll_interval,
            cron_key,
            form_secret,
            editor_tokens,
        })
    }
}

impl Default for Config {
    /// Defaults matching an empty environment, minus randomness.
    fn default() -> Self {
        Self {
            port: 3000,
            database_url: None,
            database_max_connections: 10,
            site_utc_offset: FixedOffset::west_opt(3 * 3600).unwrap_or_else(|| Utc.fix()),
            expiration_content_type: "post".to_string(),
            expired_access_policy: AccessPolicy::Redirect,
            expired_fallback_url: "/".to_string(),
            sweep_on_request: true,
            expiration_check_interval: Duration::from_secs(3600),
            cron_poll_interval: Duration::from_secs(60),
            cron_key: "default-cron-key".to_string(),
            form_secret: None,
            editor_tokens: HashMap::new(),
        }
    }
}

fn parse_bool(raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => bail!("not a boolean: {other:?}"),
    }
}

/// Whole seconds, at least one.
fn parse_interval_secs(raw: &str) -> Result<Duration> {
    let secs: u64 = raw.trim().parse().context("not a whole number of seconds")?;
    if secs == 0 {
        bail!("interval must not be zero");
    }
    Ok(Duration::from_secs(secs))
}

fn parse_editor_tokens(raw: &str) -> Result<HashMap<String, Uuid>> {
    raw.split(',')
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (token, user) = pair
                .split_once('=')
                .with_context(|| format!("missing '=' in {pair:?}"))?;
            let user = user
                .trim()
                .parse::<Uuid>()
                .with_context(|| format!("invalid editor id in {pair:?}"))?;
            Ok((token.trim().to_string(), user))
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn bool_spellings() {
        assert!(parse_bool("TRUE").unwrap());
        assert!(parse_bool("1").unwrap());
        assert!(!parse_bool("off").unwrap());
        assert!(parse_bool("maybe").is_err());
    }

    #[test]
    fn editor_tokens_parse() {
        let id = Uuid::now_v7();
        let tokens = parse_editor_tokens(&format!("abc={id}, ,def = {id}")).unwrap();
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens["abc"], id);
        assert_eq!(tokens["def"], id);

        assert!(parse_editor_tokens("abc").is_err());
        assert!(parse_editor_tokens("abc=not-a-uuid").is_err());
        assert!(parse_editor_tokens("").unwrap().is_empty());
    }

    #[test]
    fn intervals_must_be_positive() {
        assert_eq!(parse_interval_secs("3600").unwrap(), Duration::from_secs(3600));
        assert_eq!(parse_interval_secs(" 60 ").unwrap(), Duration::from_secs(60));
        assert!(parse_interval_secs("0").is_err());
        assert!(parse_interval_secs("-5").is_err());
        assert!(parse_interval_secs("hourly").is_err());
    }

    #[test]
    fn default_offset_is_utc_minus_three() {
        assert_eq!(Config::default().site_utc_offset.local_minus_utc(), -3 * 3600);
    }
}
