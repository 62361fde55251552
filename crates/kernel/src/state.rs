//! Application state shared across all handlers.

use std::sync::Arc;

use anyhow::{Context, Result};
use sqlx::PgPool;
use tracing::{info, warn};

use crate::config::Config;
use crate::cron::{CronService, EXPIRATION_CHECK_HOOK, ExpirationSweepTask};
use crate::db;
use crate::expiration::SiteClock;
use crate::form::ActionTokens;
use crate::host::{HostServices, MemoryHost, PgHost};
use crate::services::expiration::{ExpirationService, ExpirationSettings};
use crate::theme::ThemeEngine;

/// Shared application state.
///
/// Wrapped in Arc internally so Clone is cheap.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Loaded configuration.
    config: Config,

    /// PostgreSQL pool, when running on the Postgres host.
    db: Option<PgPool>,

    /// Host collaborators.
    host: HostServices,

    /// Expiration service.
    expiration: Arc<ExpirationService>,

    /// Cron service for scheduled operations.
    cron: Arc<CronService>,

    /// Theme engine for template rendering.
    theme: Arc<ThemeEngine>,
}

impl AppState {
    /// Create application state from configuration.
    ///
    /// Uses the Postgres host (running migrations) when `DATABASE_URL` is
    /// set, otherwise an empty in-memory host.
    pub async fn new(config: &Config) -> Result<Self> {
        match config.database_url {
            Some(_) => {
                let pool = db::create_pool(config)
                    .await
                    .context("failed to create database pool")?;
                let host = PgHost::new(pool.clone());
                host.migrate().await.context("failed to run migrations")?;
                info!("using PostgreSQL host");
                Self::with_host(config, HostServices::from_adapter(Arc::new(host)), Some(pool))
            }
            None => {
                warn!("DATABASE_URL not set, content is kept in memory only");
                Self::with_host(
                    config,
                    HostServices::from_adapter(Arc::new(MemoryHost::new())),
                    None,
                )
            }
        }
    }

    /// Create application state over the given host collaborators.
    pub fn with_host(config: &Config, host: HostServices, db: Option<PgPool>) -> Result<Self> {
        let tokens = match &config.form_secret {
            Some(secret) => ActionTokens::new(secret.clone()),
            None => {
                warn!("FORM_SECRET not set, form tokens will not survive a restart");
                ActionTokens::random()
            }
        };

        let expiration = Arc::new(ExpirationService::new(
            host.clone(),
            SiteClock::new(config.site_utc_offset),
            ExpirationSettings::from_config(config),
            tokens,
        ));

        let mut cron = CronService::new(host.scheduler.clone());
        cron.register(
            EXPIRATION_CHECK_HOOK,
            config.expiration_check_interval,
            Arc::new(ExpirationSweepTask::new(expiration.clone())),
        );

        let theme = Arc::new(ThemeEngine::new().context("failed to load templates")?);

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config: config.clone(),
                db,
                host,
                expiration,
                cron: Arc::new(cron),
                theme,
            }),
        })
    }

    /// Get the configuration.
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Get the database pool, if any.
    pub fn db(&self) -> Option<&PgPool> {
        self.inner.db.as_ref()
    }

    /// Get the host collaborators.
    pub fn host(&self) -> &HostServices {
        &self.inner.host
    }

    /// Get the expiration service.
    pub fn expiration(&self) -> &Arc<ExpirationService> {
        &self.inner.expiration
    }

    /// Get the cron service.
    pub fn cron(&self) -> &Arc<CronService> {
        &self.inner.cron
    }

    /// Get the theme engine.
    pub fn theme(&self) -> &Arc<ThemeEngine> {
        &self.inner.theme
    }

    /// Check database health. Always healthy on the in-memory host.
    pub async fn db_healthy(&self) -> bool {
        match &self.inner.db {
            Some(pool) => db::check_health(pool).await,
            None => true,
        }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("expiration", &self.inner.expiration)
            .field("cron", &self.inner.cron)
            .field("database", &self.inner.db.is_some())
            .finish()
    }
}
