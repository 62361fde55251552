//! Individual cron tasks.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

use crate::services::expiration::ExpirationService;

/// A unit of work run when its hook comes due.
#[async_trait]
pub trait CronTask: Send + Sync {
    /// Run the task, returning how many things it changed.
    async fn run(&self) -> Result<u64>;
}

/// Unpublishes expired content.
pub struct ExpirationSweepTask {
    service: Arc<ExpirationService>,
}

impl ExpirationSweepTask {
    pub fn new(service: Arc<ExpirationService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl CronTask for ExpirationSweepTask {
    async fn run(&self) -> Result<u64> {
        let report = self.service.sweep_now().await?;
        if !report.transitioned.is_empty() {
            info!(
                count = report.transitioned.len(),
                examined = report.examined,
                "unpublished expired content"
            );
        }
        Ok(report.transitioned.len() as u64)
    }
}

impl std::fmt::Debug for ExpirationSweepTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExpirationSweepTask").finish()
    }
}
