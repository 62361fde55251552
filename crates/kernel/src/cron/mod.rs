//! Scheduled operations and background tasks.
//!
//! Hooks are registered with the host [`Scheduler`], which persists their
//! next run. A poll loop claims due hooks and runs the task registered under
//! each name. A hook runs no more often than its recurrence.

mod tasks;

pub use tasks::{CronTask, ExpirationSweepTask};

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::{Context, Result};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::host::{ScheduledHook, Scheduler};

/// Hook name of the recurring expiration check.
pub const EXPIRATION_CHECK_HOOK: &str = "content_expiration_check";

/// Result of a cron run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CronResult {
    /// Cron ran successfully.
    Completed {
        /// Tasks executed, as `hook: count`.
        tasks_run: Vec<String>,
        /// Duration of the run.
        duration_ms: u64,
    },
    /// A run is already in progress.
    Skipped,
    /// At least one task failed.
    Failed(String),
}

/// Last cron run information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LastCronRun {
    pub timestamp: i64,
    pub hostname: String,
    pub result: String,
}

struct RegisteredTask {
    recurrence: Duration,
    task: Arc<dyn CronTask>,
}

/// Cron service for scheduled operations.
pub struct CronService {
    scheduler: Arc<dyn Scheduler>,
    tasks: HashMap<String, RegisteredTask>,
    running: AtomicBool,
    last_run: Mutex<Option<LastCronRun>>,
}

impl CronService {
    pub fn new(scheduler: Arc<dyn Scheduler>) -> Self {
        Self {
            scheduler,
            tasks: HashMap::new(),
            running: AtomicBool::new(false),
            last_run: Mutex::new(None),
        }
    }

    /// Register a task under a hook name.
    pub fn register(&mut self, hook: &str, recurrence: Duration, task: Arc<dyn CronTask>) {
        self.tasks
            .insert(hook.to_string(), RegisteredTask { recurrence, task });
    }

    /// Registered hook names, sorted.
    pub fn hooks(&self) -> Vec<String> {
        let mut hooks: Vec<String> = self.tasks.keys().cloned().collect();
        hooks.sort();
        hooks
    }

    /// Schedule every registered hook that is not scheduled yet.
    ///
    /// Existing registrations keep their next run, so calling this on every
    /// boot does not reset the clock. New hooks run on the next poll.
    pub async fn activate(&self) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        for hook in self.hooks() {
            let Some(registered) = self.tasks.get(&hook) else {
                continue;
            };
            let existing = self
                .scheduler
                .next_scheduled(&hook)
                .await
                .with_context(|| format!("failed to read schedule for {hook}"))?;
            if existing.is_some() {
                debug!(hook = %hook, "hook already scheduled");
                continue;
            }
            self.scheduler
                .schedule(&hook, now, registered.recurrence)
                .await
                .with_context(|| format!("failed to schedule {hook}"))?;
            info!(
                hook = %hook,
                recurrence_secs = registered.recurrence.as_secs(),
                "scheduled recurring hook"
            );
        }
        Ok(())
    }

    /// Remove every registered hook from the scheduler.
    ///
    /// Returns the hooks that were actually scheduled.
    pub async fn deactivate(&self) -> Result<Vec<String>> {
        let mut cleared = Vec::new();
        for hook in self.hooks() {
            if self
                .scheduler
                .clear(&hook)
                .await
                .with_context(|| format!("failed to clear {hook}"))?
            {
                info!(hook = %hook, "cleared scheduled hook");
                cleared.push(hook);
            }
        }
        Ok(cleared)
    }

    /// Run the tasks whose hooks are due now.
    pub async fn tick(&self) -> CronResult {
        let now = chrono::Utc::now().timestamp();
        let due = match self.scheduler.claim_due(now).await {
            Ok(due) => due,
            Err(e) => {
                warn!(error = %e, "failed to claim due hooks");
                return self.record(CronResult::Failed(e.to_string()));
            }
        };
        if due.is_empty() {
            return CronResult::Completed {
                tasks_run: Vec::new(),
                duration_ms: 0,
            };
        }
        self.execute(&due).await
    }

    /// Run every registered task immediately, ignoring the schedule.
    pub async fn run(&self) -> CronResult {
        let hooks = self.hooks();
        self.execute(&hooks).await
    }

    async fn execute(&self, hooks: &[String]) -> CronResult {
        if self.running.swap(true, Ordering::AcqRel) {
            debug!("cron run already in progress, skipping");
            return CronResult::Skipped;
        }
        let _running = RunGuard(&self.running);

        let start = std::time::Instant::now();
        let mut tasks_run = Vec::new();
        let mut failures = Vec::new();

        for hook in hooks {
            let Some(registered) = self.tasks.get(hook) else {
                debug!(hook = %hook, "no task registered for due hook");
                continue;
            };
            match registered.task.run().await {
                Ok(count) => tasks_run.push(format!("{hook}: {count}")),
                Err(e) => {
                    warn!(hook = %hook, error = %format!("{e:#}"), "cron task failed");
                    failures.push(format!("{hook}: {e:#}"));
                }
            }
        }

        let duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
        let result = if failures.is_empty() {
            info!(duration_ms = duration_ms, tasks = ?tasks_run, "cron completed");
            CronResult::Completed {
                tasks_run,
                duration_ms,
            }
        } else {
            CronResult::Failed(failures.join("; "))
        };
        self.record(result)
    }

    fn record(&self, result: CronResult) -> CronResult {
        *self.last_run.lock() = Some(LastCronRun {
            timestamp: chrono::Utc::now().timestamp(),
            hostname: hostname(),
            result: format!("{result:?}"),
        });
        result
    }

    /// Get the last cron run status.
    pub fn last_run(&self) -> Option<LastCronRun> {
        self.last_run.lock().clone()
    }

    /// Current schedule of every registered hook.
    pub async fn schedule(&self) -> Result<Vec<ScheduledHook>> {
        let mut scheduled = Vec::new();
        for hook in self.hooks() {
            if let Some(entry) = self.scheduler.next_scheduled(&hook).await? {
                scheduled.push(entry);
            }
        }
        Ok(scheduled)
    }

    /// Poll for due hooks until cancelled.
    pub async fn run_loop(self: Arc<Self>, poll: Duration, cancel: CancellationToken) {
        // tokio panics on a zero period.
        let poll = poll.max(Duration::from_secs(1));
        let mut interval = tokio::time::interval(poll);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        info!(poll_secs = poll.as_secs(), "cron loop started");

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let CronResult::Failed(message) = self.tick().await {
                        warn!(error = %message, "scheduled cron run failed");
                    }
                }
                () = cancel.cancelled() => {
                    debug!("cron loop stopping");
                    break;
                }
            }
        }
    }
}

/// Clears the in-progress flag when a run ends, including by panic.
struct RunGuard<'a>(&'a AtomicBool);

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Get hostname for run reporting.
fn hostname() -> String {
    hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string())
}

impl std::fmt::Debug for CronService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CronService")
            .field("hooks", &self.hooks())
            .finish()
    }
}

#[cfg(test)]
// Tests are allowed to use unwrap/expect freely.
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::host::MemoryHost;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicU64;

    #[derive(Default)]
    struct Counting {
        runs: AtomicU64,
    }

    #[async_trait]
    impl CronTask for Counting {
        async fn run(&self) -> Result<u64> {
            Ok(self.runs.fetch_add(1, Ordering::SeqCst) + 1)
        }
    }

    struct Failing;

    #[async_trait]
    impl CronTask for Failing {
        async fn run(&self) -> Result<u64> {
            anyhow::bail!("storage unavailable")
        }
    }

    #[derive(Default)]
    struct PanicsOnce {
        panicked: AtomicBool,
    }

    #[async_trait]
    impl CronTask for PanicsOnce {
        async fn run(&self) -> Result<u64> {
            if !self.panicked.swap(true, Ordering::SeqCst) {
                panic!("task blew up");
            }
            Ok(0)
        }
    }

    #[test]
    fn test_hostname() {
        let h = hostname();
        assert!(!h.is_empty());
    }

    #[tokio::test]
    async fn activate_is_idempotent_and_runs_once_per_recurrence() {
        let host = Arc::new(MemoryHost::new());
        let task = Arc::new(Counting::default());
        let mut cron = CronService::new(host.clone());
        cron.register("check", Duration::from_secs(3600), task.clone());

        cron.activate().await.unwrap();
        let first = host.next_scheduled("check").await.unwrap().unwrap();
        cron.activate().await.unwrap();
        assert_eq!(host.next_scheduled("check").await.unwrap().unwrap(), first);

        assert!(matches!(cron.tick().await, CronResult::Completed { .. }));
        assert_eq!(task.runs.load(Ordering::SeqCst), 1);

        // Not due again until an hour has passed.
        cron.tick().await;
        assert_eq!(task.runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn deactivate_clears_hooks() {
        let host = Arc::new(MemoryHost::new());
        let mut cron = CronService::new(host.clone());
        cron.register("check", Duration::from_secs(60), Arc::new(Counting::default()));
        cron.activate().await.unwrap();

        assert_eq!(cron.deactivate().await.unwrap(), vec!["check".to_string()]);
        assert!(cron.deactivate().await.unwrap().is_empty());
        assert!(cron.schedule().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn task_failure_is_reported() {
        let host = Arc::new(MemoryHost::new());
        let mut cron = CronService::new(host);
        cron.register("broken", Duration::from_secs(60), Arc::new(Failing));

        let result = cron.run().await;
        assert!(matches!(&result, CronResult::Failed(m) if m.contains("storage unavailable")));
        assert!(cron.last_run().unwrap().result.contains("Failed"));
    }

    #[tokio::test]
    async fn panicking_task_does_not_wedge_later_runs() {
        let mut cron = CronService::new(Arc::new(MemoryHost::new()));
        cron.register("flaky", Duration::from_secs(60), Arc::new(PanicsOnce::default()));
        let cron = Arc::new(cron);

        let first = tokio::spawn({
            let cron = cron.clone();
            async move { cron.run().await }
        })
        .await;
        assert!(first.unwrap_err().is_panic());

        assert!(matches!(cron.run().await, CronResult::Completed { .. }));
    }

    #[tokio::test]
    async fn zero_poll_interval_does_not_panic() {
        let mut cron = CronService::new(Arc::new(MemoryHost::new()));
        cron.register("check", Duration::from_secs(60), Arc::new(Counting::default()));
        let cancel = CancellationToken::new();

        let handle = tokio::spawn(Arc::new(cron).run_loop(Duration::ZERO, cancel.clone()));
        tokio::task::yield_now().await;
        cancel.cancel();
        assert!(handle.await.is_ok());
    }

    #[test]
    fn test_last_cron_run_serde() {
        let run = LastCronRun {
            timestamp: 1234567890,
            hostname: "test-host".to_string(),
            result: "Completed".to_string(),
        };

        let json = serde_json::to_string(&run).unwrap();
        let parsed: LastCronRun = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.hostname, "test-host");
    }
}
