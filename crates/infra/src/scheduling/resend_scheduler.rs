//! Hourly resend pass over the staged submission backlog.
//!
//! Transport failures and restarts leave documents staged but unsubmitted;
//! this scheduler walks that backlog on a cron interval and replays each
//! document through the normal submission path. Join handles are tracked,
//! cancellation is explicit and every asynchronous operation is wrapped in a
//! timeout.

use std::sync::Arc;
use std::time::{Duration, Instant};

use etims_core::SubmissionService;
use tokio::task::JoinHandle;
use tokio_cron_scheduler::{Job, JobScheduler};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use super::error::{SchedulerError, SchedulerResult};

/// Configuration for the resend scheduler.
#[derive(Debug, Clone)]
pub struct ResendSchedulerConfig {
    /// Cron expression describing the execution schedule.
    pub cron_expression: String,
    /// Timeout applied to a single resend pass.
    pub job_timeout: Duration,
    /// Timeout for starting the underlying scheduler.
    pub start_timeout: Duration,
    /// Timeout for stopping the scheduler.
    pub stop_timeout: Duration,
    /// Timeout for awaiting the monitor task join handle.
    pub join_timeout: Duration,
}

impl Default for ResendSchedulerConfig {
    fn default() -> Self {
        Self {
            cron_expression: "0 0 * * * *".into(), // hourly
            job_timeout: Duration::from_secs(600),
            start_timeout: Duration::from_secs(5),
            stop_timeout: Duration::from_secs(5),
            join_timeout: Duration::from_secs(5),
        }
    }
}

/// Backlog resend scheduler with explicit lifecycle management.
pub struct ResendScheduler {
    scheduler: Option<JobScheduler>,
    config: ResendSchedulerConfig,
    monitor_handle: Option<JoinHandle<()>>,
    cancellation: CancellationToken,
    service: Arc<SubmissionService>,
}

impl ResendScheduler {
    pub fn new(service: Arc<SubmissionService>) -> Self {
        Self::with_config(ResendSchedulerConfig::default(), service)
    }

    pub fn with_config(config: ResendSchedulerConfig, service: Arc<SubmissionService>) -> Self {
        Self {
            scheduler: None,
            config,
            monitor_handle: None,
            cancellation: CancellationToken::new(),
            service,
        }
    }

    /// Start the scheduler, spawning the monitoring task.
    #[instrument(skip(self))]
    pub async fn start(&mut self) -> SchedulerResult<()> {
        if self.is_running() {
            return Err(SchedulerError::AlreadyRunning);
        }

        self.cancellation = CancellationToken::new();

        let scheduler_instance = self.build_scheduler().await?;
        let start_timeout = self.config.start_timeout;

        tokio::time::timeout(start_timeout, scheduler_instance.start())
            .await
            .map_err(|source| SchedulerError::Timeout { duration: start_timeout, source })?
            .map_err(|source| SchedulerError::StartFailed { source })?;

        self.scheduler = Some(scheduler_instance);

        let cancel = self.cancellation.clone();
        let handle = tokio::spawn(async move {
            Self::monitor_task(cancel).await;
        });

        self.monitor_handle = Some(handle);
        info!(scheduler = "resend", event = "start", "resend scheduler started");
        Ok(())
    }

    /// Stop the scheduler and wait for the monitor task to finish.
    #[instrument(skip(self))]
    pub async fn stop(&mut self) -> SchedulerResult<()> {
        if !self.is_running() {
            return Err(SchedulerError::NotRunning);
        }

        self.cancellation.cancel();

        let mut scheduler = match self.scheduler.take() {
            Some(scheduler) => scheduler,
            None => return Err(SchedulerError::NotRunning),
        };

        let stop_timeout = self.config.stop_timeout;
        tokio::time::timeout(stop_timeout, async move { scheduler.shutdown().await })
            .await
            .map_err(|source| SchedulerError::Timeout { duration: stop_timeout, source })?
            .map_err(|source| SchedulerError::StopFailed { source })?;

        if let Some(handle) = self.monitor_handle.take() {
            let join_timeout = self.config.join_timeout;
            tokio::time::timeout(join_timeout, handle)
                .await
                .map_err(|source| SchedulerError::Timeout { duration: join_timeout, source })?
                .map_err(|source| SchedulerError::TaskJoinFailed { source })?;
        }

        info!(scheduler = "resend", event = "stop", "resend scheduler stopped");
        self.cancellation = CancellationToken::new();
        Ok(())
    }

    /// Returns true when a scheduler instance is active.
    pub fn is_running(&self) -> bool {
        self.scheduler.is_some()
    }

    async fn build_scheduler(&self) -> SchedulerResult<JobScheduler> {
        let scheduler =
            JobScheduler::new().await.map_err(|source| SchedulerError::CreationFailed { source })?;
        let cron_expr = self.config.cron_expression.clone();
        let service = self.service.clone();
        let job_timeout = self.config.job_timeout;

        let job_definition = Job::new_async(cron_expr.as_str(), move |_id, _lock| {
            let service = service.clone();

            Box::pin(async move {
                let started = Instant::now();
                match tokio::time::timeout(job_timeout, service.resend_pending()).await {
                    Ok(Ok(report)) => {
                        debug!(
                            scheduler = "resend",
                            event = "job_complete",
                            attempted = report.attempted,
                            accepted = report.accepted,
                            rejected = report.rejected,
                            failed = report.failed,
                            elapsed_ms = started.elapsed().as_millis() as u64,
                            "resend pass finished"
                        );
                    }
                    Ok(Err(err)) => {
                        error!(scheduler = "resend", error = ?err, "resend pass failed");
                    }
                    Err(_) => {
                        warn!(
                            scheduler = "resend",
                            event = "job_timeout",
                            timeout_secs = job_timeout.as_secs(),
                            "resend pass timed out"
                        );
                    }
                }
            })
        })
        .map_err(|source| SchedulerError::JobRegistrationFailed { source })?;

        let job_id = job_definition.guid();
        scheduler
            .add(job_definition)
            .await
            .map_err(|source| SchedulerError::JobRegistrationFailed { source })?;

        debug!(cron = %self.config.cron_expression, job_id = %job_id, "registered resend job");
        Ok(scheduler)
    }

    async fn monitor_task(cancel: CancellationToken) {
        cancel.cancelled().await;
        debug!(scheduler = "resend", event = "monitor_cancelled", "resend monitor cancelled");
    }
}

impl Drop for ResendScheduler {
    fn drop(&mut self) {
        if self.is_running() {
            warn!(
                scheduler = "resend",
                event = "drop_cancel",
                "ResendScheduler dropped while running; cancelling tasks"
            );
            self.cancellation.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use etims_core::SubmissionService;
    use etims_domain::config::{ConnectorConfig, DatabaseConfig, Environment};
    use tempfile::TempDir;

    use super::*;
    use crate::database::{
        DbManager, SqliteAuditTrail, SqliteCodeListStore, SqliteDocumentStore,
        SqliteRegistryStore, SqliteRouteTable, SqliteStateRepository,
    };
    use crate::http::EtimsGateway;

    fn fast_config() -> ResendSchedulerConfig {
        ResendSchedulerConfig {
            cron_expression: "*/1 * * * * *".into(), // every second
            job_timeout: Duration::from_secs(2),
            start_timeout: Duration::from_secs(2),
            stop_timeout: Duration::from_secs(2),
            join_timeout: Duration::from_secs(2),
        }
    }

    async fn service(temp_dir: &TempDir) -> Arc<SubmissionService> {
        let db = Arc::new(DbManager::new(temp_dir.path().join("state.db"), 2).unwrap());
        db.run_migrations().unwrap();
        let routes = SqliteRouteTable::new(db.clone());
        routes.seed_defaults().await.unwrap();

        let config = ConnectorConfig {
            company: "Acme Traders".into(),
            tin: "A123456789B".into(),
            branch_id: "00".into(),
            device_serial: "DVC-1".into(),
            environment: Environment::Sandbox,
            server_url: Some("http://127.0.0.1:9".into()),
            request_timeout_secs: 1,
            database: DatabaseConfig {
                path: temp_dir.path().join("state.db").display().to_string(),
                pool_size: 2,
            },
        };
        Arc::new(
            SubmissionService::new(
                config,
                Arc::new(EtimsGateway::with_timeout(Duration::from_secs(1)).unwrap()),
                Arc::new(SqliteAuditTrail::new(db.clone())),
                Arc::new(SqliteStateRepository::new(db.clone())),
                Arc::new(routes),
                Arc::new(SqliteDocumentStore::new(db.clone())),
                Arc::new(SqliteCodeListStore::new(db.clone())),
                Arc::new(SqliteRegistryStore::new(db)),
            )
            .unwrap(),
        )
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn lifecycle_runs_successfully() {
        let temp_dir = TempDir::new().unwrap();
        let mut scheduler = ResendScheduler::with_config(fast_config(), service(&temp_dir).await);

        scheduler.start().await.expect("start succeeds");
        tokio::time::sleep(Duration::from_secs(2)).await;
        scheduler.stop().await.expect("stop succeeds");

        assert!(!scheduler.is_running());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn double_start_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let mut scheduler = ResendScheduler::with_config(fast_config(), service(&temp_dir).await);

        scheduler.start().await.expect("first start");
        let err = scheduler.start().await.expect_err("second start fails");
        assert!(matches!(err, SchedulerError::AlreadyRunning));
        scheduler.stop().await.expect("stop succeeds");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn restart_after_stop_succeeds() {
        let temp_dir = TempDir::new().unwrap();
        let mut scheduler = ResendScheduler::with_config(fast_config(), service(&temp_dir).await);

        scheduler.start().await.expect("start succeeds");
        scheduler.stop().await.expect("stop succeeds");
        assert!(!scheduler.is_running());

        scheduler.start().await.expect("start again");
        scheduler.stop().await.expect("stop again");
    }
}
