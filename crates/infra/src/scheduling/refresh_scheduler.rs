//! Monthly refresh of provider reference data.
//!
//! Pulls the shared code lists, item classifications and published notices on
//! a cron interval so payload validation works against current codes. Same
//! lifecycle discipline as the resend scheduler: tracked join handle, explicit
//! cancellation, timeouts around every await.

use std::sync::Arc;
use std::time::Duration;

use etims_core::SubmissionService;
use tokio::task::JoinHandle;
use tokio_cron_scheduler::{Job, JobScheduler};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::error::{SchedulerError, SchedulerResult};

/// Configuration for the reference-data refresh scheduler.
#[derive(Debug, Clone)]
pub struct RefreshSchedulerConfig {
    /// Cron expression describing the execution schedule.
    pub cron_expression: String,
    /// Timeout applied to a single refresh pass.
    pub job_timeout: Duration,
    /// Timeout for starting the underlying scheduler.
    pub start_timeout: Duration,
    /// Timeout for stopping the scheduler.
    pub stop_timeout: Duration,
    /// Timeout for awaiting the monitor task join handle.
    pub join_timeout: Duration,
}

impl Default for RefreshSchedulerConfig {
    fn default() -> Self {
        Self {
            cron_expression: "0 0 0 1 * *".into(), // first of the month, midnight
            job_timeout: Duration::from_secs(600),
            start_timeout: Duration::from_secs(5),
            stop_timeout: Duration::from_secs(5),
            join_timeout: Duration::from_secs(5),
        }
    }
}

/// Reference-data refresh scheduler with explicit lifecycle management.
pub struct RefreshScheduler {
    scheduler: Option<JobScheduler>,
    config: RefreshSchedulerConfig,
    monitor_handle: Option<JoinHandle<()>>,
    cancellation: CancellationToken,
    service: Arc<SubmissionService>,
}

impl RefreshScheduler {
    pub fn new(service: Arc<SubmissionService>) -> Self {
        Self::with_config(RefreshSchedulerConfig::default(), service)
    }

    pub fn with_config(config: RefreshSchedulerConfig, service: Arc<SubmissionService>) -> Self {
        Self {
            scheduler: None,
            config,
            monitor_handle: None,
            cancellation: CancellationToken::new(),
            service,
        }
    }

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
            cancel.cancelled().await;
            debug!(scheduler = "refresh", event = "monitor_cancelled", "refresh monitor cancelled");
        });

        self.monitor_handle = Some(handle);
        info!(scheduler = "refresh", event = "start", "refresh scheduler started");
        Ok(())
    }

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

        info!(scheduler = "refresh", event = "stop", "refresh scheduler stopped");
        self.cancellation = CancellationToken::new();
        Ok(())
    }

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
                match tokio::time::timeout(job_timeout, Self::refresh_pass(service)).await {
                    Ok(()) => {}
                    Err(_) => {
                        warn!(
                            scheduler = "refresh",
                            event = "job_timeout",
                            timeout_secs = job_timeout.as_secs(),
                            "refresh pass timed out"
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

        debug!(cron = %self.config.cron_expression, job_id = %job_id, "registered refresh job");
        Ok(scheduler)
    }

    /// One refresh: code lists, item classifications, then notices. Failures
    /// are logged and the pass moves on; next month's run retries.
    async fn refresh_pass(service: Arc<SubmissionService>) {
        if let Err(err) = service.refresh_code_lists().await {
            warn!(scheduler = "refresh", error = ?err, "code list refresh failed");
        }
        if let Err(err) = service.perform_notice_search().await {
            warn!(scheduler = "refresh", error = ?err, "notice search failed");
        }
        debug!(scheduler = "refresh", event = "job_complete", "refresh pass finished");
    }
}

impl Drop for RefreshScheduler {
    fn drop(&mut self) {
        if self.is_running() {
            warn!(
                scheduler = "refresh",
                event = "drop_cancel",
                "RefreshScheduler dropped while running; cancelling tasks"
            );
            self.cancellation.cancel();
        }
    }
}
