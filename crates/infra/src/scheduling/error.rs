//! Scheduler error types.

use std::time::Duration;

use etims_domain::EtimsError;
use thiserror::Error;
use tokio::task::JoinError;
use tokio::time::error::Elapsed;
use tokio_cron_scheduler::JobSchedulerError;

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("scheduler already running")]
    AlreadyRunning,

    #[error("scheduler not running")]
    NotRunning,

    #[error("failed to create scheduler")]
    CreationFailed {
        #[source]
        source: JobSchedulerError,
    },

    #[error("failed to start scheduler")]
    StartFailed {
        #[source]
        source: JobSchedulerError,
    },

    #[error("failed to stop scheduler")]
    StopFailed {
        #[source]
        source: JobSchedulerError,
    },

    #[error("failed to register job")]
    JobRegistrationFailed {
        #[source]
        source: JobSchedulerError,
    },

    #[error("operation timed out after {duration:?}")]
    Timeout {
        duration: Duration,
        #[source]
        source: Elapsed,
    },

    #[error("task join failed")]
    TaskJoinFailed {
        #[source]
        source: JoinError,
    },
}

impl From<SchedulerError> for EtimsError {
    fn from(err: SchedulerError) -> Self {
        match err {
            SchedulerError::AlreadyRunning | SchedulerError::NotRunning => {
                EtimsError::InvalidInput(err.to_string())
            }
            _ => EtimsError::Internal(err.to_string()),
        }
    }
}

pub type SchedulerResult<T> = Result<T, SchedulerError>;
