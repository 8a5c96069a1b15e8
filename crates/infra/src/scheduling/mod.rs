//! Cron-driven background passes: backlog resend and reference-data refresh.

mod error;
mod refresh_scheduler;
mod resend_scheduler;

pub use error::{SchedulerError, SchedulerResult};
pub use refresh_scheduler::{RefreshScheduler, RefreshSchedulerConfig};
pub use resend_scheduler::{ResendScheduler, ResendSchedulerConfig};
