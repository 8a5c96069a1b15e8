//! # eTIMS Infra
//!
//! Infrastructure adapters for the connector:
//! - HTTP gateway to the provider (reqwest)
//! - SQLite-backed state, audit, route, document and registry repositories
//! - Cron schedulers for the resend and refresh passes
//! - TOML configuration loading

pub mod config;
pub mod database;
pub mod http;
pub mod scheduling;

pub use config::load_config;
pub use database::{
    DbManager, SqliteAuditTrail, SqliteCodeListStore, SqliteDocumentStore, SqliteRegistryStore,
    SqliteRouteTable, SqliteStateRepository,
};
pub use http::{EtimsGateway, HttpClient};
pub use scheduling::{RefreshScheduler, RefreshSchedulerConfig, ResendScheduler, ResendSchedulerConfig};
