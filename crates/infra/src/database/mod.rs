//! SQLite persistence: connection manager and port implementations.

mod audit_repository;
mod codes_repository;
mod documents_repository;
mod manager;
mod registry_repository;
mod routes_repository;
mod state_repository;

pub use audit_repository::SqliteAuditTrail;
pub use codes_repository::SqliteCodeListStore;
pub use documents_repository::SqliteDocumentStore;
pub use manager::DbManager;
pub use registry_repository::SqliteRegistryStore;
pub use routes_repository::SqliteRouteTable;
pub use state_repository::SqliteStateRepository;

use etims_domain::{EtimsError, Result};

pub(crate) fn map_sql_error(err: rusqlite::Error) -> EtimsError {
    EtimsError::Database(err.to_string())
}

/// Run a closure on the blocking pool; repositories hold only `Arc`s so the
/// closure can own everything it needs.
pub(crate) async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|err| EtimsError::Internal(format!("blocking task failed: {err}")))?
}
