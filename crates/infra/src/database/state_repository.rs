//! Per-scope device state: sales sequence, session key, request cursors.

use std::sync::Arc;

use async_trait::async_trait;
use etims_core::EtimsState;
use etims_domain::constants::EPOCH_REQUEST_DATE;
use etims_domain::types::SequenceScope;
use etims_domain::Result;
use rusqlite::{params, OptionalExtension};

use super::manager::{DbConnection, DbManager};
use super::{blocking, map_sql_error};

const ENSURE_SCOPE_SQL: &str = "INSERT OR IGNORE INTO device_state
    (tin, branch_id, environment) VALUES (?1, ?2, ?3)";

const SELECT_SEQUENCE_SQL: &str = "SELECT most_recent_sales_sequence FROM device_state
    WHERE tin = ?1 AND branch_id = ?2 AND environment = ?3";

// The `<` predicate keeps the stored sequence monotonic even if commits
// arrive out of order.
const COMMIT_SEQUENCE_SQL: &str = "UPDATE device_state
    SET most_recent_sales_sequence = ?4, updated_at = datetime('now')
    WHERE tin = ?1 AND branch_id = ?2 AND environment = ?3
      AND most_recent_sales_sequence < ?4";

const SELECT_KEY_SQL: &str = "SELECT session_key FROM device_state
    WHERE tin = ?1 AND branch_id = ?2 AND environment = ?3";

const STORE_KEY_SQL: &str = "UPDATE device_state
    SET session_key = ?4, updated_at = datetime('now')
    WHERE tin = ?1 AND branch_id = ?2 AND environment = ?3";

const SELECT_CURSOR_SQL: &str = "SELECT last_request_date FROM request_cursors
    WHERE tin = ?1 AND branch_id = ?2 AND environment = ?3 AND operation = ?4";

// Cursor values are wire datetimes (YYYYMMDDHHMMSS), so lexicographic
// comparison is chronological; the upsert never moves a cursor backwards.
const ADVANCE_CURSOR_SQL: &str = "INSERT INTO request_cursors
    (tin, branch_id, environment, operation, last_request_date)
    VALUES (?1, ?2, ?3, ?4, ?5)
    ON CONFLICT (tin, branch_id, environment, operation) DO UPDATE SET
        last_request_date = excluded.last_request_date
    WHERE excluded.last_request_date > request_cursors.last_request_date";

pub struct SqliteStateRepository {
    db: Arc<DbManager>,
}

impl SqliteStateRepository {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }

    fn ensure_scope(conn: &DbConnection, scope: &SequenceScope) -> Result<()> {
        conn.execute(
            ENSURE_SCOPE_SQL,
            params![scope.tin, scope.branch_id, scope.environment.as_str()],
        )
        .map_err(map_sql_error)?;
        Ok(())
    }
}

#[async_trait]
impl EtimsState for SqliteStateRepository {
    async fn most_recent_sales_sequence(&self, scope: &SequenceScope) -> Result<i64> {
        let db = Arc::clone(&self.db);
        let scope = scope.clone();
        blocking(move || {
            let conn = db.get_connection()?;
            Self::ensure_scope(&conn, &scope)?;
            conn.query_row(
                SELECT_SEQUENCE_SQL,
                params![scope.tin, scope.branch_id, scope.environment.as_str()],
                |row| row.get(0),
            )
            .map_err(map_sql_error)
        })
        .await
    }

    async fn commit_sales_sequence(&self, scope: &SequenceScope, sequence: i64) -> Result<()> {
        let db = Arc::clone(&self.db);
        let scope = scope.clone();
        blocking(move || {
            let conn = db.get_connection()?;
            Self::ensure_scope(&conn, &scope)?;
            conn.execute(
                COMMIT_SEQUENCE_SQL,
                params![scope.tin, scope.branch_id, scope.environment.as_str(), sequence],
            )
            .map_err(map_sql_error)?;
            Ok(())
        })
        .await
    }

    async fn session_key(&self, scope: &SequenceScope) -> Result<Option<String>> {
        let db = Arc::clone(&self.db);
        let scope = scope.clone();
        blocking(move || {
            let conn = db.get_connection()?;
            let key: Option<Option<String>> = conn
                .query_row(
                    SELECT_KEY_SQL,
                    params![scope.tin, scope.branch_id, scope.environment.as_str()],
                    |row| row.get(0),
                )
                .optional()
                .map_err(map_sql_error)?;
            Ok(key.flatten())
        })
        .await
    }

    async fn store_session_key(&self, scope: &SequenceScope, key: &str) -> Result<()> {
        let db = Arc::clone(&self.db);
        let scope = scope.clone();
        let key = key.to_string();
        blocking(move || {
            let conn = db.get_connection()?;
            Self::ensure_scope(&conn, &scope)?;
            conn.execute(
                STORE_KEY_SQL,
                params![scope.tin, scope.branch_id, scope.environment.as_str(), key],
            )
            .map_err(map_sql_error)?;
            Ok(())
        })
        .await
    }

    async fn last_request_date(&self, scope: &SequenceScope, operation: &str) -> Result<String> {
        let db = Arc::clone(&self.db);
        let scope = scope.clone();
        let operation = operation.to_string();
        blocking(move || {
            let conn = db.get_connection()?;
            let cursor: Option<String> = conn
                .query_row(
                    SELECT_CURSOR_SQL,
                    params![scope.tin, scope.branch_id, scope.environment.as_str(), operation],
                    |row| row.get(0),
                )
                .optional()
                .map_err(map_sql_error)?;
            Ok(cursor.unwrap_or_else(|| EPOCH_REQUEST_DATE.to_string()))
        })
        .await
    }

    async fn advance_last_request_date(
        &self,
        scope: &SequenceScope,
        operation: &str,
        result_dt: &str,
    ) -> Result<()> {
        let db = Arc::clone(&self.db);
        let scope = scope.clone();
        let operation = operation.to_string();
        let result_dt = result_dt.to_string();
        blocking(move || {
            let conn = db.get_connection()?;
            conn.execute(
                ADVANCE_CURSOR_SQL,
                params![scope.tin, scope.branch_id, scope.environment.as_str(), operation, result_dt],
            )
            .map_err(map_sql_error)?;
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use etims_domain::config::Environment;
    use tempfile::TempDir;

    use super::*;

    async fn repository() -> (TempDir, SqliteStateRepository) {
        let temp_dir = TempDir::new().unwrap();
        let db = Arc::new(DbManager::new(temp_dir.path().join("state.db"), 2).unwrap());
        db.run_migrations().unwrap();
        (temp_dir, SqliteStateRepository::new(db))
    }

    fn scope() -> SequenceScope {
        SequenceScope::new("A123456789B", "00", Environment::Sandbox)
    }

    #[tokio::test]
    async fn fresh_scope_starts_at_zero() {
        let (_dir, state) = repository().await;
        assert_eq!(state.most_recent_sales_sequence(&scope()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn sequence_commits_are_monotonic() {
        let (_dir, state) = repository().await;
        let scope = scope();

        state.commit_sales_sequence(&scope, 41).await.unwrap();
        assert_eq!(state.most_recent_sales_sequence(&scope).await.unwrap(), 41);

        state.commit_sales_sequence(&scope, 17).await.unwrap();
        assert_eq!(state.most_recent_sales_sequence(&scope).await.unwrap(), 41);

        state.commit_sales_sequence(&scope, 42).await.unwrap();
        assert_eq!(state.most_recent_sales_sequence(&scope).await.unwrap(), 42);
    }

    #[tokio::test]
    async fn scopes_are_independent() {
        let (_dir, state) = repository().await;
        let first = scope();
        let second = SequenceScope::new("A123456789B", "01", Environment::Sandbox);

        state.commit_sales_sequence(&first, 10).await.unwrap();
        assert_eq!(state.most_recent_sales_sequence(&second).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn session_key_round_trips() {
        let (_dir, state) = repository().await;
        let scope = scope();

        assert!(state.session_key(&scope).await.unwrap().is_none());
        state.store_session_key(&scope, "CMC-KEY-1").await.unwrap();
        assert_eq!(state.session_key(&scope).await.unwrap().as_deref(), Some("CMC-KEY-1"));
    }

    #[tokio::test]
    async fn cursor_defaults_to_epoch_and_never_regresses() {
        let (_dir, state) = repository().await;
        let scope = scope();

        assert_eq!(
            state.last_request_date(&scope, "CodeSearchReq").await.unwrap(),
            EPOCH_REQUEST_DATE
        );

        state.advance_last_request_date(&scope, "CodeSearchReq", "20260827120000").await.unwrap();
        assert_eq!(
            state.last_request_date(&scope, "CodeSearchReq").await.unwrap(),
            "20260827120000"
        );

        state.advance_last_request_date(&scope, "CodeSearchReq", "20250101000000").await.unwrap();
        assert_eq!(
            state.last_request_date(&scope, "CodeSearchReq").await.unwrap(),
            "20260827120000"
        );

        // Other operations keep their own cursor.
        assert_eq!(
            state.last_request_date(&scope, "NoticeSearchReq").await.unwrap(),
            EPOCH_REQUEST_DATE
        );
    }
}
