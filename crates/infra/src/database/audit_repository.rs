//! SQLite-backed audit trail.

use std::sync::Arc;

use async_trait::async_trait;
use etims_core::AuditTrail;
use etims_domain::types::{AuditRecord, AuditStatus, DocumentRef};
use etims_domain::Result;
use rusqlite::{params, OptionalExtension, Row};
use tracing::warn;

use super::manager::{DbConnection, DbManager};
use super::{blocking, map_sql_error};

const INSERT_SQL: &str = "INSERT INTO audit_log
    (id, is_remote, url, request_headers, request_body, status,
     reference_doctype, reference_name, created_at)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)";

// The status predicate makes finalization first-writer-wins: a record can
// leave Pending exactly once.
const FINALIZE_SQL: &str = "UPDATE audit_log
    SET status = ?2, output = ?3, error = ?4, finalized_at = datetime('now')
    WHERE id = ?1 AND status = 'Pending'";

const SELECT_SQL: &str = "SELECT id, is_remote, url, request_headers, request_body,
        status, output, error, reference_doctype, reference_name, created_at
    FROM audit_log WHERE id = ?1";

pub struct SqliteAuditTrail {
    db: Arc<DbManager>,
}

impl SqliteAuditTrail {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }

    /// Fetch a record by id, mostly for diagnostics and tests.
    pub async fn get(&self, id: &str) -> Result<Option<AuditRecord>> {
        let db = Arc::clone(&self.db);
        let id = id.to_string();
        blocking(move || {
            let conn = db.get_connection()?;
            conn.query_row(SELECT_SQL, params![id], map_row)
                .optional()
                .map_err(map_sql_error)
        })
        .await
    }

    fn insert(conn: &DbConnection, record: &AuditRecord) -> Result<()> {
        conn.execute(
            INSERT_SQL,
            params![
                record.id,
                record.is_remote,
                record.url,
                record.request_headers,
                record.request_body,
                record.status.to_string(),
                record.reference.doctype,
                record.reference.name,
                record.created_at.to_rfc3339(),
            ],
        )
        .map_err(map_sql_error)?;
        Ok(())
    }
}

fn map_row(row: &Row<'_>) -> rusqlite::Result<AuditRecord> {
    let status: String = row.get("status")?;
    let created_at: String = row.get("created_at")?;
    Ok(AuditRecord {
        id: row.get("id")?,
        is_remote: row.get("is_remote")?,
        url: row.get("url")?,
        request_headers: row.get("request_headers")?,
        request_body: row.get("request_body")?,
        status: status.parse().unwrap_or(AuditStatus::Pending),
        output: row.get("output")?,
        error: row.get("error")?,
        reference: DocumentRef {
            doctype: row.get("reference_doctype")?,
            name: row.get("reference_name")?,
        },
        created_at: created_at.parse().unwrap_or_default(),
    })
}

#[async_trait]
impl AuditTrail for SqliteAuditTrail {
    async fn open(&self, record: &AuditRecord) -> Result<()> {
        let db = Arc::clone(&self.db);
        let record = record.clone();
        blocking(move || {
            let conn = db.get_connection()?;
            Self::insert(&conn, &record)
        })
        .await
    }

    async fn finalize(
        &self,
        id: &str,
        status: AuditStatus,
        output: Option<&str>,
        error: Option<&str>,
    ) -> Result<()> {
        let db = Arc::clone(&self.db);
        let id = id.to_string();
        let output = output.map(str::to_owned);
        let error = error.map(str::to_owned);
        blocking(move || {
            let conn = db.get_connection()?;
            let changed = conn
                .execute(FINALIZE_SQL, params![id, status.to_string(), output, error])
                .map_err(map_sql_error)?;
            if changed == 0 {
                warn!(%id, "audit record was already finalized; ignoring");
            }
            Ok(())
        })
        .await
    }
}
