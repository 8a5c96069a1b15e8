//! Staged host document snapshots and outcome write-backs.

use std::sync::Arc;

use async_trait::async_trait;
use etims_core::{DocumentStore, DocumentUpdate};
use etims_domain::types::{
    InvoiceDocument, InvoiceKind, PurchaseInvoiceDocument, StockMovementDocument,
};
use etims_domain::{EtimsError, Result};
use rusqlite::params;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use super::manager::{DbConnection, DbManager};
use super::{blocking, map_sql_error};

const PURCHASE_INVOICE_DOCTYPE: &str = "Purchase Invoice";
const STOCK_MOVEMENT_DOCTYPE: &str = "Stock Ledger Entry";

const STAGE_SQL: &str = "INSERT INTO documents (name, doctype, payload_json, staged_at)
    VALUES (?1, ?2, ?3, datetime('now'))
    ON CONFLICT (name) DO UPDATE SET
        doctype = excluded.doctype,
        payload_json = excluded.payload_json,
        updated_at = datetime('now')";

const MARK_SUBMITTED_SQL: &str = "UPDATE documents
    SET submitted = 1, rejection_code = NULL, rejection_message = NULL,
        updated_at = datetime('now')
    WHERE name = ?1 AND doctype = ?2";

const SALES_RECEIPT_SQL: &str = "UPDATE documents
    SET submitted = 1, receipt_json = ?3, rejection_code = NULL,
        rejection_message = NULL, updated_at = datetime('now')
    WHERE name = ?1 AND doctype = ?2";

const RECORD_REJECTION_SQL: &str = "UPDATE documents
    SET rejection_code = ?3, rejection_message = ?4, updated_at = datetime('now')
    WHERE name = ?1 AND doctype = ?2";

const PENDING_INVOICES_SQL: &str = "SELECT doctype, payload_json FROM documents
    WHERE submitted = 0 AND doctype IN ('Sales Invoice', 'POS Invoice')
    ORDER BY staged_at";

const PENDING_BY_DOCTYPE_SQL: &str = "SELECT payload_json FROM documents
    WHERE submitted = 0 AND doctype = ?1
    ORDER BY staged_at";

const SELECT_RECEIPT_SQL: &str = "SELECT receipt_json FROM documents WHERE name = ?1";

pub struct SqliteDocumentStore {
    db: Arc<DbManager>,
}

impl SqliteDocumentStore {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }

    /// Stage a sales or POS invoice snapshot for submission.
    pub async fn stage_invoice(&self, kind: InvoiceKind, document: &InvoiceDocument) -> Result<()> {
        self.stage(kind.doctype(), document.name.clone(), document).await
    }

    pub async fn stage_purchase_invoice(&self, document: &PurchaseInvoiceDocument) -> Result<()> {
        self.stage(PURCHASE_INVOICE_DOCTYPE, document.name.clone(), document).await
    }

    pub async fn stage_stock_movement(&self, document: &StockMovementDocument) -> Result<()> {
        self.stage(STOCK_MOVEMENT_DOCTYPE, document.name.clone(), document).await
    }

    /// Receipt JSON attached to an accepted sales invoice, if any.
    pub async fn receipt_json(&self, name: &str) -> Result<Option<String>> {
        let db = Arc::clone(&self.db);
        let name = name.to_string();
        blocking(move || {
            let conn = db.get_connection()?;
            use rusqlite::OptionalExtension;
            let receipt: Option<Option<String>> = conn
                .query_row(SELECT_RECEIPT_SQL, params![name], |row| row.get(0))
                .optional()
                .map_err(map_sql_error)?;
            Ok(receipt.flatten())
        })
        .await
    }

    async fn stage<T: Serialize>(
        &self,
        doctype: &'static str,
        name: String,
        document: &T,
    ) -> Result<()> {
        let payload_json = serde_json::to_string(document)
            .map_err(|err| EtimsError::Internal(format!("document serialisation failed: {err}")))?;
        let db = Arc::clone(&self.db);
        blocking(move || {
            let conn = db.get_connection()?;
            conn.execute(STAGE_SQL, params![name, doctype, payload_json]).map_err(map_sql_error)?;
            Ok(())
        })
        .await
    }

    fn pending_rows<T: DeserializeOwned>(conn: &DbConnection, doctype: &str) -> Result<Vec<T>> {
        let mut stmt = conn.prepare(PENDING_BY_DOCTYPE_SQL).map_err(map_sql_error)?;
        let rows = stmt
            .query_map(params![doctype], |row| row.get::<_, String>(0))
            .map_err(map_sql_error)?;
        let mut documents = Vec::new();
        for row in rows {
            let payload_json = row.map_err(map_sql_error)?;
            documents.push(parse_payload(&payload_json)?);
        }
        Ok(documents)
    }
}

fn parse_payload<T: DeserializeOwned>(payload_json: &str) -> Result<T> {
    serde_json::from_str(payload_json)
        .map_err(|err| EtimsError::Internal(format!("staged document is unreadable: {err}")))
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    async fn apply(&self, update: &DocumentUpdate) -> Result<()> {
        let db = Arc::clone(&self.db);
        let update = update.clone();
        blocking(move || {
            let conn = db.get_connection()?;
            let changed = match &update {
                DocumentUpdate::MarkSubmitted { doctype, name } => conn
                    .execute(MARK_SUBMITTED_SQL, params![name, doctype])
                    .map_err(map_sql_error)?,
                DocumentUpdate::SalesReceipt { doctype, name, receipt } => {
                    let receipt_json = serde_json::to_string(receipt).map_err(|err| {
                        EtimsError::Internal(format!("receipt serialisation failed: {err}"))
                    })?;
                    conn.execute(SALES_RECEIPT_SQL, params![name, doctype, receipt_json])
                        .map_err(map_sql_error)?
                }
                DocumentUpdate::RecordRejection { doctype, name, code, message } => conn
                    .execute(RECORD_REJECTION_SQL, params![name, doctype, code, message])
                    .map_err(map_sql_error)?,
            };
            if changed == 0 {
                warn!(?update, "write-back matched no staged document");
            }
            Ok(())
        })
        .await
    }

    async fn pending_invoices(&self) -> Result<Vec<(InvoiceKind, InvoiceDocument)>> {
        let db = Arc::clone(&self.db);
        blocking(move || {
            let conn = db.get_connection()?;
            let mut stmt = conn.prepare(PENDING_INVOICES_SQL).map_err(map_sql_error)?;
            let rows = stmt
                .query_map([], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
                })
                .map_err(map_sql_error)?;
            let mut documents = Vec::new();
            for row in rows {
                let (doctype, payload_json) = row.map_err(map_sql_error)?;
                let kind = if doctype == "POS Invoice" { InvoiceKind::Pos } else { InvoiceKind::Sales };
                documents.push((kind, parse_payload(&payload_json)?));
            }
            Ok(documents)
        })
        .await
    }

    async fn pending_purchase_invoices(&self) -> Result<Vec<PurchaseInvoiceDocument>> {
        let db = Arc::clone(&self.db);
        blocking(move || {
            let conn = db.get_connection()?;
            Self::pending_rows(&conn, PURCHASE_INVOICE_DOCTYPE)
        })
        .await
    }

    async fn pending_stock_movements(&self) -> Result<Vec<StockMovementDocument>> {
        let db = Arc::clone(&self.db);
        blocking(move || {
            let conn = db.get_connection()?;
            Self::pending_rows(&conn, STOCK_MOVEMENT_DOCTYPE)
        })
        .await
    }
}
