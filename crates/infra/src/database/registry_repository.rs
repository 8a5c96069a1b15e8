//! Provider-side records pulled down by the search operations.

use std::sync::Arc;

use async_trait::async_trait;
use etims_core::RegistryStore;
use etims_domain::types::{
    BranchRecord, ImportedItem, Notice, RegisteredPurchase, RegisteredStockMovement,
};
use etims_domain::{EtimsError, Result};
use rusqlite::{params, Transaction};
use serde::Serialize;
use tracing::debug;

use super::manager::DbManager;
use super::{blocking, map_sql_error};

const UPSERT_PURCHASE_SQL: &str = "INSERT INTO registered_purchases
    (supplier_tin, supplier_invoice_no, supplier_name, supplier_branch_id,
     receipt_type_code, payment_type_code, sale_date, total_item_count,
     total_taxable_amount, total_tax_amount, total_amount, remark, items_json)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
    ON CONFLICT (supplier_tin, supplier_invoice_no) DO UPDATE SET
        supplier_name = excluded.supplier_name,
        supplier_branch_id = excluded.supplier_branch_id,
        receipt_type_code = excluded.receipt_type_code,
        payment_type_code = excluded.payment_type_code,
        sale_date = excluded.sale_date,
        total_item_count = excluded.total_item_count,
        total_taxable_amount = excluded.total_taxable_amount,
        total_tax_amount = excluded.total_tax_amount,
        total_amount = excluded.total_amount,
        remark = excluded.remark,
        items_json = excluded.items_json";

const UPSERT_STOCK_MOVE_SQL: &str = "INSERT INTO registered_stock_movements
    (customer_tin, customer_branch_id, stored_and_released_no, occurred_date,
     total_item_count, total_taxable_amount, total_tax_amount, total_amount,
     remark, items_json)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
    ON CONFLICT (customer_tin, customer_branch_id, stored_and_released_no) DO UPDATE SET
        occurred_date = excluded.occurred_date,
        total_item_count = excluded.total_item_count,
        total_taxable_amount = excluded.total_taxable_amount,
        total_tax_amount = excluded.total_tax_amount,
        total_amount = excluded.total_amount,
        remark = excluded.remark,
        items_json = excluded.items_json";

const UPSERT_NOTICE_SQL: &str = "INSERT INTO notices
    (notice_no, title, contents, detail_url, registration_name, registration_date)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6)
    ON CONFLICT (notice_no) DO UPDATE SET
        title = excluded.title,
        contents = excluded.contents,
        detail_url = excluded.detail_url,
        registration_name = excluded.registration_name,
        registration_date = excluded.registration_date";

const UPSERT_IMPORTED_ITEM_SQL: &str = "INSERT INTO imported_items
    (task_code, item_seq, declaration_date, declaration_no, hs_code, item_name,
     origin_country_code, export_country_code, package_qty, packaging_unit_code,
     qty, quantity_unit_code, gross_weight, net_weight, supplier_name, agent_name,
     invoice_foreign_currency_amount, invoice_foreign_currency, invoice_exchange_rate)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)
    ON CONFLICT (task_code, item_seq) DO UPDATE SET
        declaration_date = excluded.declaration_date,
        declaration_no = excluded.declaration_no,
        hs_code = excluded.hs_code,
        item_name = excluded.item_name,
        origin_country_code = excluded.origin_country_code,
        export_country_code = excluded.export_country_code,
        package_qty = excluded.package_qty,
        packaging_unit_code = excluded.packaging_unit_code,
        qty = excluded.qty,
        quantity_unit_code = excluded.quantity_unit_code,
        gross_weight = excluded.gross_weight,
        net_weight = excluded.net_weight,
        supplier_name = excluded.supplier_name,
        agent_name = excluded.agent_name,
        invoice_foreign_currency_amount = excluded.invoice_foreign_currency_amount,
        invoice_foreign_currency = excluded.invoice_foreign_currency,
        invoice_exchange_rate = excluded.invoice_exchange_rate";

const UPSERT_BRANCH_SQL: &str = "INSERT INTO branches
    (tin, branch_id, name, status_code, county_name, locality_name,
     location_description, manager_name, manager_contact, manager_email,
     is_headquarters)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
    ON CONFLICT (tin, branch_id) DO UPDATE SET
        name = excluded.name,
        status_code = excluded.status_code,
        county_name = excluded.county_name,
        locality_name = excluded.locality_name,
        location_description = excluded.location_description,
        manager_name = excluded.manager_name,
        manager_contact = excluded.manager_contact,
        manager_email = excluded.manager_email,
        is_headquarters = excluded.is_headquarters";

pub struct SqliteRegistryStore {
    db: Arc<DbManager>,
}

impl SqliteRegistryStore {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }

    async fn in_transaction<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&Transaction<'_>) -> Result<()> + Send + 'static,
    {
        let db = Arc::clone(&self.db);
        blocking(move || {
            let mut conn = db.get_connection()?;
            let tx = conn.transaction().map_err(map_sql_error)?;
            f(&tx)?;
            tx.commit().map_err(map_sql_error)
        })
        .await
    }
}

fn items_json<T: Serialize>(items: &T) -> Result<String> {
    serde_json::to_string(items)
        .map_err(|err| EtimsError::Internal(format!("items serialisation failed: {err}")))
}

#[async_trait]
impl RegistryStore for SqliteRegistryStore {
    async fn store_purchases(&self, purchases: &[RegisteredPurchase]) -> Result<()> {
        let purchases = purchases.to_vec();
        self.in_transaction(move |tx| {
            let mut stmt = tx.prepare(UPSERT_PURCHASE_SQL).map_err(map_sql_error)?;
            for purchase in &purchases {
                stmt.execute(params![
                    purchase.supplier_tin,
                    purchase.supplier_invoice_no,
                    purchase.supplier_name,
                    purchase.supplier_branch_id,
                    purchase.receipt_type_code,
                    purchase.payment_type_code,
                    purchase.sale_date,
                    purchase.total_item_count,
                    purchase.total_taxable_amount,
                    purchase.total_tax_amount,
                    purchase.total_amount,
                    purchase.remark,
                    items_json(&purchase.items)?,
                ])
                .map_err(map_sql_error)?;
            }
            debug!(count = purchases.len(), "registered purchases stored");
            Ok(())
        })
        .await
    }

    async fn store_stock_movements(&self, movements: &[RegisteredStockMovement]) -> Result<()> {
        let movements = movements.to_vec();
        self.in_transaction(move |tx| {
            let mut stmt = tx.prepare(UPSERT_STOCK_MOVE_SQL).map_err(map_sql_error)?;
            for movement in &movements {
                stmt.execute(params![
                    movement.customer_tin,
                    movement.customer_branch_id,
                    movement.stored_and_released_no,
                    movement.occurred_date,
                    movement.total_item_count,
                    movement.total_taxable_amount,
                    movement.total_tax_amount,
                    movement.total_amount,
                    movement.remark,
                    items_json(&movement.items)?,
                ])
                .map_err(map_sql_error)?;
            }
            debug!(count = movements.len(), "registered stock movements stored");
            Ok(())
        })
        .await
    }

    async fn store_notices(&self, notices: &[Notice]) -> Result<()> {
        let notices = notices.to_vec();
        self.in_transaction(move |tx| {
            let mut stmt = tx.prepare(UPSERT_NOTICE_SQL).map_err(map_sql_error)?;
            for notice in &notices {
                stmt.execute(params![
                    notice.notice_no,
                    notice.title,
                    notice.contents,
                    notice.detail_url,
                    notice.registration_name,
                    notice.registration_date,
                ])
                .map_err(map_sql_error)?;
            }
            debug!(count = notices.len(), "notices stored");
            Ok(())
        })
        .await
    }

    async fn store_imported_items(&self, items: &[ImportedItem]) -> Result<()> {
        let items = items.to_vec();
        self.in_transaction(move |tx| {
            let mut stmt = tx.prepare(UPSERT_IMPORTED_ITEM_SQL).map_err(map_sql_error)?;
            for item in &items {
                stmt.execute(params![
                    item.task_code,
                    item.item_seq,
                    item.declaration_date,
                    item.declaration_no,
                    item.hs_code,
                    item.item_name,
                    item.origin_country_code,
                    item.export_country_code,
                    item.package_qty,
                    item.packaging_unit_code,
                    item.qty,
                    item.quantity_unit_code,
                    item.gross_weight,
                    item.net_weight,
                    item.supplier_name,
                    item.agent_name,
                    item.invoice_foreign_currency_amount,
                    item.invoice_foreign_currency,
                    item.invoice_exchange_rate,
                ])
                .map_err(map_sql_error)?;
            }
            debug!(count = items.len(), "imported items stored");
            Ok(())
        })
        .await
    }

    async fn store_branches(&self, branches: &[BranchRecord]) -> Result<()> {
        let branches = branches.to_vec();
        self.in_transaction(move |tx| {
            let mut stmt = tx.prepare(UPSERT_BRANCH_SQL).map_err(map_sql_error)?;
            for branch in &branches {
                stmt.execute(params![
                    branch.tin,
                    branch.branch_id,
                    branch.name,
                    branch.status_code,
                    branch.county_name,
                    branch.locality_name,
                    branch.location_description,
                    branch.manager_name,
                    branch.manager_contact,
                    branch.manager_email,
                    branch.is_headquarters,
                ])
                .map_err(map_sql_error)?;
            }
            debug!(count = branches.len(), "branches stored");
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    async fn repository() -> (TempDir, SqliteRegistryStore) {
        let temp_dir = TempDir::new().unwrap();
        let db = Arc::new(DbManager::new(temp_dir.path().join("state.db"), 2).unwrap());
        db.run_migrations().unwrap();
        (temp_dir, SqliteRegistryStore::new(db))
    }

    fn notice(no: i64, title: &str) -> Notice {
        Notice {
            notice_no: no,
            title: title.into(),
            contents: "See portal for details".into(),
            detail_url: None,
            registration_name: Some("Admin".into()),
            registration_date: "20260801000000".into(),
        }
    }

    #[tokio::test]
    async fn notices_upsert_by_number() {
        let (_dir, store) = repository().await;
        store.store_notices(&[notice(1, "Maintenance window")]).await.unwrap();
        store.store_notices(&[notice(1, "Maintenance window (revised)"), notice(2, "New codes")]).await.unwrap();

        let db = Arc::clone(&store.db);
        let count: i64 = db
            .get_connection()
            .unwrap()
            .query_row("SELECT COUNT(*) FROM notices", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 2);
        let title: String = db
            .get_connection()
            .unwrap()
            .query_row("SELECT title FROM notices WHERE notice_no = 1", [], |row| row.get(0))
            .unwrap();
        assert_eq!(title, "Maintenance window (revised)");
    }

    #[tokio::test]
    async fn purchases_store_items_as_json() {
        let (_dir, store) = repository().await;
        store
            .store_purchases(&[RegisteredPurchase {
                supplier_tin: "A000000000Z".into(),
                supplier_name: "Supplies Ltd".into(),
                supplier_branch_id: "00".into(),
                supplier_invoice_no: 7,
                receipt_type_code: "P".into(),
                payment_type_code: "01".into(),
                sale_date: "20260815".into(),
                total_item_count: 0,
                total_taxable_amount: 0.0,
                total_tax_amount: 0.0,
                total_amount: 0.0,
                remark: None,
                items: vec![],
            }])
            .await
            .unwrap();

        let db = Arc::clone(&store.db);
        let stored: String = db
            .get_connection()
            .unwrap()
            .query_row(
                "SELECT items_json FROM registered_purchases WHERE supplier_invoice_no = 7",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(stored, "[]");
    }
}
