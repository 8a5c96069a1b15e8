//! Downloaded reference code lists.

use std::sync::Arc;

use async_trait::async_trait;
use etims_core::CodeListStore;
use etims_domain::types::{CodeDetail, ItemClassification};
use etims_domain::Result;
use rusqlite::params;
use tracing::debug;

use super::manager::DbManager;
use super::{blocking, map_sql_error};

const UPSERT_CODE_SQL: &str = "INSERT INTO code_details
    (class_code, class_name, code, name, description, sort_order)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6)
    ON CONFLICT (class_code, code) DO UPDATE SET
        class_name = excluded.class_name,
        name = excluded.name,
        description = excluded.description,
        sort_order = excluded.sort_order";

const UPSERT_CLASSIFICATION_SQL: &str = "INSERT INTO item_classifications
    (code, name, level, taxation_type, is_major_target, in_use)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6)
    ON CONFLICT (code) DO UPDATE SET
        name = excluded.name,
        level = excluded.level,
        taxation_type = excluded.taxation_type,
        is_major_target = excluded.is_major_target,
        in_use = excluded.in_use";

pub struct SqliteCodeListStore {
    db: Arc<DbManager>,
}

impl SqliteCodeListStore {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }

    /// Codes for one class, in sort order.
    pub async fn codes_for_class(&self, class_code: &str) -> Result<Vec<CodeDetail>> {
        let db = Arc::clone(&self.db);
        let class_code = class_code.to_string();
        blocking(move || {
            let conn = db.get_connection()?;
            let mut stmt = conn
                .prepare(
                    "SELECT class_code, class_name, code, name, description, sort_order
                     FROM code_details WHERE class_code = ?1 ORDER BY sort_order, code",
                )
                .map_err(map_sql_error)?;
            let rows = stmt
                .query_map(params![class_code], |row| {
                    Ok(CodeDetail {
                        class_code: row.get(0)?,
                        class_name: row.get(1)?,
                        code: row.get(2)?,
                        name: row.get(3)?,
                        description: row.get(4)?,
                        sort_order: row.get(5)?,
                    })
                })
                .map_err(map_sql_error)?;
            rows.collect::<rusqlite::Result<Vec<_>>>().map_err(map_sql_error)
        })
        .await
    }
}

#[async_trait]
impl CodeListStore for SqliteCodeListStore {
    async fn store_code_details(&self, details: &[CodeDetail]) -> Result<()> {
        let db = Arc::clone(&self.db);
        let details = details.to_vec();
        blocking(move || {
            let mut conn = db.get_connection()?;
            let tx = conn.transaction().map_err(map_sql_error)?;
            {
                let mut stmt = tx.prepare(UPSERT_CODE_SQL).map_err(map_sql_error)?;
                for detail in &details {
                    stmt.execute(params![
                        detail.class_code,
                        detail.class_name,
                        detail.code,
                        detail.name,
                        detail.description,
                        detail.sort_order,
                    ])
                    .map_err(map_sql_error)?;
                }
            }
            tx.commit().map_err(map_sql_error)?;
            debug!(count = details.len(), "code details stored");
            Ok(())
        })
        .await
    }

    async fn store_item_classifications(&self, items: &[ItemClassification]) -> Result<()> {
        let db = Arc::clone(&self.db);
        let items = items.to_vec();
        blocking(move || {
            let mut conn = db.get_connection()?;
            let tx = conn.transaction().map_err(map_sql_error)?;
            {
                let mut stmt = tx.prepare(UPSERT_CLASSIFICATION_SQL).map_err(map_sql_error)?;
                for item in &items {
                    stmt.execute(params![
                        item.code,
                        item.name,
                        item.level,
                        item.taxation_type,
                        item.is_major_target,
                        item.in_use,
                    ])
                    .map_err(map_sql_error)?;
                }
            }
            tx.commit().map_err(map_sql_error)?;
            debug!(count = items.len(), "item classifications stored");
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    async fn repository() -> (TempDir, SqliteCodeListStore) {
        let temp_dir = TempDir::new().unwrap();
        let db = Arc::new(DbManager::new(temp_dir.path().join("state.db"), 2).unwrap());
        db.run_migrations().unwrap();
        (temp_dir, SqliteCodeListStore::new(db))
    }

    fn detail(code: &str, name: &str) -> CodeDetail {
        CodeDetail {
            class_code: "07".into(),
            class_name: "Payment Type".into(),
            code: code.into(),
            name: name.into(),
            description: None,
            sort_order: code.parse().unwrap_or(0),
        }
    }

    #[tokio::test]
    async fn upserts_replace_existing_codes() {
        let (_dir, store) = repository().await;
        store.store_code_details(&[detail("01", "CASH"), detail("02", "CREDIT")]).await.unwrap();
        store.store_code_details(&[detail("01", "CASH/MONEY")]).await.unwrap();

        let codes = store.codes_for_class("07").await.unwrap();
        assert_eq!(codes.len(), 2);
        assert_eq!(codes[0].name, "CASH/MONEY");
    }

    #[tokio::test]
    async fn classifications_round_trip() {
        let (_dir, store) = repository().await;
        store
            .store_item_classifications(&[ItemClassification {
                code: "5059690800".into(),
                name: "Other services".into(),
                level: Some(5),
                taxation_type: Some("B".into()),
                is_major_target: false,
                in_use: true,
            }])
            .await
            .unwrap();

        // A second pass with changed fields overwrites in place.
        store
            .store_item_classifications(&[ItemClassification {
                code: "5059690800".into(),
                name: "Other services".into(),
                level: Some(5),
                taxation_type: Some("B".into()),
                is_major_target: true,
                in_use: true,
            }])
            .await
            .unwrap();
    }
}
