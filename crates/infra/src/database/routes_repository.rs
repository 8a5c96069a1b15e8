//! Operation -> URL path routing table.

use std::sync::Arc;

use async_trait::async_trait;
use etims_core::RouteTable;
use etims_domain::constants::DEFAULT_ROUTES;
use etims_domain::{EtimsError, Result};
use rusqlite::{params, OptionalExtension};

use super::manager::DbManager;
use super::{blocking, map_sql_error};

const SEED_SQL: &str = "INSERT OR IGNORE INTO routes (operation, path) VALUES (?1, ?2)";

const SELECT_SQL: &str = "SELECT path FROM routes WHERE operation = ?1";

const OVERRIDE_SQL: &str = "INSERT INTO routes (operation, path) VALUES (?1, ?2)
    ON CONFLICT (operation) DO UPDATE SET path = excluded.path";

pub struct SqliteRouteTable {
    db: Arc<DbManager>,
}

impl SqliteRouteTable {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }

    /// Insert the built-in routes, leaving operator overrides untouched.
    pub async fn seed_defaults(&self) -> Result<()> {
        let db = Arc::clone(&self.db);
        blocking(move || {
            let conn = db.get_connection()?;
            for (operation, path) in DEFAULT_ROUTES {
                conn.execute(SEED_SQL, params![operation, path]).map_err(map_sql_error)?;
            }
            Ok(())
        })
        .await
    }

    /// Replace the path for one operation.
    pub async fn override_route(&self, operation: &str, path: &str) -> Result<()> {
        let db = Arc::clone(&self.db);
        let operation = operation.to_string();
        let path = path.to_string();
        blocking(move || {
            let conn = db.get_connection()?;
            conn.execute(OVERRIDE_SQL, params![operation, path]).map_err(map_sql_error)?;
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl RouteTable for SqliteRouteTable {
    async fn path_for(&self, operation: &str) -> Result<String> {
        let db = Arc::clone(&self.db);
        let operation = operation.to_string();
        blocking(move || {
            let conn = db.get_connection()?;
            let path: Option<String> = conn
                .query_row(SELECT_SQL, params![operation], |row| row.get(0))
                .optional()
                .map_err(map_sql_error)?;
            path.ok_or_else(|| EtimsError::NotFound(format!("no route for operation {operation}")))
        })
        .await
    }
}
