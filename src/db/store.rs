//! Relational store access
//!
//! `SqlStore` runs lookup queries over a single sqlx connection and converts
//! the rows into driver-independent [`Table`]s. The backend (SQLite,
//! PostgreSQL, MySQL) is picked from the URL scheme.

use crate::db::table::{Cell, Table};
use crate::error::AppError;
use async_trait::async_trait;
use sqlx::any::{install_default_drivers, AnyPoolOptions, AnyRow};
use sqlx::{AnyPool, Column, Row};
use tracing::{debug, info};

/// Runs a query string and returns its rows
#[async_trait]
pub trait QueryExecutor: Send {
    /// Execute `sql` and collect every row
    ///
    /// # Errors
    /// * `AppError::Query` on connection or SQL errors
    async fn fetch_table(&mut self, sql: &str) -> Result<Table, AppError>;

    /// Release the connection; errors are not reported
    async fn close(&mut self) {}
}

/// Query executor backed by an sqlx pool holding one connection
pub struct SqlStore {
    pool: AnyPool,
}

impl SqlStore {
    /// Open the connection
    ///
    /// # Arguments
    /// * `url` - sqlx connection URL (`sqlite://`, `postgres://`, `mysql://`)
    ///
    /// # Errors
    /// * `AppError::Query` if the connection cannot be established
    pub async fn connect(url: &str) -> Result<Self, AppError> {
        install_default_drivers();

        let pool = AnyPoolOptions::new()
            .max_connections(1)
            .connect(url)
            .await?;

        info!(
            backend = %url.split(':').next().unwrap_or_default(),
            "Connected to relational store"
        );
        Ok(Self { pool })
    }

    /// Get the database pool (for setup and advanced operations)
    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }
}

#[async_trait]
impl QueryExecutor for SqlStore {
    async fn fetch_table(&mut self, sql: &str) -> Result<Table, AppError> {
        let rows = sqlx::query(sql).fetch_all(&self.pool).await?;

        let columns = rows
            .first()
            .map(|row| row.columns().iter().map(|c| c.name().to_string()).collect())
            .unwrap_or_default();
        let cells = rows
            .iter()
            .map(decode_row)
            .collect::<Result<Vec<_>, _>>()?;

        debug!(sql = %sql, rows = cells.len(), "Query completed");
        Ok(Table::new(columns, cells))
    }

    async fn close(&mut self) {
        self.pool.close().await;
        debug!("Relational store connection closed");
    }
}

fn decode_row(row: &AnyRow) -> Result<Vec<Cell>, sqlx::Error> {
    (0..row.len()).map(|idx| decode_cell(row, idx)).collect()
}

/// Try the supported types in turn; a NULL decodes as `Cell::Null` on the first attempt
fn decode_cell(row: &AnyRow, idx: usize) -> Result<Cell, sqlx::Error> {
    if let Ok(v) = row.try_get::<Option<i64>, _>(idx) {
        return Ok(v.map_or(Cell::Null, Cell::Int));
    }
    if let Ok(v) = row.try_get::<Option<f64>, _>(idx) {
        return Ok(v.map_or(Cell::Null, Cell::Float));
    }
    if let Ok(v) = row.try_get::<Option<String>, _>(idx) {
        return Ok(v.map_or(Cell::Null, Cell::Text));
    }
    if let Ok(v) = row.try_get::<Option<bool>, _>(idx) {
        return Ok(v.map_or(Cell::Null, Cell::Bool));
    }
    Err(sqlx::Error::ColumnDecode {
        index: idx.to_string(),
        source: "unsupported column type".into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn seeded_store(dir: &TempDir) -> SqlStore {
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("lookup.db").display());
        let store = SqlStore::connect(&url).await.unwrap();
        for statement in [
            "CREATE TABLE EMPLOYEE (EMPLOYEESID INTEGER, UNIQUENAME TEXT, RATE REAL)",
            "INSERT INTO EMPLOYEE VALUES (10, 'JSMITH', 21.5)",
            "INSERT INTO EMPLOYEE VALUES (20, NULL, 19.0)",
        ] {
            sqlx::query(statement).execute(store.pool()).await.unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_fetch_table_decodes_cells() {
        let dir = TempDir::new().unwrap();
        let mut store = seeded_store(&dir).await;

        let table = store
            .fetch_table("SELECT EMPLOYEESID, UNIQUENAME, RATE FROM EMPLOYEE ORDER BY EMPLOYEESID")
            .await
            .unwrap();

        assert_eq!(table.columns(), ["EMPLOYEESID", "UNIQUENAME", "RATE"]);
        assert_eq!(table.len(), 2);
        assert_eq!(
            table.rows()[0],
            vec![
                Cell::Int(10),
                Cell::Text("JSMITH".to_string()),
                Cell::Float(21.5)
            ]
        );
        assert_eq!(table.rows()[1][1], Cell::Null);
        store.close().await;
    }

    #[tokio::test]
    async fn test_fetch_table_no_rows() {
        let dir = TempDir::new().unwrap();
        let mut store = seeded_store(&dir).await;

        let table = store
            .fetch_table("SELECT UNIQUENAME FROM EMPLOYEE WHERE EMPLOYEESID = 99")
            .await
            .unwrap();
        assert!(table.is_empty());
        assert!(matches!(
            table.first("employee", "UNIQUENAME"),
            Err(AppError::LookupEmpty { .. })
        ));
    }

    #[tokio::test]
    async fn test_sql_error_is_query_error() {
        let dir = TempDir::new().unwrap();
        let mut store = seeded_store(&dir).await;

        let err = store
            .fetch_table("SELECT NOPE FROM MISSING_TABLE")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Query(_)));
    }

    #[tokio::test]
    async fn test_connect_failure_is_query_error() {
        let result = SqlStore::connect("sqlite:///nonexistent-dir/sub/lookup.db?mode=ro").await;
        assert!(matches!(result, Err(AppError::Query(_))));
    }
}
