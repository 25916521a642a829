//! SQLite-backed [`SqlStore`].

use super::SqlStore;
use crate::state::SqlExecutionResult;
use hybrid_core::{AppError, AppResult};
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Opens a fresh read-only connection for every call. The connection is
/// dropped when the call returns, whether it succeeded or not.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    path: PathBuf,
}

impl SqliteStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    async fn with_connection<T, F>(&self, f: F) -> AppResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> AppResult<T> + Send + 'static,
    {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || {
            let conn = open_read_only(&path)?;
            tracing::debug!("Connected to {:?}", path);
            let result = f(&conn);
            drop(conn);
            tracing::debug!("Disconnected from {:?}", path);
            result
        })
        .await
        .map_err(|e| AppError::Database(format!("SQLite task failed: {}", e)))?
    }
}

fn open_read_only(path: &Path) -> AppResult<Connection> {
    Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .map_err(|e| AppError::Unavailable(format!("Failed to open database {:?}: {}", path, e)))
}

#[async_trait::async_trait]
impl SqlStore for SqliteStore {
    async fn describe_schema(&self, tables: &[String]) -> AppResult<String> {
        let tables = tables.to_vec();
        self.with_connection(move |conn| describe_tables(conn, &tables))
            .await
    }

    async fn execute(&self, sql: &str) -> AppResult<SqlExecutionResult> {
        let sql = sql.to_string();
        self.with_connection(move |conn| run_statement(conn, &sql))
            .await
    }
}

fn describe_tables(conn: &Connection, tables: &[String]) -> AppResult<String> {
    let mut stmt = conn
        .prepare("SELECT name, type FROM pragma_table_info(?1)")
        .map_err(|e| AppError::Database(format!("Failed to prepare schema query: {}", e)))?;

    let mut schema = String::new();
    for table in tables {
        schema.push_str(&format!("\nTable Name: **{}**\n", table));

        let columns = stmt
            .query_map([table], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })
            .map_err(|e| AppError::Database(format!("Failed to read schema of {}: {}", table, e)))?;

        for column in columns {
            let (name, column_type) = column
                .map_err(|e| AppError::Database(format!("Failed to read column: {}", e)))?;
            schema.push_str(&format!("  - {} {}\n", name, column_type));
        }
    }

    Ok(schema)
}

fn run_statement(conn: &Connection, sql: &str) -> AppResult<SqlExecutionResult> {
    let (columns, rows) = collect_rows(conn, sql).map_err(|e| {
        tracing::warn!("Error executing query: {}", e);
        AppError::QueryExecution(e.to_string())
    })?;
    Ok(SqlExecutionResult::rows(columns, rows))
}

fn collect_rows(
    conn: &Connection,
    sql: &str,
) -> rusqlite::Result<(Vec<String>, Vec<Vec<Value>>)> {
    let mut stmt = conn.prepare(sql)?;
    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    let width = columns.len();

    let mut rows = stmt.query([])?;
    let mut collected = Vec::new();
    while let Some(row) = rows.next()? {
        let mut values = Vec::with_capacity(width);
        for i in 0..width {
            values.push(to_json(row.get_ref(i)?));
        }
        collected.push(values);
    }

    Ok((columns, collected))
}

fn to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::String(format!("<blob {} bytes>", bytes.len())),
    }
}
