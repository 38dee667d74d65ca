//! SQLite row store.
//!
//! Runs statements on tokio-rusqlite's background connection thread.

use std::path::Path;

use async_trait::async_trait;
use serde_json::{Number, Value};
use tokio_rusqlite::rusqlite::types::{Value as SqlValue, ValueRef};
use tokio_rusqlite::rusqlite::{self, params_from_iter};
use tokio_rusqlite::Connection;
use tracing::{debug, info};

use super::schema;
use super::{ExecOutcome, Row, StoreAccessor};
use crate::error::{CacheError, Result};

const PRAGMAS: &str = "PRAGMA journal_mode=WAL;
     PRAGMA synchronous=NORMAL;
     PRAGMA temp_store=MEMORY;
     PRAGMA foreign_keys=ON;";

/// SQLite-backed [`StoreAccessor`].
#[derive(Clone, Debug)]
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open a database at the specified path.
    ///
    /// Creates the file if it doesn't exist, applies pragmas and creates the schema.
    pub async fn open(path: impl AsRef<Path>, seed: bool) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let conn = Connection::open(&path)
            .await
            .map_err(|e| CacheError::StoreUnavailable(e.to_string()))?;
        let store = Self::prepare(conn, seed).await?;
        info!(path = %path.display(), "SQLite store opened");
        Ok(store)
    }

    /// Open an in-memory database, used by tests.
    pub async fn open_in_memory(seed: bool) -> Result<Self> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| CacheError::StoreUnavailable(e.to_string()))?;
        Self::prepare(conn, seed).await
    }

    async fn prepare(conn: Connection, seed: bool) -> Result<Self> {
        conn.call(move |conn| -> std::result::Result<(), rusqlite::Error> {
            conn.execute_batch(PRAGMAS)?;
            schema::create(conn)?;
            if seed {
                schema::seed_demo_data(conn)?;
            }
            Ok(())
        })
        .await?;
        Ok(Self { conn })
    }

    /// Closes the background connection. Later calls fail with `StoreUnavailable`.
    pub async fn close(self) -> Result<()> {
        self.conn
            .close()
            .await
            .map_err(|e| CacheError::StoreUnavailable(e.to_string()))
    }
}

#[async_trait]
impl StoreAccessor for SqliteStore {
    async fn query(&self, statement: &str, params: Vec<Value>) -> Result<Vec<Row>> {
        let statement = statement.to_string();
        let params: Vec<SqlValue> = params.into_iter().map(to_sql_value).collect();
        debug!(statement = %statement, "store query");

        let rows = self
            .conn
            .call(move |conn| -> std::result::Result<Vec<Row>, rusqlite::Error> {
                let mut stmt = conn.prepare(&statement)?;
                let columns: Vec<String> =
                    stmt.column_names().into_iter().map(String::from).collect();
                let mut rows = stmt.query(params_from_iter(params.iter()))?;

                let mut out = Vec::new();
                while let Some(row) = rows.next()? {
                    let mut record = Row::new();
                    for (idx, name) in columns.iter().enumerate() {
                        record.insert(name.clone(), from_sql_value(row.get_ref(idx)?));
                    }
                    out.push(record);
                }
                Ok(out)
            })
            .await?;
        Ok(rows)
    }

    async fn execute(&self, statement: &str, params: Vec<Value>) -> Result<ExecOutcome> {
        let statement = statement.to_string();
        let params: Vec<SqlValue> = params.into_iter().map(to_sql_value).collect();
        let is_insert = statement
            .trim_start()
            .get(..6)
            .is_some_and(|head| head.eq_ignore_ascii_case("insert"));
        debug!(statement = %statement, "store execute");

        let outcome = self
            .conn
            .call(move |conn| -> std::result::Result<ExecOutcome, rusqlite::Error> {
                let rows_affected = conn.execute(&statement, params_from_iter(params.iter()))?;
                let inserted_id =
                    (is_insert && rows_affected > 0).then(|| conn.last_insert_rowid());
                Ok(ExecOutcome {
                    inserted_id,
                    rows_affected,
                })
            })
            .await?;
        Ok(outcome)
    }
}

fn to_sql_value(value: Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None => SqlValue::Real(n.as_f64().unwrap_or_default()),
        },
        Value::String(s) => SqlValue::Text(s),
        other => SqlValue::Text(other.to_string()),
    }
}

fn from_sql_value(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null),
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::Array(bytes.iter().map(|b| Value::from(*b)).collect()),
    }
}
