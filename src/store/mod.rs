//! Store Accessor
//!
//! Thin async query interface over the row store. The cache only ever talks
//! to storage through [`StoreAccessor`].

mod schema;
mod sqlite;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::Result;

pub use sqlite::SqliteStore;

/// One result row, column name → value.
pub type Row = serde_json::Map<String, Value>;

/// Result of a write statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ExecOutcome {
    /// Row id of the inserted row, for INSERT statements that inserted one
    pub inserted_id: Option<i64>,
    /// Rows changed by the statement
    pub rows_affected: usize,
}

/// Async row-store interface.
#[async_trait]
pub trait StoreAccessor: Send + Sync {
    /// Runs a read statement and returns every row.
    async fn query(&self, statement: &str, params: Vec<Value>) -> Result<Vec<Row>>;

    /// Runs a write statement.
    async fn execute(&self, statement: &str, params: Vec<Value>) -> Result<ExecOutcome>;
}

/// Decodes rows into typed records.
pub fn decode_rows<T: DeserializeOwned>(rows: Vec<Row>) -> Result<Vec<T>> {
    rows.into_iter().map(decode_row).collect()
}

/// Decodes a single row into a typed record.
pub fn decode_row<T: DeserializeOwned>(row: Row) -> Result<T> {
    Ok(serde_json::from_value(Value::Object(row))?)
}

/// Deserializes SQLite's 0/1 integers as booleans.
pub(crate) fn bool_from_int<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::Deserialize;
    match Value::deserialize(deserializer)? {
        Value::Bool(b) => Ok(b),
        Value::Number(n) => Ok(n.as_i64().unwrap_or(0) != 0),
        Value::Null => Ok(false),
        other => Err(serde::de::Error::custom(format!(
            "expected boolean, found {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Liked {
        id: i64,
        #[serde(deserialize_with = "bool_from_int")]
        is_liked: bool,
    }

    fn row(value: Value) -> Row {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_decode_rows() {
        let rows = vec![
            row(json!({"id": 1, "is_liked": 1})),
            row(json!({"id": 2, "is_liked": 0})),
        ];
        let decoded: Vec<Liked> = decode_rows(rows).unwrap();
        assert_eq!(decoded[0].id, 1);
        assert!(decoded[0].is_liked);
        assert!(!decoded[1].is_liked);
    }

    #[test]
    fn test_decode_row_error_is_query_error() {
        let result: Result<Liked> = decode_row(row(json!({"id": "x"})));
        assert!(matches!(result, Err(crate::error::CacheError::Query(_))));
    }
}
