//! Scalar parameter values and typed row access.

use crate::{AdapterError, AdapterResult};
use std::sync::Arc;

/// A scalar SQL value, used both for bind parameters and result cells.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<i32> for SqlValue {
    fn from(v: i32) -> Self {
        Self::Integer(v as i64)
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        Self::Real(v)
    }
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        Self::Integer(v as i64)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<Vec<u8>> for SqlValue {
    fn from(v: Vec<u8>) -> Self {
        Self::Blob(v)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Self::Null,
        }
    }
}

impl From<SqlValue> for rusqlite::types::Value {
    fn from(v: SqlValue) -> Self {
        match v {
            SqlValue::Null => Self::Null,
            SqlValue::Integer(i) => Self::Integer(i),
            SqlValue::Real(r) => Self::Real(r),
            SqlValue::Text(t) => Self::Text(t),
            SqlValue::Blob(b) => Self::Blob(b),
        }
    }
}

impl From<rusqlite::types::ValueRef<'_>> for SqlValue {
    fn from(v: rusqlite::types::ValueRef<'_>) -> Self {
        use rusqlite::types::ValueRef;
        match v {
            ValueRef::Null => Self::Null,
            ValueRef::Integer(i) => Self::Integer(i),
            ValueRef::Real(r) => Self::Real(r),
            ValueRef::Text(t) => Self::Text(String::from_utf8_lossy(t).into_owned()),
            ValueRef::Blob(b) => Self::Blob(b.to_vec()),
        }
    }
}

/// One result row with typed, by-name column access.
///
/// Column names are shared across all rows of a result set.
#[derive(Debug, Clone)]
pub struct SqlRow {
    columns: Arc<Vec<String>>,
    values: Vec<SqlValue>,
}

impl SqlRow {
    pub fn new(columns: Arc<Vec<String>>, values: Vec<SqlValue>) -> Self {
        Self { columns, values }
    }

    /// Raw value lookup by column name.
    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        let idx = self.columns.iter().position(|c| c == column)?;
        self.values.get(idx)
    }

    fn require(&self, column: &str) -> AdapterResult<&SqlValue> {
        self.get(column)
            .ok_or_else(|| AdapterError::column(column, "no such column in result set"))
    }

    pub fn get_i64(&self, column: &str) -> AdapterResult<i64> {
        match self.require(column)? {
            SqlValue::Integer(i) => Ok(*i),
            other => Err(AdapterError::column(
                column,
                format!("expected integer, got {:?}", other),
            )),
        }
    }

    pub fn get_opt_i64(&self, column: &str) -> AdapterResult<Option<i64>> {
        match self.require(column)? {
            SqlValue::Null => Ok(None),
            SqlValue::Integer(i) => Ok(Some(*i)),
            other => Err(AdapterError::column(
                column,
                format!("expected integer or null, got {:?}", other),
            )),
        }
    }

    pub fn get_f64(&self, column: &str) -> AdapterResult<f64> {
        match self.require(column)? {
            SqlValue::Real(r) => Ok(*r),
            // SQLite affinity may hand integers back for REAL columns
            SqlValue::Integer(i) => Ok(*i as f64),
            other => Err(AdapterError::column(
                column,
                format!("expected real, got {:?}", other),
            )),
        }
    }

    pub fn get_opt_f64(&self, column: &str) -> AdapterResult<Option<f64>> {
        match self.require(column)? {
            SqlValue::Null => Ok(None),
            SqlValue::Real(r) => Ok(Some(*r)),
            SqlValue::Integer(i) => Ok(Some(*i as f64)),
            other => Err(AdapterError::column(
                column,
                format!("expected real or null, got {:?}", other),
            )),
        }
    }

    pub fn get_text(&self, column: &str) -> AdapterResult<String> {
        match self.require(column)? {
            SqlValue::Text(t) => Ok(t.clone()),
            other => Err(AdapterError::column(
                column,
                format!("expected text, got {:?}", other),
            )),
        }
    }

    pub fn get_opt_text(&self, column: &str) -> AdapterResult<Option<String>> {
        match self.require(column)? {
            SqlValue::Null => Ok(None),
            SqlValue::Text(t) => Ok(Some(t.clone())),
            other => Err(AdapterError::column(
                column,
                format!("expected text or null, got {:?}", other),
            )),
        }
    }

    pub fn get_bool(&self, column: &str) -> AdapterResult<bool> {
        Ok(self.get_i64(column)? != 0)
    }

    pub fn get_opt_bool(&self, column: &str) -> AdapterResult<Option<bool>> {
        Ok(self.get_opt_i64(column)?.map(|i| i != 0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_row() -> SqlRow {
        let columns = Arc::new(vec![
            "id".to_string(),
            "name".to_string(),
            "premium".to_string(),
            "smoker".to_string(),
            "note".to_string(),
        ]);
        SqlRow::new(
            columns,
            vec![
                SqlValue::Integer(7),
                SqlValue::Text("Jane".to_string()),
                SqlValue::Real(12.5),
                SqlValue::Integer(1),
                SqlValue::Null,
            ],
        )
    }

    #[test]
    fn test_typed_getters() {
        let row = sample_row();
        assert_eq!(row.get_i64("id").unwrap(), 7);
        assert_eq!(row.get_text("name").unwrap(), "Jane");
        assert_eq!(row.get_f64("premium").unwrap(), 12.5);
        assert!(row.get_bool("smoker").unwrap());
        assert_eq!(row.get_opt_text("note").unwrap(), None);
        assert_eq!(row.get_opt_i64("note").unwrap(), None);
    }

    #[test]
    fn test_missing_column_errors() {
        let row = sample_row();
        let err = row.get_i64("nope").unwrap_err();
        assert!(matches!(err, AdapterError::Column { .. }));
    }

    #[test]
    fn test_type_mismatch_errors() {
        let row = sample_row();
        assert!(row.get_i64("name").is_err());
        assert!(row.get_text("id").is_err());
    }

    #[test]
    fn test_integer_widens_to_f64() {
        let row = sample_row();
        assert_eq!(row.get_f64("id").unwrap(), 7.0);
        assert_eq!(row.get_opt_f64("id").unwrap(), Some(7.0));
    }

    #[test]
    fn test_from_conversions() {
        assert_eq!(SqlValue::from(3i64), SqlValue::Integer(3));
        assert_eq!(SqlValue::from(true), SqlValue::Integer(1));
        assert_eq!(SqlValue::from("x"), SqlValue::Text("x".to_string()));
        assert_eq!(SqlValue::from(None::<i64>), SqlValue::Null);
        assert_eq!(SqlValue::from(Some(2.0)), SqlValue::Real(2.0));
    }
}
