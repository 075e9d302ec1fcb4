use crate::{AsValue, Error, Result, Value};
use std::{
    fmt::{self, Display},
    sync::Arc,
};

/// Shared reference-counted column name list.
pub type RowNames = Arc<[String]>;
/// Owned row value slice matching `RowNames` length.
pub type Row = Box<[Value]>;

/// A result row with its corresponding column labels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowLabeled {
    /// Column names.
    pub labels: RowNames,
    /// Data values (aligned by index with `labels`).
    pub values: Row,
}

impl RowLabeled {
    pub fn new(names: RowNames, values: Row) -> Self {
        Self {
            labels: names,
            values,
        }
    }
    pub fn names(&self) -> &[String] {
        &self.labels
    }
    pub fn values(&self) -> &[Value] {
        &self.values
    }
    pub fn len(&self) -> usize {
        self.values.len()
    }
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
    pub fn get_column(&self, name: &str) -> Option<&Value> {
        self.labels
            .iter()
            .position(|v| v == name)
            .map(|i| &self.values()[i])
    }
    /// Convert the value of column `name`.
    pub fn get<T: AsValue>(&self, name: &str) -> Result<T> {
        let value = self
            .get_column(name)
            .ok_or_else(|| Error::msg(format!("Column `{name}` is not present in the row")))?;
        T::try_from_value(value.clone())
    }
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.labels
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }
}

impl From<RowLabeled> for Row {
    fn from(value: RowLabeled) -> Self {
        value.values
    }
}

/// Where the current result of a statement is served from.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultSource {
    #[default]
    Uninitialized,
    /// Rows are read from the backend cursor.
    Backend,
    /// Rows are read from the cache payload.
    Cache,
}

impl Display for ResultSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ResultSource::Uninitialized => "uninitialized",
            ResultSource::Backend => "backend",
            ResultSource::Cache => "cache",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_access() {
        let row = RowLabeled::new(
            ["id".to_string(), "name".to_string()].into(),
            [Value::Int64(Some(3)), Value::Varchar(Some("x".into()))].into(),
        );
        assert_eq!(row.get::<i32>("id").unwrap(), 3);
        assert_eq!(row.get::<String>("name").unwrap(), "x");
        assert!(row.get::<i32>("missing").is_err());
        assert_eq!(
            row.iter().map(|(k, _)| k).collect::<Vec<_>>(),
            vec!["id", "name"]
        );
    }
}
