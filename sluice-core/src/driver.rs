use crate::{Result, RowLabeled, SqlWriter, Value};

/// Result of one backend call.
///
/// Rows are handed out one at a time, each call consumes one. `rows` is the number of rows
/// the backend returned or affected and does not change as rows are consumed.
pub trait Cursor {
    fn fetch_row(&mut self) -> Result<Option<RowLabeled>>;
    fn rows(&self) -> u64;
    /// Identifier generated by the backend for an inserted row.
    fn last_insert_id(&self) -> Option<u64> {
        None
    }
    /// Backend type name of a result column.
    fn column_type(&self, column: &str) -> Option<&str> {
        let _ = column;
        None
    }
}

/// Capability interface of a database backend.
///
/// Each backend implements exactly these operations, everything else (compilation, caching,
/// statement reuse, row mapping) is layered on top by [`crate::Connection`].
pub trait Driver {
    type SqlWriter: SqlWriter;
    type Cursor: Cursor;

    /// Short backend name, used in diagnostics and as the url scheme.
    const NAME: &'static str;

    fn connect(&mut self, url: &str) -> Result<()>;
    fn disconnect(&mut self) -> Result<()>;
    fn sql_writer(&self) -> Self::SqlWriter;

    /// Run plain SQL.
    fn run_query(&mut self, sql: &str) -> Result<Self::Cursor>;
    /// Prepare `sql` (with parameter markers) on the backend under `name`.
    fn prepare_named(&mut self, name: &str, sql: &str) -> Result<()>;
    fn execute_named(&mut self, name: &str, args: &[Value]) -> Result<Self::Cursor>;
    fn deallocate_named(&mut self, name: &str) -> Result<()>;

    fn begin(&mut self) -> Result<()> {
        self.run_query("BEGIN").map(|_| ())
    }
    fn commit(&mut self) -> Result<()> {
        self.run_query("COMMIT").map(|_| ())
    }
    fn rollback(&mut self) -> Result<()> {
        self.run_query("ROLLBACK").map(|_| ())
    }

    /// Text of the last backend error, if the backend keeps one.
    fn last_error(&self) -> Option<String> {
        None
    }
}
