use sluice_core::{Cursor, Result, RowLabeled};
use std::collections::{HashMap, VecDeque};

/// Rows of one Postgres call, fully received.
#[derive(Debug, Default)]
pub struct PostgresCursor {
    pub(crate) rows: VecDeque<RowLabeled>,
    pub(crate) count: u64,
    pub(crate) types: HashMap<String, String>,
}

impl Cursor for PostgresCursor {
    fn fetch_row(&mut self) -> Result<Option<RowLabeled>> {
        Ok(self.rows.pop_front())
    }
    fn rows(&self) -> u64 {
        self.count
    }
    fn column_type(&self, column: &str) -> Option<&str> {
        self.types.get(column).map(String::as_str)
    }
}
