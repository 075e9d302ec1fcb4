use sluice_core::{Cursor, Result, RowLabeled};
use std::collections::{HashMap, VecDeque};

/// Rows of one MySQL call, fully received.
#[derive(Debug, Default)]
pub struct MySQLCursor {
    pub(crate) rows: VecDeque<RowLabeled>,
    pub(crate) count: u64,
    pub(crate) last_insert_id: Option<u64>,
    pub(crate) types: HashMap<String, String>,
}

impl Cursor for MySQLCursor {
    fn fetch_row(&mut self) -> Result<Option<RowLabeled>> {
        Ok(self.rows.pop_front())
    }
    fn rows(&self) -> u64 {
        self.count
    }
    fn last_insert_id(&self) -> Option<u64> {
        self.last_insert_id
    }
    fn column_type(&self, column: &str) -> Option<&str> {
        self.types.get(column).map(String::as_str)
    }
}
