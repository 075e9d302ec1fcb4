use crate::{ResultSource, Retention, collapse_whitespace};
use std::{collections::VecDeque, panic::Location, time::Duration};

/// One execution of a statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRecord {
    /// Executed SQL with whitespace collapsed.
    pub query: String,
    pub elapsed: Duration,
    /// Where `execute` was called from.
    pub caller: &'static Location<'static>,
    /// Where the rows came from.
    pub source: ResultSource,
}

impl QueryRecord {
    pub fn new(
        query: &str,
        elapsed: Duration,
        caller: &'static Location<'static>,
        source: ResultSource,
    ) -> Self {
        Self {
            query: collapse_whitespace(query).into_owned(),
            elapsed,
            caller,
            source,
        }
    }
}

/// Receiver of [`QueryRecord`]s, owned by the connection.
pub trait TelemetrySink {
    fn record(&mut self, record: QueryRecord);
    /// Records still held, oldest first.
    fn records(&self) -> Vec<QueryRecord>;
}

/// In-memory [`TelemetrySink`] keeping the most recent records.
#[derive(Debug, Default)]
pub struct Ledger {
    records: VecDeque<QueryRecord>,
    retention: Retention,
}

impl Ledger {
    pub fn new(retention: Retention) -> Self {
        Self {
            records: Default::default(),
            retention,
        }
    }
    pub fn total_elapsed(&self) -> Duration {
        self.records.iter().map(|v| v.elapsed).sum()
    }
}

impl TelemetrySink for Ledger {
    fn record(&mut self, record: QueryRecord) {
        log::trace!(
            "{} from {} in {:?} at {}",
            record.query,
            record.source,
            record.elapsed,
            record.caller
        );
        self.records.push_back(record);
        let excess = self.retention.excess(self.records.len());
        self.records.drain(..excess);
    }

    fn records(&self) -> Vec<QueryRecord> {
        self.records.iter().cloned().collect()
    }
}
