use crate::{Result, Retention, RowLabeled};
use regex::Regex;
use std::{
    collections::{HashMap, VecDeque},
    sync::LazyLock,
    time::{Duration, Instant},
};

/// Storage of materialized query results.
///
/// Errors are not swallowed by the caller: a failing `get` or `set` fails the execution.
pub trait CacheGateway {
    /// The payload stored under `key`, `None` on a miss.
    fn get(&mut self, key: &str) -> Result<Option<Vec<RowLabeled>>>;
    /// Store `rows` under `key`. A zero `ttl` never expires.
    fn set(&mut self, key: &str, rows: &[RowLabeled], ttl: Duration) -> Result<()>;
    fn delete(&mut self, key: &str) -> Result<()>;
}

struct Entry {
    rows: Vec<RowLabeled>,
    expires: Option<Instant>,
}

/// In-process [`CacheGateway`] with per entry expiry.
#[derive(Default)]
pub struct MemoryCache {
    entries: HashMap<String, Entry>,
    order: VecDeque<String>,
    retention: Retention,
}

impl MemoryCache {
    pub fn new(retention: Retention) -> Self {
        Self {
            retention,
            ..Default::default()
        }
    }
    pub fn len(&self) -> usize {
        self.entries.len()
    }
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
    fn remove(&mut self, key: &str) {
        if self.entries.remove(key).is_some() {
            self.order.retain(|v| v != key);
        }
    }
}

impl CacheGateway for MemoryCache {
    fn get(&mut self, key: &str) -> Result<Option<Vec<RowLabeled>>> {
        let expired = match self.entries.get(key) {
            None => return Ok(None),
            Some(entry) => entry.expires.is_some_and(|v| v <= Instant::now()),
        };
        if expired {
            log::debug!("Cache entry `{}` expired", key);
            self.remove(key);
            return Ok(None);
        }
        Ok(self.entries.get(key).map(|v| v.rows.clone()))
    }

    fn set(&mut self, key: &str, rows: &[RowLabeled], ttl: Duration) -> Result<()> {
        self.remove(key);
        self.entries.insert(
            key.to_owned(),
            Entry {
                rows: rows.to_vec(),
                expires: (!ttl.is_zero()).then(|| Instant::now() + ttl),
            },
        );
        self.order.push_back(key.to_owned());
        for _ in 0..self.retention.excess(self.entries.len()) {
            if let Some(oldest) = self.order.pop_front() {
                log::debug!("Cache entry `{}` evicted", oldest);
                self.entries.remove(&oldest);
            }
        }
        Ok(())
    }

    fn delete(&mut self, key: &str) -> Result<()> {
        self.remove(key);
        Ok(())
    }
}

/// Per statement cache state: the key, the time to live and the rows still to be consumed.
#[derive(Debug, Clone)]
pub struct CacheHolder {
    pub key: String,
    pub ttl: Duration,
    pub payload: VecDeque<RowLabeled>,
}

impl CacheHolder {
    pub fn new(key: impl Into<String>, ttl: Duration) -> Self {
        Self {
            key: key.into(),
            ttl,
            payload: Default::default(),
        }
    }
}

/// Whether the statement only reads, which is what a cached result may stand in for.
pub fn is_read_query(query: &str) -> bool {
    static READ: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(
            r"(?is)^(?:\s+|--[^\n]*(?:\n|$)|/\*.*?\*/|\()*(?:SELECT|WITH|SHOW|VALUES|TABLE|EXPLAIN|DESCRIBE|DESC)\b",
        )
        .unwrap()
    });
    READ.is_match(query)
}
