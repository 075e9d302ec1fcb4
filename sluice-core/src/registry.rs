use crate::Retention;
use std::collections::{HashMap, VecDeque};

/// Statements prepared on the backend under a name, keyed by their full SQL text.
///
/// A text is registered at most once per connection.
#[derive(Debug, Default)]
pub struct PreparedRegistry {
    names: HashMap<String, String>,
    order: VecDeque<String>,
    retention: Retention,
    counter: u64,
}

impl PreparedRegistry {
    pub fn new(retention: Retention) -> Self {
        Self {
            retention,
            ..Default::default()
        }
    }

    pub fn get(&self, sql: &str) -> Option<&str> {
        self.names.get(sql).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// A name not handed out before on this registry.
    pub fn next_name(&mut self) -> String {
        self.counter += 1;
        format!("sluice_{}", self.counter)
    }

    /// Register `sql` under `name`, returning the names evicted to respect the retention, which
    /// the caller must deallocate on the backend.
    pub fn insert(&mut self, sql: String, name: String) -> Vec<String> {
        log::debug!("Registered prepared statement `{}`", name);
        if let Some(previous) = self.names.insert(sql.clone(), name) {
            self.order.retain(|v| *v != sql);
            self.order.push_back(sql);
            return vec![previous];
        }
        self.order.push_back(sql);
        let mut evicted = Vec::new();
        // The statement just registered is never evicted
        let excess = self
            .retention
            .excess(self.names.len())
            .min(self.names.len() - 1);
        for _ in 0..excess {
            if let Some(oldest) = self.order.pop_front()
                && let Some(name) = self.names.remove(&oldest)
            {
                log::warn!("Evicting prepared statement `{}`", name);
                evicted.push(name);
            }
        }
        evicted
    }

    /// Forget every statement, returning their names.
    pub fn clear(&mut self) -> Vec<String> {
        self.order.clear();
        self.names.drain().map(|(_, v)| v).collect()
    }
}
