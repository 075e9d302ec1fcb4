#![allow(dead_code)]
use log::LevelFilter;
use sluice::{
    CacheGateway, Connection, Cursor, Driver, Error, MemoryCache, Options, Result, RowLabeled,
    RowNames, SqlWriter, Value,
};
use std::{
    cell::RefCell,
    collections::{HashMap, VecDeque},
    env,
    rc::Rc,
    time::Duration,
};

pub fn init_logs() {
    let mut logger = env_logger::builder();
    logger
        .is_test(true)
        .format_file(true)
        .format_line_number(true);
    if env::var("RUST_LOG").is_err() {
        logger.filter_level(LevelFilter::Warn);
    }
    let _ = logger.try_init();
}

/// Backend call observed by the scripted driver.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Connect(String),
    Disconnect,
    Query(String),
    Prepare(String, String),
    Execute(String, Vec<Value>),
    Deallocate(String),
    Begin,
    Commit,
    Rollback,
}

/// Canned result handed out by the scripted driver, in order.
#[derive(Debug, Clone)]
pub enum Response {
    Rows(ScriptedCursor),
    Fail(String),
}

#[derive(Default)]
struct Script {
    calls: Vec<Call>,
    responses: VecDeque<Response>,
}

/// Shared view of what the scripted driver did and will answer.
#[derive(Clone, Default)]
pub struct Journal(Rc<RefCell<Script>>);

impl Journal {
    pub fn respond(&self, cursor: ScriptedCursor) -> &Self {
        self.0.borrow_mut().responses.push_back(Response::Rows(cursor));
        self
    }
    pub fn fail(&self, message: &str) -> &Self {
        self.0
            .borrow_mut()
            .responses
            .push_back(Response::Fail(message.into()));
        self
    }
    pub fn calls(&self) -> Vec<Call> {
        self.0.borrow().calls.clone()
    }
    pub fn clear(&self) {
        self.0.borrow_mut().calls.clear();
    }
    /// SQL of the plain queries.
    pub fn queries(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|v| match v {
                Call::Query(sql) => Some(sql),
                _ => None,
            })
            .collect()
    }
    /// Calls that produced rows: plain queries and executions by name.
    pub fn round_trips(&self) -> usize {
        self.calls()
            .iter()
            .filter(|v| matches!(v, Call::Query(..) | Call::Execute(..)))
            .count()
    }
    fn record(&self, call: Call) {
        self.0.borrow_mut().calls.push(call);
    }
    fn next(&self) -> Result<ScriptedCursor> {
        match self.0.borrow_mut().responses.pop_front() {
            Some(Response::Rows(cursor)) => Ok(cursor),
            Some(Response::Fail(message)) => Err(Error::msg(message)),
            None => Ok(ScriptedCursor::affected(0)),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ScriptedCursor {
    rows: VecDeque<RowLabeled>,
    count: u64,
    last_insert_id: Option<u64>,
    types: HashMap<String, String>,
}

impl ScriptedCursor {
    pub fn rows(labels: &[&str], rows: Vec<Vec<Value>>) -> Self {
        let labels: RowNames = labels.iter().map(|v| v.to_string()).collect();
        let rows: VecDeque<_> = rows
            .into_iter()
            .map(|v| RowLabeled::new(labels.clone(), v.into()))
            .collect();
        Self {
            count: rows.len() as u64,
            rows,
            ..Default::default()
        }
    }
    pub fn affected(count: u64) -> Self {
        Self {
            count,
            ..Default::default()
        }
    }
    pub fn with_insert_id(mut self, id: u64) -> Self {
        self.last_insert_id = Some(id);
        self
    }
    pub fn with_types(mut self, types: &[(&str, &str)]) -> Self {
        self.types = types
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        self
    }
}

impl Cursor for ScriptedCursor {
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

#[derive(Debug, Clone, Copy, Default)]
pub struct ScriptedSqlWriter {
    pub returning: bool,
}

impl SqlWriter for ScriptedSqlWriter {
    fn write_parameter_marker(&self, out: &mut String, index: usize) {
        out.push('$');
        out.push_str(&index.to_string());
    }
    fn supports_returning(&self) -> bool {
        self.returning
    }
}

/// In-memory driver answering from a [`Journal`] script.
#[derive(Default)]
pub struct ScriptedDriver {
    journal: Journal,
    returning: bool,
    last_error: Option<String>,
}

impl ScriptedDriver {
    pub fn new(journal: Journal) -> Self {
        Self {
            journal,
            ..Default::default()
        }
    }
    pub fn with_returning(mut self) -> Self {
        self.returning = true;
        self
    }
    fn answer(&mut self) -> Result<ScriptedCursor> {
        let result = self.journal.next();
        self.last_error = result.as_ref().err().map(|e| e.to_string());
        result
    }
}

impl Driver for ScriptedDriver {
    type SqlWriter = ScriptedSqlWriter;
    type Cursor = ScriptedCursor;

    const NAME: &'static str = "scripted";

    fn connect(&mut self, url: &str) -> Result<()> {
        self.journal.record(Call::Connect(url.into()));
        Ok(())
    }
    fn disconnect(&mut self) -> Result<()> {
        self.journal.record(Call::Disconnect);
        Ok(())
    }
    fn sql_writer(&self) -> ScriptedSqlWriter {
        ScriptedSqlWriter {
            returning: self.returning,
        }
    }
    fn run_query(&mut self, sql: &str) -> Result<ScriptedCursor> {
        self.journal.record(Call::Query(sql.into()));
        self.answer()
    }
    fn prepare_named(&mut self, name: &str, sql: &str) -> Result<()> {
        self.journal.record(Call::Prepare(name.into(), sql.into()));
        Ok(())
    }
    fn execute_named(&mut self, name: &str, args: &[Value]) -> Result<ScriptedCursor> {
        self.journal.record(Call::Execute(name.into(), args.to_vec()));
        self.answer()
    }
    fn deallocate_named(&mut self, name: &str) -> Result<()> {
        self.journal.record(Call::Deallocate(name.into()));
        Ok(())
    }
    fn begin(&mut self) -> Result<()> {
        self.journal.record(Call::Begin);
        Ok(())
    }
    fn commit(&mut self) -> Result<()> {
        self.journal.record(Call::Commit);
        Ok(())
    }
    fn rollback(&mut self) -> Result<()> {
        self.journal.record(Call::Rollback);
        Ok(())
    }
    fn last_error(&self) -> Option<String> {
        self.last_error.clone()
    }
}

/// Memory cache the test keeps a handle on after giving it to the connection.
#[derive(Clone, Default)]
pub struct SharedCache(pub Rc<RefCell<MemoryCache>>);

impl CacheGateway for SharedCache {
    fn get(&mut self, key: &str) -> Result<Option<Vec<RowLabeled>>> {
        self.0.borrow_mut().get(key)
    }
    fn set(&mut self, key: &str, rows: &[RowLabeled], ttl: Duration) -> Result<()> {
        self.0.borrow_mut().set(key, rows, ttl)
    }
    fn delete(&mut self, key: &str) -> Result<()> {
        self.0.borrow_mut().delete(key)
    }
}

/// Gateway failing every operation.
pub struct BrokenCache;

impl CacheGateway for BrokenCache {
    fn get(&mut self, _key: &str) -> Result<Option<Vec<RowLabeled>>> {
        Err(Error::msg("cache server unreachable"))
    }
    fn set(&mut self, _key: &str, _rows: &[RowLabeled], _ttl: Duration) -> Result<()> {
        Err(Error::msg("cache server unreachable"))
    }
    fn delete(&mut self, _key: &str) -> Result<()> {
        Err(Error::msg("cache server unreachable"))
    }
}

pub fn connect(options: Options) -> (Connection<ScriptedDriver>, Journal) {
    connect_with(ScriptedDriver::default(), options)
}

pub fn connect_with(driver: ScriptedDriver, options: Options) -> (Connection<ScriptedDriver>, Journal) {
    init_logs();
    let journal = driver.journal.clone();
    let connection = Connection::new(driver, options);
    connection
        .open("scripted://test")
        .expect("The scripted driver always connects");
    journal.clear();
    (connection, journal)
}
