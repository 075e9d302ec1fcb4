use crate::{
    Bind, BindType, CacheHolder, CacheOperation, Compiled, Cursor, Driver, Error, QueryRecord,
    Result, ResultSource, RowLabeled, SluiceError, Value, compile, convert_row, is_read_query,
    session::{Session, SharedSession},
    truncate_long,
};
use anyhow::Context;
use std::{
    collections::{HashMap, VecDeque, hash_map::Entry},
    fmt::{self, Debug},
    panic::Location,
    time::{Duration, Instant},
};

/// A query template with its binds, executable any number of times.
///
/// Created by [`crate::Connection::prepare`], it shares the backend of its connection. After
/// [`Statement::execute`] the rows are read with the same accessors whether they come from the
/// backend or from the cache.
pub struct Statement<D: Driver> {
    session: SharedSession<D>,
    writer: D::SqlWriter,
    template: String,
    binds: Vec<Bind>,
    holder: Option<CacheHolder>,
    cursor: Option<D::Cursor>,
    source: ResultSource,
    cache_hit: bool,
    rows: u64,
    last_insert_id: Option<u64>,
    convert: bool,
    /// Values of the row `fetch` is consuming.
    pending: Option<VecDeque<Value>>,
    compiled: Option<Compiled>,
}

impl<D: Driver> Statement<D> {
    pub(crate) fn new(session: SharedSession<D>, template: String, writer: D::SqlWriter) -> Self {
        Self {
            session,
            writer,
            template,
            binds: Vec::new(),
            holder: None,
            cursor: None,
            source: ResultSource::Uninitialized,
            cache_hit: false,
            rows: 0,
            last_insert_id: None,
            convert: false,
            pending: None,
            compiled: None,
        }
    }

    /// The query template.
    pub fn query(&self) -> &str {
        &self.template
    }

    /// SQL sent to the backend by the last execution.
    pub fn compiled(&self) -> Option<&Compiled> {
        self.compiled.as_ref()
    }

    pub fn binds(&self) -> &[Bind] {
        &self.binds
    }

    /// Bind `:name` with the type inferred from the value.
    pub fn bind(&mut self, name: impl AsRef<str>, value: impl Into<Value>) -> &mut Self {
        self.binds.push(Bind::infer(name, value));
        self
    }

    /// Bind `:name` checking the value against the declared type now.
    pub fn bind_typed(
        &mut self,
        name: impl AsRef<str>,
        value: impl Into<Value>,
        ty: BindType,
    ) -> Result<&mut Self> {
        self.binds.push(Bind::new(name, value, ty)?);
        Ok(self)
    }

    pub fn push_bind(&mut self, bind: Bind) -> &mut Self {
        self.binds.push(bind);
        self
    }

    pub fn clear_bindings(&mut self) -> &mut Self {
        self.binds.clear();
        self
    }

    /// Serve the result from the cache under `key`, storing it there on a miss. A zero `ttl`
    /// never expires. Only read queries can be cached.
    pub fn cache(&mut self, key: impl Into<String>, ttl: Duration) -> Result<&mut Self> {
        if !is_read_query(&self.template) {
            let error = Error::new(SluiceError::CachingNonRead(
                truncate_long!(self.template).to_string(),
            ));
            log::error!("{:#}", error);
            return Err(error);
        }
        self.holder = Some(CacheHolder::new(key, ttl));
        Ok(self)
    }

    /// Stop caching the result.
    pub fn no_cache(&mut self) -> &mut Self {
        self.holder = None;
        self
    }

    pub fn cache_key(&self) -> Option<&str> {
        self.holder.as_ref().map(|v| v.key.as_str())
    }

    fn reset(&mut self) {
        self.cursor = None;
        self.source = ResultSource::Uninitialized;
        self.cache_hit = false;
        self.rows = 0;
        self.last_insert_id = None;
        self.pending = None;
        self.compiled = None;
        if let Some(holder) = self.holder.as_mut() {
            holder.payload.clear();
        }
    }

    /// Run the statement with the positional `args` (nested lists are flattened).
    ///
    /// The previous result is discarded, so a statement can be executed again. Every execution
    /// reaching the session is recorded by the telemetry sink, a failed one with the
    /// [`ResultSource::Uninitialized`] source.
    #[track_caller]
    pub fn execute(&mut self, args: &[Value]) -> Result<&mut Self> {
        let caller = Location::caller();
        let started = Instant::now();
        self.reset();
        let session = self.session.clone();
        let mut session = Session::borrow(&session)?;
        let result = self.run(&mut session, args);
        if let Some(telemetry) = session.telemetry.as_mut() {
            let query = self
                .compiled
                .as_ref()
                .map_or(self.template.as_str(), |v| v.sql.as_str());
            let source = *result.as_ref().unwrap_or(&ResultSource::Uninitialized);
            telemetry.record(QueryRecord::new(query, started.elapsed(), caller, source));
        }
        if let Err(e) = result {
            let e = e.context(format!(
                "While executing the query:\n{}",
                truncate_long!(self.template)
            ));
            log::error!("{:#}", e);
            self.reset();
            return Err(e);
        }
        Ok(self)
    }

    /// Compile, then answer from the cache or the backend. Returns where the rows came from.
    fn run(&mut self, session: &mut Session<D>, args: &[Value]) -> Result<ResultSource> {
        session.ensure_connected()?;
        let compiled = compile(
            &self.writer,
            &self.template,
            args,
            &self.binds,
            session.options.strategy,
            session.options.placeholder,
        )?;
        log::debug!("Compiled query: {}", truncate_long!(compiled.sql));
        self.compiled = Some(compiled.clone());
        self.convert = session.options.convert_types;
        let cached = match (self.holder.as_ref(), session.cache.as_mut()) {
            (Some(holder), Some(cache)) => cache.get(&holder.key).with_context(|| {
                SluiceError::Cache {
                    operation: CacheOperation::Get,
                    key: holder.key.clone(),
                }
            })?,
            _ => None,
        };
        Ok(match cached {
            Some(rows) => {
                if let Some(holder) = self.holder.as_mut() {
                    log::debug!("Cache hit for `{}`", holder.key);
                    holder.payload = rows.into();
                    self.rows = holder.payload.len() as u64;
                }
                self.source = ResultSource::Cache;
                self.cache_hit = true;
                ResultSource::Cache
            }
            None => {
                let mut cursor = session.run(&compiled)?;
                self.last_insert_id = cursor.last_insert_id();
                match (self.holder.as_mut(), session.cache.as_mut()) {
                    (Some(holder), Some(cache)) => {
                        log::debug!("Cache miss for `{}`", holder.key);
                        let mut payload = VecDeque::new();
                        while let Some(row) = cursor.fetch_row()? {
                            payload.push_back(if self.convert {
                                convert_row(&self.writer, &cursor, row)
                            } else {
                                row
                            });
                        }
                        cache
                            .set(&holder.key, payload.make_contiguous(), holder.ttl)
                            .with_context(|| SluiceError::Cache {
                                operation: CacheOperation::Set,
                                key: holder.key.clone(),
                            })?;
                        self.rows = payload.len() as u64;
                        holder.payload = payload;
                        self.source = ResultSource::Cache;
                    }
                    _ => {
                        self.rows = cursor.rows();
                        self.cursor = Some(cursor);
                        self.source = ResultSource::Backend;
                    }
                }
                ResultSource::Backend
            }
        })
    }

    /// Where the rows are currently read from.
    pub fn result_source(&self) -> ResultSource {
        self.source
    }

    /// Whether the last execution was answered by the cache without reaching the backend.
    pub fn cache_hit(&self) -> bool {
        self.cache_hit
    }

    /// Rows returned or affected by the last execution. Consuming rows does not change it.
    pub fn rows(&self) -> u64 {
        self.rows
    }

    pub fn last_insert_id(&self) -> Option<u64> {
        self.last_insert_id
    }

    /// The next row, `None` once the result is exhausted.
    pub fn fetch_row(&mut self) -> Result<Option<RowLabeled>> {
        match self.source {
            ResultSource::Uninitialized => Err(SluiceError::NotExecuted.into()),
            ResultSource::Cache => Ok(self.holder.as_mut().and_then(|v| v.payload.pop_front())),
            ResultSource::Backend => {
                let Some(cursor) = self.cursor.as_mut() else {
                    return Ok(None);
                };
                let row = cursor.fetch_row().map_err(|e| {
                    let e = e.context(format!(
                        "While fetching a row of the query:\n{}",
                        truncate_long!(self.template)
                    ));
                    log::error!("{:#}", e);
                    e
                })?;
                Ok(match row {
                    Some(row) if self.convert => Some(convert_row(&self.writer, &*cursor, row)),
                    row => row,
                })
            }
        }
    }

    /// All the remaining rows, in order.
    pub fn fetch_row_set(&mut self) -> Result<Vec<RowLabeled>> {
        let mut result = Vec::new();
        while let Some(row) = self.fetch_row()? {
            result.push(row);
        }
        Ok(result)
    }

    /// All the remaining rows keyed by the value of `column`, which must be unique.
    pub fn fetch_row_set_by(&mut self, column: &str) -> Result<HashMap<Value, RowLabeled>> {
        let mut result = HashMap::new();
        while let Some(row) = self.fetch_row()? {
            let Some(key) = row.get_column(column).cloned() else {
                let error = Error::new(SluiceError::MissingKeyColumn(column.to_owned()));
                log::error!("{:#}", error);
                return Err(error);
            };
            match result.entry(key) {
                Entry::Occupied(entry) => {
                    let error = Error::new(SluiceError::DuplicateKey {
                        column: column.to_owned(),
                        value: entry.key().clone(),
                    });
                    log::error!("{:#}", error);
                    return Err(error);
                }
                Entry::Vacant(entry) => {
                    entry.insert(row);
                }
            }
        }
        Ok(result)
    }

    /// The next value of the first unconsumed row, left to right. Once that row is exhausted
    /// it returns `None` until the statement is executed again.
    pub fn fetch(&mut self) -> Result<Option<Value>> {
        if self.pending.is_none() {
            let row = self.fetch_row()?;
            self.pending = Some(row.map(|v| v.values.into_vec().into()).unwrap_or_default());
        }
        Ok(self.pending.as_mut().and_then(VecDeque::pop_front))
    }
}

impl<D: Driver> Debug for Statement<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Statement")
            .field("template", &self.template)
            .field("binds", &self.binds)
            .field("cache_key", &self.cache_key())
            .field("source", &self.source)
            .field("rows", &self.rows)
            .finish()
    }
}
