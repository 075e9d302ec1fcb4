use crate::{
    CacheGateway, CacheOperation, Driver, Error, Options, QueryRecord, Result, SluiceError,
    SqlWriter, Statement, TelemetrySink, Value,
    error::logged,
    session::{Session, SharedSession},
    truncate_long,
};
use anyhow::Context;
use std::{cell::RefCell, rc::Rc};
use url::Url;

/// Entry point: owns the backend session and prepares statements on it.
///
/// Every [`Statement`] prepared here shares the backend, the prepared statement registry, the
/// cache gateway and the telemetry sink of the connection. Use from a single thread, one
/// operation at a time: overlapping use fails with [`SluiceError::ConnectionBusy`].
pub struct Connection<D: Driver> {
    session: SharedSession<D>,
}

impl<D: Driver> Connection<D> {
    /// A connection that is not open yet, see [`Connection::open`].
    pub fn new(driver: D, options: Options) -> Self {
        Self {
            session: Rc::new(RefCell::new(Session::new(driver, options))),
        }
    }

    /// Create the driver and open the connection. The `sluice_*` url parameters configure the
    /// connection, the rest of the url goes to the driver.
    pub fn connect(url: &str) -> Result<Self>
    where
        D: Default,
    {
        let context = || format!("While trying to connect to `{}`", truncate_long!(url));
        let mut url = Url::parse(url).with_context(context).map_err(logged)?;
        let options = Options::from_url(&mut url)
            .with_context(context)
            .map_err(logged)?;
        let connection = Self::new(D::default(), options);
        connection.open(url.as_str())?;
        Ok(connection)
    }

    /// Open (or reopen after [`Connection::disconnect`]) the backend connection.
    pub fn open(&self, url: &str) -> Result<()> {
        let mut session = Session::borrow(&self.session)?;
        if session.connected {
            return Err(logged(
                Error::new(SluiceError::AlreadyConnected).context("While opening the connection"),
            ));
        }
        session
            .driver
            .connect(url)
            .with_context(|| format!("While connecting the {} driver", D::NAME))
            .map_err(logged)?;
        session.connected = true;
        Ok(())
    }

    pub fn with_cache(self, cache: impl CacheGateway + 'static) -> Self {
        self.session.borrow_mut().cache = Some(Box::new(cache));
        self
    }

    pub fn with_telemetry(self, sink: impl TelemetrySink + 'static) -> Self {
        self.session.borrow_mut().telemetry = Some(Box::new(sink));
        self
    }

    pub fn options(&self) -> Options {
        self.session.borrow().options.clone()
    }

    pub fn is_connected(&self) -> bool {
        self.session.borrow().connected
    }

    pub fn in_transaction(&self) -> bool {
        self.session.borrow().in_transaction
    }

    pub fn sql_writer(&self) -> D::SqlWriter {
        self.session.borrow().driver.sql_writer()
    }

    /// Deallocate the prepared statements and close the backend connection.
    pub fn disconnect(&self) -> Result<()> {
        let mut session = Session::borrow(&self.session)?;
        session.ensure_connected().map_err(logged)?;
        if session.in_transaction {
            return Err(logged(
                Error::new(SluiceError::TransactionOpen).context("While disconnecting"),
            ));
        }
        if let Err(e) = session.clear_registry() {
            log::warn!("{:#}", e.context("While deallocating the prepared statements"));
        }
        session.connected = false;
        session
            .driver
            .disconnect()
            .with_context(|| format!("While disconnecting the {} driver", D::NAME))
            .map_err(logged)
    }

    /// A statement for `template`, not executed yet.
    pub fn prepare(&self, template: impl Into<String>) -> Statement<D> {
        Statement::new(self.session.clone(), template.into(), self.sql_writer())
    }

    /// Execute `template` with `args` and return the number of rows affected.
    #[track_caller]
    pub fn execute(&self, template: &str, args: &[Value]) -> Result<u64> {
        let mut statement = self.prepare(template);
        statement.execute(args)?;
        Ok(statement.rows())
    }

    /// Execute `template` with `args`, the rows are read from the returned statement.
    #[track_caller]
    pub fn query(&self, template: &str, args: &[Value]) -> Result<Statement<D>> {
        let mut statement = self.prepare(template);
        statement.execute(args)?;
        Ok(statement)
    }

    /// Insert one record, given as ordered `(column, value)` pairs, into `table` (`schema.name`
    /// or `name`). With `returning` and a backend that supports it the inserted row can be read
    /// from the returned statement.
    #[track_caller]
    pub fn insert(
        &self,
        table: &str,
        record: &[(&str, Value)],
        returning: bool,
    ) -> Result<Statement<D>> {
        let (schema, name) = split_table(table);
        let columns: Vec<&str> = record.iter().map(|(k, _)| *k).collect();
        let args: Vec<Value> = record.iter().map(|(_, v)| v.clone()).collect();
        let mut sql = String::with_capacity(64);
        let placeholder = self.options().placeholder;
        self.sql_writer()
            .write_insert(&mut sql, name, schema, &columns, placeholder, returning);
        self.query(&sql, &args)
    }

    /// Update `table` setting the `record` columns. `condition` is written after `WHERE`
    /// (nothing when empty) and may use positional placeholders bound to `condition_args`.
    #[track_caller]
    pub fn update(
        &self,
        table: &str,
        record: &[(&str, Value)],
        condition: &str,
        condition_args: &[Value],
        returning: bool,
    ) -> Result<Statement<D>> {
        let (schema, name) = split_table(table);
        let columns: Vec<&str> = record.iter().map(|(k, _)| *k).collect();
        let args: Vec<Value> = record
            .iter()
            .map(|(_, v)| v.clone())
            .chain(condition_args.iter().cloned())
            .collect();
        let mut sql = String::with_capacity(64);
        let placeholder = self.options().placeholder;
        self.sql_writer().write_update(
            &mut sql,
            name,
            schema,
            &columns,
            placeholder,
            condition,
            returning,
        );
        self.query(&sql, &args)
    }

    pub fn begin(&self) -> Result<()> {
        let mut session = Session::borrow(&self.session)?;
        session.ensure_connected().map_err(logged)?;
        if session.in_transaction {
            return Err(logged(SluiceError::TransactionOpen));
        }
        session
            .driver
            .begin()
            .context("While beginning a transaction")
            .map_err(logged)?;
        session.in_transaction = true;
        Ok(())
    }

    pub fn commit(&self) -> Result<()> {
        let mut session = Session::borrow(&self.session)?;
        session.ensure_connected().map_err(logged)?;
        if !session.in_transaction {
            return Err(logged(
                Error::new(SluiceError::NoTransaction).context("While committing"),
            ));
        }
        session.in_transaction = false;
        session
            .driver
            .commit()
            .context("While committing a transaction")
            .map_err(logged)
    }

    pub fn rollback(&self) -> Result<()> {
        let mut session = Session::borrow(&self.session)?;
        session.ensure_connected().map_err(logged)?;
        if !session.in_transaction {
            return Err(logged(
                Error::new(SluiceError::NoTransaction).context("While rolling back"),
            ));
        }
        session.in_transaction = false;
        session
            .driver
            .rollback()
            .context("While rolling back a transaction")
            .map_err(logged)
    }

    /// Run `f` inside a transaction: committed when `f` succeeds, rolled back when it fails.
    /// When a transaction is already open `f` joins it.
    pub fn transaction<T>(&self, f: impl FnOnce(&Self) -> Result<T>) -> Result<T> {
        if self.in_transaction() {
            return f(self);
        }
        self.begin()?;
        match f(self) {
            Ok(v) => {
                self.commit()?;
                Ok(v)
            }
            Err(e) => {
                if let Err(rollback) = self.rollback() {
                    return Err(e.context(format!("Rollback failed too: {:#}", rollback)));
                }
                Err(e)
            }
        }
    }

    /// Remove `key` from the cache gateway.
    pub fn invalidate(&self, key: &str) -> Result<()> {
        let mut session = Session::borrow(&self.session)?;
        match session.cache.as_mut() {
            Some(cache) => cache
                .delete(key)
                .with_context(|| SluiceError::Cache {
                    operation: CacheOperation::Delete,
                    key: key.to_owned(),
                })
                .map_err(logged),
            None => Ok(()),
        }
    }

    /// Snapshot of the telemetry sink.
    pub fn telemetry_records(&self) -> Vec<QueryRecord> {
        self.session
            .borrow()
            .telemetry
            .as_ref()
            .map(|v| v.records())
            .unwrap_or_default()
    }

    /// Number of statements currently prepared on the backend under a name.
    pub fn registered_statements(&self) -> usize {
        self.session.borrow().registry.len()
    }
}

fn split_table(table: &str) -> (&str, &str) {
    table.split_once('.').unwrap_or(("", table))
}
