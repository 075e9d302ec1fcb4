use crate::{
    ArgsDisplay, BindStrategy, CacheGateway, Compiled, Driver, Error, Ledger, Options,
    PreparedRegistry, Result, SluiceError, TelemetrySink, truncate_long,
};
use anyhow::Context;
use std::{
    cell::{RefCell, RefMut},
    rc::Rc,
};

/// State shared by a connection and every statement it prepares.
pub(crate) struct Session<D: Driver> {
    pub(crate) driver: D,
    pub(crate) connected: bool,
    pub(crate) in_transaction: bool,
    pub(crate) options: Options,
    pub(crate) registry: PreparedRegistry,
    pub(crate) cache: Option<Box<dyn CacheGateway>>,
    pub(crate) telemetry: Option<Box<dyn TelemetrySink>>,
}

pub(crate) type SharedSession<D> = Rc<RefCell<Session<D>>>;

impl<D: Driver> Session<D> {
    pub(crate) fn new(driver: D, options: Options) -> Self {
        Self {
            driver,
            connected: false,
            in_transaction: false,
            registry: PreparedRegistry::new(options.registry_retention),
            cache: None,
            telemetry: options.telemetry.then(|| {
                Box::new(Ledger::new(options.telemetry_retention)) as Box<dyn TelemetrySink>
            }),
            options,
        }
    }

    /// Exclusive access, failing when another operation holds the session.
    pub(crate) fn borrow(session: &SharedSession<D>) -> Result<RefMut<'_, Session<D>>> {
        session
            .try_borrow_mut()
            .map_err(|_| Error::new(SluiceError::ConnectionBusy))
    }

    pub(crate) fn ensure_connected(&self) -> Result<()> {
        if !self.connected {
            return Err(SluiceError::NotConnected.into());
        }
        Ok(())
    }

    fn backend_error(&self, error: Error, compiled: &Compiled) -> Error {
        let message = self
            .driver
            .last_error()
            .unwrap_or_else(|| format!("{:#}", error));
        error.context(SluiceError::Backend {
            backend: D::NAME,
            message,
            query: truncate_long!(compiled.sql).to_string(),
            args: ArgsDisplay(compiled.args.clone()),
        })
    }

    /// Send a compiled statement to the backend.
    ///
    /// Statements carrying parameter markers are prepared once per distinct text under a
    /// generated name and executed by name afterwards.
    pub(crate) fn run(&mut self, compiled: &Compiled) -> Result<D::Cursor> {
        match self.options.strategy {
            BindStrategy::InlineLiteral => self
                .driver
                .run_query(&compiled.sql)
                .map_err(|e| self.backend_error(e, compiled)),
            BindStrategy::ParameterMarker => {
                let name = match self.registry.get(&compiled.sql) {
                    Some(name) => name.to_owned(),
                    None => {
                        let name = self.registry.next_name();
                        if let Err(e) = self.driver.prepare_named(&name, &compiled.sql) {
                            return Err(self.backend_error(e, compiled));
                        }
                        for evicted in self.registry.insert(compiled.sql.clone(), name.clone()) {
                            self.driver.deallocate_named(&evicted).with_context(|| {
                                format!("While deallocating the prepared statement `{evicted}`")
                            })?;
                        }
                        name
                    }
                };
                self.driver
                    .execute_named(&name, &compiled.args)
                    .map_err(|e| self.backend_error(e, compiled))
            }
        }
    }

    /// Deallocate every registered statement, keep going on failure and report the first one.
    pub(crate) fn clear_registry(&mut self) -> Result<()> {
        let mut result = Ok(());
        for name in self.registry.clear() {
            if let Err(e) = self.driver.deallocate_named(&name)
                && result.is_ok()
            {
                result = Err(e);
            }
        }
        result
    }
}
