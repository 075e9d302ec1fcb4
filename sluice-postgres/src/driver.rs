use crate::{
    PostgresCursor, PostgresSqlWriter, ValueHolder,
    util::{collect_rows, tls_connector},
};
use sluice_core::{Context, Driver, Error, Result, Value, take_url_param, truncate_long};
use std::collections::HashMap;
use tokio::runtime::{Builder, Runtime};
use tokio_postgres::{Client, NoTls, Statement};
use url::Url;

/// Postgres backend over `tokio-postgres`.
///
/// Every call blocks on a current-thread runtime owned by the driver, the connection task
/// makes progress while a call is in flight.
#[derive(Default)]
pub struct PostgresDriver {
    runtime: Option<Runtime>,
    client: Option<Client>,
    statements: HashMap<String, Statement>,
    last_error: Option<String>,
}

impl PostgresDriver {
    pub fn new() -> Self {
        Self::default()
    }

    fn session(&self) -> Result<(&Runtime, &Client)> {
        match (&self.runtime, &self.client) {
            (Some(runtime), Some(client)) => Ok((runtime, client)),
            _ => Err(Error::msg("The Postgres driver is not connected")),
        }
    }

    fn remember<T>(&mut self, result: Result<T>) -> Result<T> {
        self.last_error = result.as_ref().err().map(|e| {
            match e
                .downcast_ref::<tokio_postgres::Error>()
                .and_then(tokio_postgres::Error::as_db_error)
            {
                Some(db) => format!("{}: {}", db.code().code(), db.message()),
                None => format!("{:#}", e),
            }
        });
        result
    }
}

impl Driver for PostgresDriver {
    type SqlWriter = PostgresSqlWriter;
    type Cursor = PostgresCursor;

    const NAME: &'static str = "postgres";

    fn connect(&mut self, url: &str) -> Result<()> {
        let context = || format!("While trying to connect to `{}`", truncate_long!(url));
        let mut url = Url::parse(url).with_context(context)?;
        if !matches!(url.scheme(), "postgres" | "postgresql") {
            let error = Error::msg("Postgres connection url must start with `postgres://`")
                .context(context());
            log::error!("{:#}", error);
            return Err(error);
        }
        let sslmode = take_url_param(&mut url, "sslmode", "PGSSLMODE").unwrap_or("disable".into());
        let tls = if sslmode == "disable" {
            None
        } else {
            Some(tls_connector(&mut url, &sslmode).with_context(context)?)
        };
        let runtime = Builder::new_current_thread().enable_all().build()?;
        let client = runtime
            .block_on(async {
                let client = match tls {
                    None => {
                        let (client, connection) =
                            tokio_postgres::connect(url.as_str(), NoTls).await?;
                        tokio::spawn(async move {
                            if let Err(e) = connection.await
                                && !e.is_closed()
                            {
                                log::error!("Postgres connection error: {:#}", e);
                            }
                        });
                        client
                    }
                    Some(connector) => {
                        let (client, connection) =
                            tokio_postgres::connect(url.as_str(), connector).await?;
                        tokio::spawn(async move {
                            if let Err(e) = connection.await
                                && !e.is_closed()
                            {
                                log::error!("Postgres connection error: {:#}", e);
                            }
                        });
                        client
                    }
                };
                Ok::<_, Error>(client)
            })
            .with_context(context)?;
        self.statements.clear();
        self.client = Some(client);
        self.runtime = Some(runtime);
        Ok(())
    }

    fn disconnect(&mut self) -> Result<()> {
        self.statements.clear();
        self.client = None;
        self.runtime = None;
        Ok(())
    }

    fn sql_writer(&self) -> PostgresSqlWriter {
        PostgresSqlWriter {}
    }

    fn run_query(&mut self, sql: &str) -> Result<PostgresCursor> {
        let result = self.session().and_then(|(runtime, client)| {
            runtime.block_on(collect_rows(
                client.query_raw(sql, Vec::<ValueHolder>::new()),
            ))
        });
        self.remember(result)
    }

    fn prepare_named(&mut self, name: &str, sql: &str) -> Result<()> {
        let result = self.session().and_then(|(runtime, client)| {
            runtime.block_on(client.prepare(sql)).map_err(Into::into)
        });
        let statement = self.remember(result)?;
        self.statements.insert(name.to_string(), statement);
        Ok(())
    }

    fn execute_named(&mut self, name: &str, args: &[Value]) -> Result<PostgresCursor> {
        let result = self
            .statements
            .get(name)
            .ok_or_else(|| Error::msg(format!("Prepared statement `{name}` does not exist")))
            .and_then(|statement| {
                let (runtime, client) = self.session()?;
                runtime.block_on(collect_rows(
                    client.query_raw(statement, args.iter().cloned().map(ValueHolder)),
                ))
            });
        self.remember(result)
    }

    fn deallocate_named(&mut self, name: &str) -> Result<()> {
        // Dropping the statement closes it on the server
        self.statements.remove(name);
        Ok(())
    }

    fn last_error(&self) -> Option<String> {
        self.last_error.clone()
    }
}
