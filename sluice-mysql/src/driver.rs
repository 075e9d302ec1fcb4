use crate::{MySQLCursor, MySQLSqlWriter, row_wrap::RowWrap, value_wrap::value_to_mysql};
use mysql_async::{
    BinaryProtocol, Conn, Opts, OptsBuilder, Params, QueryResult, Statement, TextProtocol,
    prelude::{Protocol, Queryable},
};
use sluice_core::{Context, Driver, Error, Result, Value, truncate_long};
use std::collections::HashMap;
use tokio::runtime::{Builder, Runtime};
use url::Url;

/// MySQL backend over `mysql_async`.
///
/// Calls block on a current-thread runtime owned by the driver. Affected row counts are the
/// rows matched, not only the rows changed.
#[derive(Default)]
pub struct MySQLDriver {
    runtime: Option<Runtime>,
    connection: Option<Conn>,
    statements: HashMap<String, Statement>,
    last_error: Option<String>,
}

impl MySQLDriver {
    pub fn new() -> Self {
        Self::default()
    }

    fn session(&mut self) -> Result<(&Runtime, &mut Conn)> {
        match (&self.runtime, &mut self.connection) {
            (Some(runtime), Some(connection)) => Ok((runtime, connection)),
            _ => Err(Error::msg("The MySQL driver is not connected")),
        }
    }

    fn remember<T>(&mut self, result: Result<T>) -> Result<T> {
        self.last_error = result.as_ref().err().map(|e| {
            match e.downcast_ref::<mysql_async::Error>() {
                Some(mysql_async::Error::Server(e)) => {
                    format!("{} ({}): {}", e.code, e.state, e.message)
                }
                _ => format!("{:#}", e),
            }
        });
        result
    }
}

async fn collect_rows<P: Protocol>(mut result: QueryResult<'_, '_, P>) -> Result<MySQLCursor> {
    let mut cursor = MySQLCursor::default();
    if let Some(columns) = result.columns() {
        cursor.types.extend(columns.iter().map(|c| {
            let name = format!("{:?}", c.column_type());
            (
                c.name_str().into_owned(),
                name.trim_start_matches("MYSQL_TYPE_").to_string(),
            )
        }));
    }
    let rows: Vec<RowWrap> = result.collect().await?;
    cursor.count = if rows.is_empty() {
        result.affected_rows()
    } else {
        rows.len() as u64
    };
    cursor.last_insert_id = result.last_insert_id().filter(|v| *v != 0);
    cursor.rows.extend(rows.into_iter().map(|v| v.0));
    result.drop_result().await?;
    Ok(cursor)
}

impl Driver for MySQLDriver {
    type SqlWriter = MySQLSqlWriter;
    type Cursor = MySQLCursor;

    const NAME: &'static str = "mysql";

    fn connect(&mut self, url: &str) -> Result<()> {
        let context = || format!("While trying to connect to `{}`", truncate_long!(url));
        let parsed = Url::parse(url).with_context(context)?;
        if parsed.scheme() != Self::NAME {
            let error = Error::msg("MySQL connection url must start with `mysql://`")
                .context(context());
            log::error!("{:#}", error);
            return Err(error);
        }
        let opts = Opts::from_url(parsed.as_str()).with_context(context)?;
        let opts = OptsBuilder::from_opts(opts).client_found_rows(true);
        let runtime = Builder::new_current_thread().enable_all().build()?;
        let connection = runtime
            .block_on(Conn::new(opts))
            .with_context(context)?;
        self.statements.clear();
        self.connection = Some(connection);
        self.runtime = Some(runtime);
        Ok(())
    }

    fn disconnect(&mut self) -> Result<()> {
        self.statements.clear();
        let (Some(runtime), Some(connection)) = (self.runtime.take(), self.connection.take())
        else {
            return Ok(());
        };
        runtime
            .block_on(connection.disconnect())
            .context("While disconnecting from MySQL")
    }

    fn sql_writer(&self) -> MySQLSqlWriter {
        MySQLSqlWriter {}
    }

    fn run_query(&mut self, sql: &str) -> Result<MySQLCursor> {
        let result = self.session().and_then(|(runtime, connection)| {
            runtime.block_on(async {
                let result: QueryResult<'_, '_, TextProtocol> = connection.query_iter(sql).await?;
                collect_rows(result).await
            })
        });
        self.remember(result)
    }

    fn prepare_named(&mut self, name: &str, sql: &str) -> Result<()> {
        let result = self.session().and_then(|(runtime, connection)| {
            runtime.block_on(connection.prep(sql)).map_err(Into::into)
        });
        let statement = self.remember(result)?;
        self.statements.insert(name.to_string(), statement);
        Ok(())
    }

    fn execute_named(&mut self, name: &str, args: &[Value]) -> Result<MySQLCursor> {
        let result = self
            .statements
            .get(name)
            .cloned()
            .ok_or_else(|| Error::msg(format!("Prepared statement `{name}` does not exist")))
            .and_then(|statement| {
                let params = args.iter().map(value_to_mysql).collect::<Result<Vec<_>>>()?;
                let (runtime, connection) = self.session()?;
                runtime.block_on(async {
                    let result: QueryResult<'_, '_, BinaryProtocol> = connection
                        .exec_iter(statement, Params::Positional(params))
                        .await?;
                    collect_rows(result).await
                })
            });
        self.remember(result)
    }

    fn deallocate_named(&mut self, name: &str) -> Result<()> {
        let Some(statement) = self.statements.remove(name) else {
            return Ok(());
        };
        let result = self.session().and_then(|(runtime, connection)| {
            runtime.block_on(connection.close(statement)).map_err(Into::into)
        });
        self.remember(result)
    }

    fn last_error(&self) -> Option<String> {
        self.last_error.clone()
    }
}
