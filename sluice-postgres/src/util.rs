use crate::{PostgresCursor, ValueHolder};
use futures::StreamExt;
use openssl::ssl::{SslConnector, SslFiletype, SslMethod, SslVerifyMode};
use postgres_openssl::MakeTlsConnector;
use sluice_core::{Error, Result, Row, RowLabeled, RowNames, take_url_param};
use std::{path::Path, pin::pin};
use tokio_postgres::RowStream;
use url::Url;

pub(crate) fn row_to_sluice_row(row: tokio_postgres::Row) -> Result<Row> {
    (0..row.len())
        .map(|i| match row.try_get::<_, ValueHolder>(i) {
            Ok(v) => Ok(v.0),
            Err(..) => {
                let col = &row.columns()[i];
                Err(Error::msg(format!(
                    "Could not deserialize column {} `{}`: {}",
                    i,
                    col.name(),
                    col.type_()
                )))
            }
        })
        .collect()
}

/// Receive every row of `stream`, the affected row count comes with the command completion.
pub(crate) async fn collect_rows(
    stream: impl Future<Output = std::result::Result<RowStream, tokio_postgres::Error>>,
) -> Result<PostgresCursor> {
    let stream = stream.await?;
    let mut stream = pin!(stream);
    let mut cursor = PostgresCursor::default();
    let mut labels: Option<RowNames> = None;
    while let Some(row) = stream.next().await.transpose()? {
        let labels = labels.get_or_insert_with(|| {
            for column in row.columns() {
                cursor
                    .types
                    .insert(column.name().to_string(), column.type_().name().to_string());
            }
            row.columns().iter().map(|c| c.name().to_string()).collect()
        });
        let labels = labels.clone();
        cursor
            .rows
            .push_back(RowLabeled::new(labels, row_to_sluice_row(row)?));
    }
    cursor.count = stream
        .rows_affected()
        .unwrap_or(cursor.rows.len() as u64);
    Ok(cursor)
}

/// Connector for `sslmode` other than `disable`, certificates come from the `sslrootcert`,
/// `sslcert` and `sslkey` url parameters or the `PGSSL*` environment variables.
pub(crate) fn tls_connector(url: &mut Url, sslmode: &str) -> Result<MakeTlsConnector> {
    let mut builder = SslConnector::builder(SslMethod::tls())?;
    if let Some(path) = take_url_param(url, "sslrootcert", "PGSSLROOTCERT")
        .as_deref()
        .map(Path::new)
        && path.exists()
    {
        builder.set_ca_file(path)?;
    }
    if let Some(path) = take_url_param(url, "sslcert", "PGSSLCERT")
        .as_deref()
        .map(Path::new)
        && path.exists()
    {
        builder.set_certificate_chain_file(path)?;
    }
    if let Some(path) = take_url_param(url, "sslkey", "PGSSLKEY")
        .as_deref()
        .map(Path::new)
        && path.exists()
    {
        builder.set_private_key_file(path, SslFiletype::PEM)?;
    }
    match sslmode {
        "prefer" | "require" => builder.set_verify(SslVerifyMode::NONE),
        "verify-ca" | "verify-full" => builder.set_verify(SslVerifyMode::PEER),
        _ => {
            return Err(Error::msg(format!(
                "Unknown sslmode `{sslmode}`, expected one of disable, prefer, require, verify-ca, verify-full"
            )));
        }
    }
    let mut connector = MakeTlsConnector::new(builder.build());
    if sslmode != "verify-full" {
        connector.set_callback(|config, _| {
            config.set_verify_hostname(false);
            Ok(())
        });
    }
    if sslmode != "prefer" {
        url.query_pairs_mut().append_pair("sslmode", "require");
    }
    Ok(connector)
}
