use crate::value_wrap::value_from_mysql;
use mysql_async::{FromRowError, prelude::FromRow};
use sluice_core::{Row, RowLabeled, RowNames};

pub(crate) struct RowWrap(pub(crate) RowLabeled);

impl FromRow for RowWrap {
    fn from_row_opt(row: mysql_async::Row) -> Result<Self, FromRowError>
    where
        Self: Sized,
    {
        let columns = row.columns();
        let labels: RowNames = columns
            .iter()
            .map(|v| v.name_str().into_owned())
            .collect();
        let values: Option<Row> = columns
            .iter()
            .enumerate()
            .map(|(i, column)| {
                row.as_ref(i)
                    .map(|v| value_from_mysql(v.clone(), column))
            })
            .collect();
        match values {
            Some(values) => Ok(RowWrap(RowLabeled::new(labels, values))),
            None => Err(FromRowError(row)),
        }
    }
}
