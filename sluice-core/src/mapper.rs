use crate::{
    ColumnDef, Connection, Driver, Entity, Error, Family, Result, SluiceError, SqlWriter,
    TableDef, Value, error::logged,
};
use anyhow::Context;
use log::Level;

/// Primary key columns of `def` and their values in `values`.
fn primary_key<'a>(def: &'a TableDef, values: &[Value]) -> Result<(Vec<&'a str>, Vec<Value>)> {
    let mut columns = Vec::new();
    let mut args = Vec::new();
    for (i, column) in def.primary_key() {
        let value = values.get(i).cloned().unwrap_or(Value::Null);
        if value.is_null() {
            return Err(SluiceError::PrimaryKeyNotSet {
                table: def.full_name(),
                column: column.name.to_owned(),
            }
            .into());
        }
        columns.push(column.name);
        args.push(value);
    }
    if columns.is_empty() {
        return Err(SluiceError::MissingPrimaryKey(def.full_name()).into());
    }
    Ok((columns, args))
}

/// Columns written by an insert: a NULL primary key or defaulted column is left to the backend.
fn insert_record(def: &TableDef, values: Vec<Value>) -> Vec<(&'static str, Value)> {
    def.columns
        .iter()
        .zip(values)
        .filter(|(c, v)| !(v.is_null() && (c.is_primary_key() || c.default.is_some())))
        .map(|(c, v)| (c.name, v))
        .collect()
}

/// The primary key column when it is a single integer column still unset.
fn generated_key<'a>(def: &'a TableDef, values: &[Value]) -> Option<&'a ColumnDef> {
    let mut pk = def.primary_key();
    match (pk.next(), pk.next()) {
        (Some((i, column)), None)
            if column.value.family() == Family::Integer
                && values.get(i).is_none_or(Value::is_null) =>
        {
            Some(column)
        }
        _ => None,
    }
}

/// Reference and single row CRUD for [`Entity`] types.
impl<D: Driver> Connection<D> {
    /// Load the row matching the primary key of `entity` into it.
    #[track_caller]
    pub fn entity_select<E: Entity>(&self, entity: &mut E) -> Result<()> {
        let def = E::table_def();
        let (columns, args) = primary_key(def, &entity.values()).map_err(logged)?;
        self.select_into(entity, &columns, &args)
    }

    #[track_caller]
    fn select_into<E: Entity>(&self, entity: &mut E, columns: &[&str], args: &[Value]) -> Result<()> {
        let def = E::table_def();
        let mut sql = String::with_capacity(128);
        self.sql_writer().write_select(
            &mut sql,
            def.name,
            def.schema,
            columns,
            self.options().placeholder,
        );
        let mut statement = self.query(&sql, args)?;
        let Some(row) = statement.fetch_row()? else {
            return Err(logged(SluiceError::EntityNotFound(def.full_name())));
        };
        entity
            .hydrate(&row)
            .with_context(|| format!("While reading a row of `{}`", def.full_name()))
            .map_err(logged)
    }

    /// Insert `entity` and reload it, picking up the values generated by the backend.
    ///
    /// NULL columns that are part of the primary key or have a default are omitted. The row is
    /// read back with `RETURNING` when the backend supports it, otherwise it is selected again
    /// by primary key (the backend last insert id fills a single unset integer key). When the
    /// row could not be read back the insert is refused before reaching the backend.
    #[track_caller]
    pub fn entity_insert<E: Entity>(&self, entity: &mut E) -> Result<()> {
        let def = E::table_def();
        let values = entity.values();
        let generated = generated_key(def, &values);
        let writer = self.sql_writer();
        let returning = writer.supports_returning();
        if def.primary_key().next().is_none() {
            return Err(logged(SluiceError::MissingPrimaryKey(def.full_name())));
        }
        if !returning && generated.is_none() {
            primary_key(def, &values).map_err(logged)?;
        }
        let record = insert_record(def, values);
        let table = def.full_name();
        let mut statement = self.insert(&table, &record, returning)?;
        if statement.rows() != 1 {
            return Err(logged(SluiceError::UnexpectedRowCount {
                operation: "Insert",
                table,
                rows: statement.rows(),
            }));
        }
        if returning && let Some(row) = statement.fetch_row()? {
            return entity
                .hydrate(&row)
                .with_context(|| format!("While reading the row inserted in `{table}`"))
                .map_err(logged);
        }
        match generated {
            Some(column) => match statement.last_insert_id() {
                Some(id) => self.select_into(entity, &[column.name], &[Value::UInt64(Some(id))]),
                None => {
                    log::debug!(
                        "The backend reported no id for the row inserted in `{table}`, `{}` is left unset",
                        column.name
                    );
                    Ok(())
                }
            },
            None => self.entity_select(entity),
        }
    }

    /// Write the non key columns of `entity` to the row matching its primary key and reload it.
    ///
    /// Exactly one row must be updated: the update runs in a transaction (the open one, or a
    /// new one) that is rolled back when no row or more than one row was matched.
    #[track_caller]
    pub fn entity_update<E: Entity>(&self, entity: &mut E) -> Result<()> {
        let def = E::table_def();
        let values = entity.values();
        let (key_columns, key_args) = primary_key(def, &values).map_err(logged)?;
        let record: Vec<(&str, Value)> = def
            .columns
            .iter()
            .zip(values)
            .filter(|(c, _)| !c.is_primary_key())
            .map(|(c, v)| (c.name, v))
            .collect();
        if record.is_empty() {
            return self.select_into(entity, &key_columns, &key_args);
        }
        let writer = self.sql_writer();
        let returning = writer.supports_returning();
        let mut condition = String::with_capacity(64);
        writer.write_key_condition(&mut condition, &key_columns, self.options().placeholder);
        let table = def.full_name();
        let row = self.transaction(|connection| {
            let mut statement = connection.update(&table, &record, &condition, &key_args, returning)?;
            match statement.rows() {
                1 => {}
                0 => {
                    return Err(logged(SluiceError::NoRowsUpdated {
                        table: table.clone(),
                    }));
                }
                rows => {
                    return Err(logged(SluiceError::AmbiguousUpdate {
                        table: table.clone(),
                        rows,
                    }));
                }
            }
            if returning {
                statement.fetch_row()
            } else {
                Ok(None)
            }
        })?;
        match row {
            Some(row) => entity
                .hydrate(&row)
                .with_context(|| format!("While reading the row updated in `{table}`"))
                .map_err(logged),
            None => self.select_into(entity, &key_columns, &key_args),
        }
    }

    /// Delete the row matching the primary key of `entity`, exactly one row must be deleted.
    #[track_caller]
    pub fn entity_delete<E: Entity>(&self, entity: &E) -> Result<()> {
        let def = E::table_def();
        let (columns, args) = primary_key(def, &entity.values()).map_err(logged)?;
        let mut sql = String::with_capacity(128);
        self.sql_writer().write_delete(
            &mut sql,
            def.name,
            def.schema,
            &columns,
            self.options().placeholder,
        );
        let rows = self.execute(&sql, &args)?;
        if rows != 1 {
            let error = Error::new(SluiceError::UnexpectedRowCount {
                operation: "Delete",
                table: def.full_name(),
                rows,
            });
            log::log!(
                if rows == 0 { Level::Info } else { Level::Error },
                "{:#}",
                error
            );
            return Err(error);
        }
        Ok(())
    }
}
