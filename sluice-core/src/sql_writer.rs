use crate::{Bind, Family, Result, SluiceError, Value, separated_by};

/// Backend dialect: literal escaping, identifier quoting, parameter markers and the SQL of the
/// insert/update/select/delete helpers.
///
/// Every method has a default following the standard SQL (and PostgreSQL) conventions, a backend
/// overrides only what its dialect does differently.
pub trait SqlWriter {
    fn write_escaped(&self, out: &mut String, value: &str, search: char, replace: &str) {
        let mut position = 0;
        for (i, c) in value.char_indices() {
            if c == search {
                out.push_str(&value[position..i]);
                out.push_str(replace);
                position = i + c.len_utf8();
            }
        }
        out.push_str(&value[position..]);
    }

    fn write_identifier_quoted(&self, out: &mut String, value: &str) {
        out.push('"');
        self.write_escaped(out, value, '"', r#""""#);
        out.push('"');
    }

    fn write_table_ref(&self, out: &mut String, name: &str, schema: &str) {
        if !schema.is_empty() {
            self.write_identifier_quoted(out, schema);
            out.push('.');
        }
        self.write_identifier_quoted(out, name);
    }

    fn write_value_none(&self, out: &mut String) {
        out.push_str("NULL");
    }

    fn write_value_bool(&self, out: &mut String, value: bool) {
        out.push_str(["false", "true"][value as usize]);
    }

    fn write_value_string(&self, out: &mut String, value: &str) {
        out.push('\'');
        self.write_escaped(out, value, '\'', "''");
        out.push('\'');
    }

    /// Quoted binary literal.
    fn write_value_blob(&self, out: &mut String, value: &[u8]) {
        out.push_str("'\\x");
        out.push_str(&hex::encode(value));
        out.push('\'');
    }

    /// Marker of the `index`-th (1-based) positional parameter.
    fn write_parameter_marker(&self, out: &mut String, index: usize) {
        let _ = index;
        out.push('?');
    }

    fn supports_returning(&self) -> bool {
        false
    }

    fn write_returning(&self, out: &mut String) {
        out.push_str(" RETURNING *");
    }

    /// Scalar as an escaped SQL literal.
    fn write_literal(&self, out: &mut String, value: &Value) -> Result<()> {
        if value.is_null() {
            self.write_value_none(out);
            return Ok(());
        }
        match value {
            Value::Boolean(Some(v)) => self.write_value_bool(out, *v),
            Value::Blob(Some(v)) => self.write_value_blob(out, v),
            _ => match value.as_text() {
                Some(text) => self.write_value_string(out, &text),
                None => return Err(SluiceError::UnescapableValue(value.clone()).into()),
            },
        }
        Ok(())
    }

    /// Value of a named bind, rendered by its declared type: numbers and booleans raw (lists
    /// comma separated), binary through the binary escape, everything else as a literal.
    fn write_bind_value(&self, out: &mut String, bind: &Bind) -> Result<()> {
        self.write_value_as(out, &bind.value, bind.ty.family())
    }

    fn write_value_as(&self, out: &mut String, value: &Value, family: Family) -> Result<()> {
        if value.is_null() {
            self.write_value_none(out);
            return Ok(());
        }
        if let Value::List(Some(items), ..) = value {
            for (i, item) in items.iter().enumerate() {
                if item.family() == Family::List {
                    return Err(SluiceError::UnescapableValue(value.clone()).into());
                }
                if i > 0 {
                    out.push(',');
                }
                self.write_value_as(out, item, family)?;
            }
            return Ok(());
        }
        match family {
            Family::Integer | Family::Float
                if matches!(value.family(), Family::Integer | Family::Float) =>
            {
                match value.as_text() {
                    Some(text) => out.push_str(&text),
                    None => return Err(SluiceError::UnescapableValue(value.clone()).into()),
                }
            }
            Family::Boolean => match value {
                Value::Boolean(Some(v)) => self.write_value_bool(out, *v),
                _ => self.write_literal(out, value)?,
            },
            Family::Binary => match value {
                Value::Blob(Some(v)) => self.write_value_blob(out, v),
                _ => match value.as_text() {
                    Some(text) => self.write_value_blob(out, text.as_bytes()),
                    None => return Err(SluiceError::UnescapableValue(value.clone()).into()),
                },
            },
            _ => match value {
                Value::Boolean(Some(v)) => {
                    self.write_value_string(out, ["false", "true"][*v as usize])
                }
                _ => self.write_literal(out, value)?,
            },
        }
        Ok(())
    }

    /// Tail of an insert writing no column.
    fn write_default_values(&self, out: &mut String) {
        out.push_str(" DEFAULT VALUES");
    }

    fn write_insert(
        &self,
        out: &mut String,
        table: &str,
        schema: &str,
        columns: &[&str],
        placeholder: char,
        returning: bool,
    ) {
        out.push_str("INSERT INTO ");
        self.write_table_ref(out, table, schema);
        if columns.is_empty() {
            self.write_default_values(out);
        } else {
            out.push_str(" (");
            separated_by(
                out,
                columns,
                |out, v| self.write_identifier_quoted(out, v),
                ", ",
            );
            out.push_str(") VALUES (");
            separated_by(out, columns, |out, _| out.push(placeholder), ", ");
            out.push(')');
        }
        if returning && self.supports_returning() {
            self.write_returning(out);
        }
    }

    /// `condition` is copied verbatim after `WHERE`, it may carry its own placeholders.
    fn write_update(
        &self,
        out: &mut String,
        table: &str,
        schema: &str,
        columns: &[&str],
        placeholder: char,
        condition: &str,
        returning: bool,
    ) {
        out.push_str("UPDATE ");
        self.write_table_ref(out, table, schema);
        out.push_str(" SET ");
        separated_by(
            out,
            columns,
            |out, v| {
                self.write_identifier_quoted(out, v);
                out.push_str(" = ");
                out.push(placeholder);
            },
            ", ",
        );
        if !condition.trim().is_empty() {
            out.push_str(" WHERE ");
            out.push_str(condition);
        }
        if returning && self.supports_returning() {
            self.write_returning(out);
        }
    }

    /// Conjunction of `column = ?` terms.
    fn write_key_condition(&self, out: &mut String, columns: &[&str], placeholder: char) {
        separated_by(
            out,
            columns,
            |out, v| {
                self.write_identifier_quoted(out, v);
                out.push_str(" = ");
                out.push(placeholder);
            },
            " AND ",
        );
    }

    fn write_select(
        &self,
        out: &mut String,
        table: &str,
        schema: &str,
        key_columns: &[&str],
        placeholder: char,
    ) {
        out.push_str("SELECT * FROM ");
        self.write_table_ref(out, table, schema);
        out.push_str(" WHERE ");
        self.write_key_condition(out, key_columns, placeholder);
    }

    fn write_delete(
        &self,
        out: &mut String,
        table: &str,
        schema: &str,
        key_columns: &[&str],
        placeholder: char,
    ) {
        out.push_str("DELETE FROM ");
        self.write_table_ref(out, table, schema);
        out.push_str(" WHERE ");
        self.write_key_condition(out, key_columns, placeholder);
    }
}
