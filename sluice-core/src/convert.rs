use crate::{AsValue, Cursor, RowLabeled, SqlWriter, Value};

/// Native type a backend column type name converts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeType {
    Integer,
    Float,
    Boolean,
}

/// Backend column type names (PostgreSQL, MySQL, SQL Server) with a native counterpart.
const NATIVE_TYPES: &[(&str, NativeType)] = &[
    // PostgreSQL
    ("int2", NativeType::Integer),
    ("int4", NativeType::Integer),
    ("int8", NativeType::Integer),
    ("smallint", NativeType::Integer),
    ("integer", NativeType::Integer),
    ("bigint", NativeType::Integer),
    ("smallserial", NativeType::Integer),
    ("serial", NativeType::Integer),
    ("bigserial", NativeType::Integer),
    ("oid", NativeType::Integer),
    ("float4", NativeType::Float),
    ("float8", NativeType::Float),
    ("real", NativeType::Float),
    ("double precision", NativeType::Float),
    ("numeric", NativeType::Float),
    ("bool", NativeType::Boolean),
    ("boolean", NativeType::Boolean),
    // MySQL
    ("tiny", NativeType::Integer),
    ("tinyint", NativeType::Integer),
    ("short", NativeType::Integer),
    ("mediumint", NativeType::Integer),
    ("int24", NativeType::Integer),
    ("int", NativeType::Integer),
    ("long", NativeType::Integer),
    ("longlong", NativeType::Integer),
    ("year", NativeType::Integer),
    ("float", NativeType::Float),
    ("double", NativeType::Float),
    ("decimal", NativeType::Float),
    ("newdecimal", NativeType::Float),
    // SQL Server
    ("bit", NativeType::Boolean),
    ("money", NativeType::Float),
    ("smallmoney", NativeType::Float),
];

/// Look a backend type name up, ignoring case, length modifiers and `unsigned`.
pub fn native_type(type_name: &str) -> Option<NativeType> {
    let name = type_name.trim();
    let name = name.split('(').next().unwrap_or(name).trim();
    let lower = name.to_ascii_lowercase();
    let name = lower
        .strip_suffix(" unsigned")
        .or_else(|| lower.strip_suffix(" zerofill"))
        .unwrap_or(&lower);
    NATIVE_TYPES
        .iter()
        .find(|(k, _)| *k == name)
        .map(|(_, v)| *v)
}

fn convert_value(value: Value, ty: NativeType) -> Value {
    let text = match &value {
        Value::Unknown(Some(v)) | Value::Varchar(Some(v)) => v,
        Value::Unknown(None) | Value::Varchar(None) => {
            return match ty {
                NativeType::Integer => Value::Int64(None),
                NativeType::Float => Value::Float64(None),
                NativeType::Boolean => Value::Boolean(None),
            };
        }
        _ => return value,
    };
    let converted = match ty {
        NativeType::Integer => i64::parse(text).map(|v| v.as_value()),
        NativeType::Float => f64::parse(text).map(|v| v.as_value()),
        NativeType::Boolean => bool::parse(text).map(|v| v.as_value()),
    };
    match converted {
        Ok(v) => v,
        Err(e) => {
            log::debug!("{:#}", e);
            value
        }
    }
}

/// Turn the textual values of integer, float and boolean columns into native values.
///
/// The type of a column is asked to the cursor by label, a mixed case label the cursor does
/// not know is retried in its quoted form.
pub fn convert_row<W, C>(writer: &W, cursor: &C, row: RowLabeled) -> RowLabeled
where
    W: SqlWriter + ?Sized,
    C: Cursor + ?Sized,
{
    let RowLabeled { labels, values } = row;
    let values = labels
        .iter()
        .zip(values)
        .map(|(label, value)| {
            let type_name = cursor.column_type(label).or_else(|| {
                if label.chars().any(char::is_uppercase) && label.chars().any(char::is_lowercase)
                {
                    let mut quoted = String::with_capacity(label.len() + 2);
                    writer.write_identifier_quoted(&mut quoted, label);
                    cursor.column_type(&quoted)
                } else {
                    None
                }
            });
            match type_name.and_then(native_type) {
                Some(ty) => convert_value(value, ty),
                None => value,
            }
        })
        .collect();
    RowLabeled { labels, values }
}
