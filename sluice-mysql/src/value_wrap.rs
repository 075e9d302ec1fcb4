use mysql_async::{Column, consts::ColumnType};
use sluice_core::{Error, Result, Value};
use time::{Date, Month, PrimitiveDateTime, Time, UtcOffset};

type MySQLValue = mysql_async::Value;

const BINARY_CHARSET: u16 = 63;

/// Decode a received value, `column` tells binary strings apart from text.
///
/// Text is kept as [`Value::Unknown`], the textual protocol does not type it.
pub(crate) fn value_from_mysql(value: MySQLValue, column: &Column) -> Value {
    match value {
        MySQLValue::NULL => Value::Null,
        MySQLValue::Bytes(v) => {
            let binary = column.character_set() == BINARY_CHARSET
                && matches!(
                    column.column_type(),
                    ColumnType::MYSQL_TYPE_TINY_BLOB
                        | ColumnType::MYSQL_TYPE_MEDIUM_BLOB
                        | ColumnType::MYSQL_TYPE_LONG_BLOB
                        | ColumnType::MYSQL_TYPE_BLOB
                        | ColumnType::MYSQL_TYPE_STRING
                        | ColumnType::MYSQL_TYPE_VAR_STRING
                        | ColumnType::MYSQL_TYPE_VARCHAR
                        | ColumnType::MYSQL_TYPE_BIT
                        | ColumnType::MYSQL_TYPE_GEOMETRY
                );
            if binary {
                return Value::Blob(Some(v.into()));
            }
            match String::from_utf8(v) {
                Ok(v) => Value::Unknown(Some(v)),
                Err(e) => Value::Blob(Some(e.into_bytes().into())),
            }
        }
        MySQLValue::Int(v) => Value::Int64(Some(v)),
        MySQLValue::UInt(v) => Value::UInt64(Some(v)),
        MySQLValue::Float(v) => Value::Float32(Some(v)),
        MySQLValue::Double(v) => Value::Float64(Some(v)),
        MySQLValue::Date(year, month, day, hour, minute, second, micro) => {
            let date = Month::try_from(month)
                .ok()
                .and_then(|month| Date::from_calendar_date(year as _, month, day).ok());
            let time = Time::from_hms_micro(hour, minute, second, micro).ok();
            match (date, time) {
                (Some(date), _) if column.column_type() == ColumnType::MYSQL_TYPE_DATE => {
                    Value::Date(Some(date))
                }
                (Some(date), Some(time)) => Value::Timestamp(Some(PrimitiveDateTime::new(date, time))),
                // Zero dates
                _ => Value::Unknown(Some(format!(
                    "{year:04}-{month:02}-{day:02} {hour:02}:{minute:02}:{second:02}"
                ))),
            }
        }
        MySQLValue::Time(negative, days, hours, minutes, seconds, micro) => {
            match Time::from_hms_micro(hours, minutes, seconds, micro) {
                Ok(time) if !negative && days == 0 => Value::Time(Some(time)),
                _ => Value::Unknown(Some(format!(
                    "{}{}:{minutes:02}:{seconds:02}.{micro:06}",
                    if negative { "-" } else { "" },
                    days * 24 + hours as u32,
                ))),
            }
        }
    }
}

/// Encode a parameter of a prepared statement.
pub(crate) fn value_to_mysql(value: &Value) -> Result<MySQLValue> {
    fn date_time(date: Date, time: Time) -> Result<MySQLValue> {
        let year = u16::try_from(date.year())
            .map_err(|_| Error::msg(format!("Date {date} is out of range for MySQL")))?;
        Ok(MySQLValue::Date(
            year,
            date.month().into(),
            date.day(),
            time.hour(),
            time.minute(),
            time.second(),
            time.microsecond(),
        ))
    }
    Ok(match value {
        _ if value.is_null() => MySQLValue::NULL,
        Value::Boolean(Some(v)) => MySQLValue::from(*v),
        Value::Int8(Some(v)) => MySQLValue::from(*v),
        Value::Int16(Some(v)) => MySQLValue::from(*v),
        Value::Int32(Some(v)) => MySQLValue::from(*v),
        Value::Int64(Some(v)) => MySQLValue::from(*v),
        Value::UInt8(Some(v)) => MySQLValue::from(*v),
        Value::UInt16(Some(v)) => MySQLValue::from(*v),
        Value::UInt32(Some(v)) => MySQLValue::from(*v),
        Value::UInt64(Some(v)) => MySQLValue::from(*v),
        Value::Float32(Some(v)) => MySQLValue::from(*v),
        Value::Float64(Some(v)) => MySQLValue::from(*v),
        Value::Decimal(Some(v)) => MySQLValue::from(*v),
        Value::Varchar(Some(v)) | Value::Unknown(Some(v)) => MySQLValue::from(v.clone()),
        Value::Blob(Some(v)) => MySQLValue::Bytes(v.to_vec()),
        Value::Date(Some(v)) => date_time(*v, Time::MIDNIGHT)?,
        Value::Time(Some(v)) => MySQLValue::Time(
            false,
            0,
            v.hour(),
            v.minute(),
            v.second(),
            v.microsecond(),
        ),
        Value::Timestamp(Some(v)) => date_time(v.date(), v.time())?,
        Value::TimestampWithTimezone(Some(v)) => {
            let v = v.to_offset(UtcOffset::UTC);
            date_time(v.date(), v.time())?
        }
        Value::Uuid(Some(v)) => MySQLValue::from(v.to_string()),
        _ => {
            return Err(Error::msg(format!(
                "sluice::Value `{:?}` is not supported by MySQL",
                value
            )));
        }
    })
}
