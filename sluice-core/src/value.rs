use rust_decimal::Decimal;
use std::{
    borrow::Cow,
    fmt::Write,
    hash::{Hash, Hasher},
    mem,
};
use time::{Date, OffsetDateTime, PrimitiveDateTime, Time};
use uuid::Uuid;

/// Dynamically typed value moved between Rust code, query parameters and result rows.
///
/// Every typed variant carries an `Option`, `None` being the SQL `NULL` of that type.
/// `Unknown` holds the textual form of a value whose native type was not reported by the
/// backend (or not converted yet).
#[derive(Default, Debug, Clone)]
pub enum Value {
    #[default]
    Null,
    Boolean(Option<bool>),
    Int8(Option<i8>),
    Int16(Option<i16>),
    Int32(Option<i32>),
    Int64(Option<i64>),
    UInt8(Option<u8>),
    UInt16(Option<u16>),
    UInt32(Option<u32>),
    UInt64(Option<u64>),
    Float32(Option<f32>),
    Float64(Option<f64>),
    Decimal(Option<Decimal>),
    Varchar(Option<String>),
    Blob(Option<Box<[u8]>>),
    Date(Option<Date>),
    Time(Option<Time>),
    Timestamp(Option<PrimitiveDateTime>),
    TimestampWithTimezone(Option<OffsetDateTime>),
    Uuid(Option<Uuid>),
    List(Option<Vec<Value>>, /* type: */ Box<Value>),
    Unknown(Option<String>),
}

/// Coarse classification of a [`Value`], used by bind validation and literal writing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    Null,
    Boolean,
    Integer,
    Float,
    Binary,
    Text,
    Temporal,
    Uuid,
    List,
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Boolean(l), Self::Boolean(r)) => l == r,
            (Self::Int8(l), Self::Int8(r)) => l == r,
            (Self::Int16(l), Self::Int16(r)) => l == r,
            (Self::Int32(l), Self::Int32(r)) => l == r,
            (Self::Int64(l), Self::Int64(r)) => l == r,
            (Self::UInt8(l), Self::UInt8(r)) => l == r,
            (Self::UInt16(l), Self::UInt16(r)) => l == r,
            (Self::UInt32(l), Self::UInt32(r)) => l == r,
            (Self::UInt64(l), Self::UInt64(r)) => l == r,
            (Self::Float32(l), Self::Float32(r)) => l.map(f32::to_bits) == r.map(f32::to_bits),
            (Self::Float64(l), Self::Float64(r)) => l.map(f64::to_bits) == r.map(f64::to_bits),
            (Self::Decimal(l), Self::Decimal(r)) => l == r,
            (Self::Varchar(l), Self::Varchar(r)) => l == r,
            (Self::Blob(l), Self::Blob(r)) => l == r,
            (Self::Date(l), Self::Date(r)) => l == r,
            (Self::Time(l), Self::Time(r)) => l == r,
            (Self::Timestamp(l), Self::Timestamp(r)) => l == r,
            (Self::TimestampWithTimezone(l), Self::TimestampWithTimezone(r)) => l == r,
            (Self::Uuid(l), Self::Uuid(r)) => l == r,
            (Self::List(l, l_type), Self::List(r, r_type)) => l == r && l_type.same_type(r_type),
            (Self::Unknown(l), Self::Unknown(r)) => l == r,
            _ => false,
        }
    }
}

// Floats compare and hash by bit pattern so that a value can key a map.
impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        mem::discriminant(self).hash(state);
        match self {
            Value::Null => {}
            Value::Boolean(v) => v.hash(state),
            Value::Int8(v) => v.hash(state),
            Value::Int16(v) => v.hash(state),
            Value::Int32(v) => v.hash(state),
            Value::Int64(v) => v.hash(state),
            Value::UInt8(v) => v.hash(state),
            Value::UInt16(v) => v.hash(state),
            Value::UInt32(v) => v.hash(state),
            Value::UInt64(v) => v.hash(state),
            Value::Float32(v) => v.map(f32::to_bits).hash(state),
            Value::Float64(v) => v.map(f64::to_bits).hash(state),
            Value::Decimal(v) => v.hash(state),
            Value::Varchar(v) => v.hash(state),
            Value::Blob(v) => v.hash(state),
            Value::Date(v) => v.hash(state),
            Value::Time(v) => v.hash(state),
            Value::Timestamp(v) => v.hash(state),
            Value::TimestampWithTimezone(v) => v.hash(state),
            Value::Uuid(v) => v.hash(state),
            Value::List(v, ..) => v.hash(state),
            Value::Unknown(v) => v.hash(state),
        }
    }
}

impl Value {
    pub fn same_type(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::List(.., l), Self::List(.., r)) => l.same_type(r),
            _ => mem::discriminant(self) == mem::discriminant(other),
        }
    }

    pub fn is_null(&self) -> bool {
        match self {
            Value::Null
            | Value::Boolean(None)
            | Value::Int8(None)
            | Value::Int16(None)
            | Value::Int32(None)
            | Value::Int64(None)
            | Value::UInt8(None)
            | Value::UInt16(None)
            | Value::UInt32(None)
            | Value::UInt64(None)
            | Value::Float32(None)
            | Value::Float64(None)
            | Value::Decimal(None)
            | Value::Varchar(None)
            | Value::Blob(None)
            | Value::Date(None)
            | Value::Time(None)
            | Value::Timestamp(None)
            | Value::TimestampWithTimezone(None)
            | Value::Uuid(None)
            | Value::List(None, ..)
            | Value::Unknown(None) => true,
            _ => false,
        }
    }

    pub fn family(&self) -> Family {
        match self {
            Value::Null => Family::Null,
            Value::Boolean(..) => Family::Boolean,
            Value::Int8(..)
            | Value::Int16(..)
            | Value::Int32(..)
            | Value::Int64(..)
            | Value::UInt8(..)
            | Value::UInt16(..)
            | Value::UInt32(..)
            | Value::UInt64(..) => Family::Integer,
            Value::Float32(..) | Value::Float64(..) | Value::Decimal(..) => Family::Float,
            Value::Varchar(..) | Value::Unknown(..) => Family::Text,
            Value::Blob(..) => Family::Binary,
            Value::Date(..)
            | Value::Time(..)
            | Value::Timestamp(..)
            | Value::TimestampWithTimezone(..) => Family::Temporal,
            Value::Uuid(..) => Family::Uuid,
            Value::List(..) => Family::List,
        }
    }

    /// The integer carried by any integer variant.
    pub fn as_i128(&self) -> Option<i128> {
        match *self {
            Value::Int8(Some(v)) => Some(v as _),
            Value::Int16(Some(v)) => Some(v as _),
            Value::Int32(Some(v)) => Some(v as _),
            Value::Int64(Some(v)) => Some(v as _),
            Value::UInt8(Some(v)) => Some(v as _),
            Value::UInt16(Some(v)) => Some(v as _),
            Value::UInt32(Some(v)) => Some(v as _),
            Value::UInt64(Some(v)) => Some(v as _),
            _ => None,
        }
    }

    /// Textual form of a scalar, as written inside a quoted SQL literal or sent as a text
    /// parameter. `None` for NULL and lists.
    pub fn as_text(&self) -> Option<Cow<'_, str>> {
        macro_rules! integer {
            ($v:expr) => {
                Some(Cow::Owned(itoa::Buffer::new().format($v).to_owned()))
            };
        }
        macro_rules! float {
            ($v:expr) => {
                Some(Cow::Owned(ryu::Buffer::new().format($v).to_owned()))
            };
        }
        match self {
            Value::Boolean(Some(v)) => Some(Cow::Borrowed(["false", "true"][*v as usize])),
            Value::Int8(Some(v)) => integer!(*v),
            Value::Int16(Some(v)) => integer!(*v),
            Value::Int32(Some(v)) => integer!(*v),
            Value::Int64(Some(v)) => integer!(*v),
            Value::UInt8(Some(v)) => integer!(*v),
            Value::UInt16(Some(v)) => integer!(*v),
            Value::UInt32(Some(v)) => integer!(*v),
            Value::UInt64(Some(v)) => integer!(*v),
            Value::Float32(Some(v)) => float!(*v),
            Value::Float64(Some(v)) => float!(*v),
            Value::Decimal(Some(v)) => Some(Cow::Owned(v.to_string())),
            Value::Varchar(Some(v)) | Value::Unknown(Some(v)) => Some(Cow::Borrowed(v)),
            Value::Blob(Some(v)) => Some(Cow::Owned(format!("\\x{}", hex::encode(v)))),
            Value::Date(Some(v)) => {
                let mut out = String::with_capacity(10);
                write_date(&mut out, v);
                Some(Cow::Owned(out))
            }
            Value::Time(Some(v)) => {
                let mut out = String::with_capacity(18);
                write_time(&mut out, v);
                Some(Cow::Owned(out))
            }
            Value::Timestamp(Some(v)) => {
                let mut out = String::with_capacity(29);
                write_date(&mut out, &v.date());
                out.push(' ');
                write_time(&mut out, &v.time());
                Some(Cow::Owned(out))
            }
            Value::TimestampWithTimezone(Some(v)) => {
                let mut out = String::with_capacity(35);
                write_date(&mut out, &v.date());
                out.push(' ');
                write_time(&mut out, &v.time());
                let (hours, minutes, _) = v.offset().as_hms();
                let _ = write!(out, "{:+03}:{:02}", hours, minutes.abs());
                Some(Cow::Owned(out))
            }
            Value::Uuid(Some(v)) => Some(Cow::Owned(v.hyphenated().to_string())),
            _ => None,
        }
    }
}

fn write_date(out: &mut String, value: &Date) {
    let _ = write!(
        out,
        "{:04}-{:02}-{:02}",
        value.year(),
        value.month() as u8,
        value.day()
    );
}

fn write_time(out: &mut String, value: &Time) {
    let mut subsecond = value.nanosecond();
    let mut width = 9;
    while width > 1 && subsecond % 10 == 0 {
        subsecond /= 10;
        width -= 1;
    }
    let _ = write!(
        out,
        "{:02}:{:02}:{:02}.{:0width$}",
        value.hour(),
        value.minute(),
        value.second(),
        subsecond
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use time::macros::{date, datetime, time};

    #[test]
    fn null_variants() {
        assert!(Value::Null.is_null());
        assert!(Value::Int32(None).is_null());
        assert!(Value::List(None, Box::new(Value::Int32(None))).is_null());
        assert!(!Value::Varchar(Some("".into())).is_null());
        assert_ne!(Value::Null, Value::Int32(None));
    }

    #[test]
    fn floats_key_a_map() {
        let mut map = HashMap::new();
        map.insert(Value::Float64(Some(1.5)), "a");
        map.insert(Value::Float64(Some(f64::NAN)), "b");
        assert_eq!(map.get(&Value::Float64(Some(1.5))), Some(&"a"));
        assert_eq!(map.get(&Value::Float64(Some(f64::NAN))), Some(&"b"));
        assert_eq!(map.get(&Value::Float32(Some(1.5))), None);
    }

    #[test]
    fn text_rendering() {
        assert_eq!(Value::Int16(Some(-7)).as_text().as_deref(), Some("-7"));
        assert_eq!(Value::Float64(Some(2.5)).as_text().as_deref(), Some("2.5"));
        assert_eq!(Value::Boolean(Some(true)).as_text().as_deref(), Some("true"));
        assert_eq!(
            Value::Blob(Some([0xde, 0xad].into())).as_text().as_deref(),
            Some("\\xdead")
        );
        assert_eq!(
            Value::Date(Some(date!(2024 - 02 - 29))).as_text().as_deref(),
            Some("2024-02-29")
        );
        assert_eq!(
            Value::Time(Some(time!(08:05:03.25))).as_text().as_deref(),
            Some("08:05:03.25")
        );
        assert_eq!(
            Value::Timestamp(Some(datetime!(1999-12-31 23:59:59)))
                .as_text()
                .as_deref(),
            Some("1999-12-31 23:59:59.0")
        );
        assert_eq!(
            Value::TimestampWithTimezone(Some(datetime!(2020-01-01 10:00 -05:30)))
                .as_text()
                .as_deref(),
            Some("2020-01-01 10:00:00.0-05:30")
        );
        assert_eq!(Value::Varchar(None).as_text(), None);
    }

    #[test]
    fn list_type_matters() {
        let ints = Value::List(Some(vec![]), Box::new(Value::Int32(None)));
        let texts = Value::List(Some(vec![]), Box::new(Value::Varchar(None)));
        assert_ne!(ints, texts);
        assert!(ints.same_type(&Value::List(None, Box::new(Value::Int32(None)))));
    }
}
