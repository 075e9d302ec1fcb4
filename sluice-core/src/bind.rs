use crate::{Family, Result, SluiceError, Value};
use std::fmt::{self, Display};

/// Declared primitive type of a named bind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindType {
    Boolean,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float32,
    Float64,
    Decimal,
    Varchar,
    Text,
    Blob,
    Date,
    Time,
    Timestamp,
    TimestampTz,
    Uuid,
    Json,
}

impl BindType {
    pub fn family(&self) -> Family {
        match self {
            BindType::Boolean => Family::Boolean,
            BindType::Int8
            | BindType::Int16
            | BindType::Int32
            | BindType::Int64
            | BindType::UInt8
            | BindType::UInt16
            | BindType::UInt32
            | BindType::UInt64 => Family::Integer,
            BindType::Float32 | BindType::Float64 | BindType::Decimal => Family::Float,
            BindType::Varchar | BindType::Text | BindType::Json => Family::Text,
            BindType::Blob => Family::Binary,
            BindType::Date | BindType::Time | BindType::Timestamp | BindType::TimestampTz => {
                Family::Temporal
            }
            BindType::Uuid => Family::Uuid,
        }
    }

    /// Inclusive range of the integer types.
    fn integer_range(&self) -> Option<(i128, i128)> {
        Some(match self {
            BindType::Int8 => (i8::MIN as _, i8::MAX as _),
            BindType::Int16 => (i16::MIN as _, i16::MAX as _),
            BindType::Int32 => (i32::MIN as _, i32::MAX as _),
            BindType::Int64 => (i64::MIN as _, i64::MAX as _),
            BindType::UInt8 => (0, u8::MAX as _),
            BindType::UInt16 => (0, u16::MAX as _),
            BindType::UInt32 => (0, u32::MAX as _),
            BindType::UInt64 => (0, u64::MAX as _),
            _ => return None,
        })
    }

    /// The type a value naturally binds as.
    pub fn infer(value: &Value) -> BindType {
        match value {
            Value::Boolean(..) => BindType::Boolean,
            Value::Int8(..) => BindType::Int8,
            Value::Int16(..) => BindType::Int16,
            Value::Int32(..) => BindType::Int32,
            Value::Int64(..) => BindType::Int64,
            Value::UInt8(..) => BindType::UInt8,
            Value::UInt16(..) => BindType::UInt16,
            Value::UInt32(..) => BindType::UInt32,
            Value::UInt64(..) => BindType::UInt64,
            Value::Float32(..) => BindType::Float32,
            Value::Float64(..) => BindType::Float64,
            Value::Decimal(..) => BindType::Decimal,
            Value::Blob(..) => BindType::Blob,
            Value::Date(..) => BindType::Date,
            Value::Time(..) => BindType::Time,
            Value::Timestamp(..) => BindType::Timestamp,
            Value::TimestampWithTimezone(..) => BindType::TimestampTz,
            Value::Uuid(..) => BindType::Uuid,
            Value::List(.., ty) => BindType::infer(ty),
            Value::Null | Value::Varchar(..) | Value::Unknown(..) => BindType::Varchar,
        }
    }

    fn accepts(&self, value: &Value) -> bool {
        if value.is_null() {
            return true;
        }
        match self.family() {
            Family::Integer => match value {
                Value::List(Some(items), ..) => items.iter().all(|v| self.accepts(v)),
                _ => {
                    let Some((min, max)) = self.integer_range() else {
                        return false;
                    };
                    value.as_i128().is_some_and(|v| v >= min && v <= max)
                }
            },
            Family::Float => match value {
                Value::List(Some(items), ..) => items.iter().all(|v| self.accepts(v)),
                _ => matches!(value.family(), Family::Float | Family::Integer),
            },
            _ => true,
        }
    }
}

impl Display for BindType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A named, typed parameter attached to a statement before execution.
#[derive(Debug, Clone, PartialEq)]
pub struct Bind {
    pub name: String,
    pub value: Value,
    pub ty: BindType,
    /// Column the value originates from, if any.
    pub column: Option<String>,
}

impl Bind {
    /// Validate the value against the declared type. A mismatch fails here, never later.
    pub fn new(name: impl AsRef<str>, value: impl Into<Value>, ty: BindType) -> Result<Self> {
        let name = Self::normalize(name.as_ref());
        let value = value.into();
        if !ty.accepts(&value) {
            let error = SluiceError::BindType {
                name,
                declared: ty,
                value,
            };
            log::error!("{}", error);
            return Err(error.into());
        }
        Ok(Self {
            name,
            value,
            ty,
            column: None,
        })
    }

    /// Bind with the type inferred from the value.
    pub fn infer(name: impl AsRef<str>, value: impl Into<Value>) -> Self {
        let value = value.into();
        Self {
            name: Self::normalize(name.as_ref()),
            ty: BindType::infer(&value),
            value,
            column: None,
        }
    }

    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }

    fn normalize(name: &str) -> String {
        name.strip_prefix(':').unwrap_or(name).to_owned()
    }
}
