use crate::{Error, Result, Value, truncate_long};
use anyhow::Context;
use atoi::FromRadix10SignedChecked;
use rust_decimal::{
    Decimal,
    prelude::{FromPrimitive, ToPrimitive},
};
use std::{any, str::FromStr};
use time::{
    Date, OffsetDateTime, PrimitiveDateTime, Time,
    format_description::{BorrowedFormatItem, parse_borrowed},
};
use uuid::Uuid;

/// Conversion between native Rust types and the dynamically typed [`Value`].
///
/// Implemented for the primitives, `String`, `Box<[u8]>` (binary), [`Decimal`], the `time`
/// types, [`Uuid`], `Option<T>` (nullable) and `Vec<T>` (list).
///
/// # Conversion contract
/// - `try_from_value` accepts the canonical variant and any variant that converts losslessly,
///   integer widths are range checked.
/// - Textual values (`Value::Unknown`) are parsed through [`AsValue::parse`], which must
///   consume the whole input.
///
/// # Examples
/// ```rust
/// use sluice_core::{AsValue, Value};
/// let v = 42i32.as_value();
/// assert!(matches!(v, Value::Int32(Some(42))));
/// let n: i64 = AsValue::try_from_value(v).unwrap();
/// assert_eq!(n, 42);
/// ```
pub trait AsValue {
    /// The NULL variant of the type.
    fn as_empty_value() -> Value;
    fn as_value(self) -> Value;
    fn try_from_value(value: Value) -> Result<Self>
    where
        Self: Sized;
    /// Parse the complete textual form.
    fn parse(input: &str) -> Result<Self>
    where
        Self: Sized,
    {
        Err(Error::msg(format!(
            "Cannot parse `{}` as {}",
            truncate_long!(input),
            any::type_name::<Self>()
        )))
    }
}

impl<T: AsValue> From<T> for Value {
    fn from(value: T) -> Self {
        value.as_value()
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Varchar(Some(value.into()))
    }
}

/// Build a `Vec<Value>` of positional arguments.
///
/// ```rust
/// use sluice_core::{Value, params};
/// let args = params![1i32, "two", None::<f64>];
/// assert_eq!(args[1], Value::Varchar(Some("two".into())));
/// ```
#[macro_export]
macro_rules! params {
    () => {
        ::std::vec::Vec::<$crate::Value>::new()
    };
    ($($value:expr),+ $(,)?) => {
        ::std::vec![$($crate::Value::from($value)),+]
    };
}

fn mismatch<T>(value: &Value) -> Error {
    Error::msg(format!(
        "Cannot convert {value:?} to {}",
        any::type_name::<T>()
    ))
}

macro_rules! impl_as_value_integer {
    ($source:ty, $destination:path) => {
        impl AsValue for $source {
            fn as_empty_value() -> Value {
                $destination(None)
            }
            fn as_value(self) -> Value {
                $destination(Some(self))
            }
            fn try_from_value(value: Value) -> Result<Self> {
                if let Some(v) = value.as_i128() {
                    return <$source>::try_from(v).map_err(|_| {
                        Error::msg(format!(
                            "Value {v} is out of range for {}",
                            any::type_name::<Self>()
                        ))
                    });
                }
                match value {
                    Value::Decimal(Some(v)) => {
                        let error = Error::msg(format!(
                            "Value {v}: Decimal does not fit into {}",
                            any::type_name::<Self>()
                        ));
                        if !v.is_integer() {
                            return Err(error.context("The value is not a integer"));
                        }
                        v.to_i128()
                            .and_then(|v| <$source>::try_from(v).ok())
                            .ok_or(error)
                    }
                    Value::Unknown(Some(ref v)) => <Self as AsValue>::parse(v),
                    _ => Err(mismatch::<Self>(&value)),
                }
            }
            fn parse(input: &str) -> Result<Self> {
                let trimmed = input.trim();
                let (n, len) = i128::from_radix_10_signed_checked(trimmed.as_bytes());
                match n {
                    Some(n) if len == trimmed.len() && len > 0 => {
                        <$source>::try_from(n).map_err(|_| {
                            Error::msg(format!(
                                "Parsed integer {n} is out of range for {}",
                                any::type_name::<Self>()
                            ))
                        })
                    }
                    _ => Err(Error::msg(format!(
                        "Cannot parse `{}` as {}",
                        truncate_long!(input),
                        any::type_name::<Self>()
                    ))),
                }
            }
        }
    };
}
impl_as_value_integer!(i8, Value::Int8);
impl_as_value_integer!(i16, Value::Int16);
impl_as_value_integer!(i32, Value::Int32);
impl_as_value_integer!(i64, Value::Int64);
impl_as_value_integer!(u8, Value::UInt8);
impl_as_value_integer!(u16, Value::UInt16);
impl_as_value_integer!(u32, Value::UInt32);
impl_as_value_integer!(u64, Value::UInt64);

macro_rules! impl_as_value {
    ($source:ty, $destination:path, $parse:expr $(, $pat_rest:pat => $expr_rest:expr)* $(,)?) => {
        impl AsValue for $source {
            fn as_empty_value() -> Value {
                $destination(None)
            }
            fn as_value(self) -> Value {
                $destination(Some(self.into()))
            }
            fn try_from_value(value: Value) -> Result<Self> {
                match value {
                    $destination(Some(v)) => Ok(v.into()),
                    $($pat_rest => $expr_rest,)*
                    #[allow(unreachable_patterns)]
                    Value::Unknown(Some(ref v)) => <Self as AsValue>::parse(v),
                    _ => Err(mismatch::<Self>(&value)),
                }
            }
            fn parse(input: &str) -> Result<Self> {
                $parse(input)
            }
        }
    };
}

impl_as_value!(
    bool,
    Value::Boolean,
    |input: &str| {
        match input.trim() {
            x if ["t", "true", "1", "yes", "on", "y"].iter().any(|v| x.eq_ignore_ascii_case(v)) => Ok(true),
            x if ["f", "false", "0", "no", "off", "n"].iter().any(|v| x.eq_ignore_ascii_case(v)) => Ok(false),
            _ => Err(Error::msg(format!("Cannot parse boolean from `{}`", truncate_long!(input)))),
        }
    },
    Value::Int8(Some(v)) => Ok(v != 0),
    Value::Int16(Some(v)) => Ok(v != 0),
    Value::Int32(Some(v)) => Ok(v != 0),
    Value::Int64(Some(v)) => Ok(v != 0),
    Value::UInt8(Some(v)) => Ok(v != 0),
    Value::UInt16(Some(v)) => Ok(v != 0),
    Value::UInt32(Some(v)) => Ok(v != 0),
    Value::UInt64(Some(v)) => Ok(v != 0),
);

macro_rules! parse_float {
    ($input:expr) => {{
        let input: &str = $input;
        fast_float::parse(input.trim()).with_context(|| {
            format!(
                "Cannot parse `{}` as a floating point value",
                truncate_long!(input)
            )
        })
    }};
}
impl_as_value!(
    f32,
    Value::Float32,
    |input: &str| parse_float!(input),
    Value::Float64(Some(v)) => Ok(v as _),
    Value::Decimal(Some(v)) => v.to_f32().ok_or_else(|| Error::msg(format!("Decimal {v} does not fit into f32"))),
    Value::Int32(Some(v)) => Ok(v as _),
    Value::Int64(Some(v)) => Ok(v as _),
);
impl_as_value!(
    f64,
    Value::Float64,
    |input: &str| parse_float!(input),
    Value::Float32(Some(v)) => Ok(v as _),
    Value::Decimal(Some(v)) => v.to_f64().ok_or_else(|| Error::msg(format!("Decimal {v} does not fit into f64"))),
    Value::Int32(Some(v)) => Ok(v as _),
    Value::Int64(Some(v)) => Ok(v as _),
);

impl_as_value!(
    String,
    Value::Varchar,
    |input: &str| Ok(input.to_owned()),
    Value::Unknown(Some(v)) => Ok(v),
);

impl_as_value!(
    Box<[u8]>,
    Value::Blob,
    |input: &str| {
        let digits = input
            .strip_prefix("\\x")
            .or_else(|| input.strip_prefix("\\X"))
            .unwrap_or(input);
        hex::decode(digits).map(Into::into).with_context(|| {
            format!(
                "While decoding `{}` as {}",
                truncate_long!(input),
                any::type_name::<Self>()
            )
        })
    },
    Value::Varchar(Some(v)) => Ok(v.into_bytes().into()),
);

impl_as_value!(
    Uuid,
    Value::Uuid,
    |input: &str| {
        Uuid::parse_str(input.trim())
            .with_context(|| format!("Cannot parse `{}` as a uuid", truncate_long!(input)))
    },
    Value::Varchar(Some(ref v)) => <Self as AsValue>::parse(v),
);

fn parse_time<T>(input: &str, formats: &[&str]) -> Result<T>
where
    T: TryFrom<time::parsing::Parsed, Error = time::error::TryFromParsed>,
{
    let value = input.trim();
    for format in formats {
        let format: Vec<BorrowedFormatItem> = parse_borrowed::<2>(format)?;
        let mut parsed = time::parsing::Parsed::new();
        if let Ok(remaining) = parsed.parse_items(value.as_bytes(), &format)
            && remaining.is_empty()
        {
            return Ok(parsed.try_into()?);
        }
    }
    Err(Error::msg(format!(
        "Cannot parse `{}` as {}",
        truncate_long!(input),
        any::type_name::<T>()
    )))
}

impl_as_value!(
    Date,
    Value::Date,
    |input: &str| parse_time(input, &["[year]-[month]-[day]"]),
    Value::Varchar(Some(ref v)) => <Self as AsValue>::parse(v),
);

impl_as_value!(
    Time,
    Value::Time,
    |input: &str| parse_time(
        input,
        &[
            "[hour]:[minute]:[second].[subsecond]",
            "[hour]:[minute]:[second]",
            "[hour]:[minute]",
        ],
    ),
    Value::Varchar(Some(ref v)) => <Self as AsValue>::parse(v),
);

impl_as_value!(
    PrimitiveDateTime,
    Value::Timestamp,
    |input: &str| parse_time(
        input,
        &[
            "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]",
            "[year]-[month]-[day]T[hour]:[minute]:[second]",
            "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond]",
            "[year]-[month]-[day] [hour]:[minute]:[second]",
            "[year]-[month]-[day] [hour]:[minute]",
        ],
    ),
    Value::Varchar(Some(ref v)) => <Self as AsValue>::parse(v),
);

impl_as_value!(
    OffsetDateTime,
    Value::TimestampWithTimezone,
    |input: &str| parse_time(
        input,
        &[
            "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond][offset_hour sign:mandatory]:[offset_minute]",
            "[year]-[month]-[day]T[hour]:[minute]:[second][offset_hour sign:mandatory]:[offset_minute]",
            "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond][offset_hour sign:mandatory]:[offset_minute]",
            "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond][offset_hour sign:mandatory]",
            "[year]-[month]-[day] [hour]:[minute]:[second][offset_hour sign:mandatory]:[offset_minute]",
            "[year]-[month]-[day] [hour]:[minute]:[second][offset_hour sign:mandatory]",
        ],
    )
    .or_else(|_| <PrimitiveDateTime as AsValue>::parse(input).map(PrimitiveDateTime::assume_utc)),
    Value::Timestamp(Some(v)) => Ok(v.assume_utc()),
    Value::Varchar(Some(ref v)) => <Self as AsValue>::parse(v),
);

impl AsValue for Decimal {
    fn as_empty_value() -> Value {
        Value::Decimal(None)
    }
    fn as_value(self) -> Value {
        Value::Decimal(Some(self))
    }
    fn try_from_value(value: Value) -> Result<Self> {
        if let Some(v) = value.as_i128() {
            return Decimal::from_i128(v).ok_or_else(|| mismatch::<Self>(&value));
        }
        match value {
            Value::Decimal(Some(v)) => Ok(v),
            Value::Float32(Some(v)) => Decimal::from_f32(v).ok_or_else(|| mismatch::<Self>(&value)),
            Value::Float64(Some(v)) => Decimal::from_f64(v).ok_or_else(|| mismatch::<Self>(&value)),
            Value::Unknown(Some(ref v)) | Value::Varchar(Some(ref v)) => <Self as AsValue>::parse(v),
            _ => Err(mismatch::<Self>(&value)),
        }
    }
    fn parse(input: &str) -> Result<Self> {
        Decimal::from_str(input.trim())
            .or_else(|_| Decimal::from_scientific(input.trim()))
            .with_context(|| format!("Cannot parse `{}` as Decimal", truncate_long!(input)))
    }
}

impl<T: AsValue> AsValue for Option<T> {
    fn as_empty_value() -> Value {
        T::as_empty_value()
    }
    fn as_value(self) -> Value {
        match self {
            Some(v) => v.as_value(),
            None => T::as_empty_value(),
        }
    }
    fn try_from_value(value: Value) -> Result<Self> {
        Ok(if value.is_null() {
            None
        } else {
            Some(<T as AsValue>::try_from_value(value)?)
        })
    }
    fn parse(input: &str) -> Result<Self> {
        if input.trim().eq_ignore_ascii_case("null") {
            return Ok(None);
        }
        T::parse(input).map(Some)
    }
}

impl<T: AsValue> AsValue for Vec<T> {
    fn as_empty_value() -> Value {
        Value::List(None, Box::new(T::as_empty_value()))
    }
    fn as_value(self) -> Value {
        Value::List(
            Some(self.into_iter().map(AsValue::as_value).collect()),
            Box::new(T::as_empty_value()),
        )
    }
    fn try_from_value(value: Value) -> Result<Self> {
        match value {
            Value::List(Some(v), ..) => v.into_iter().map(T::try_from_value).collect(),
            _ => Err(mismatch::<Self>(&value)),
        }
    }
}
