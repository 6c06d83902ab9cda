//! # Runtime Field Values
//!
//! This module provides `Value<'a>`, the polymorphic value accepted by
//! [`Table::set_field_value`](crate::Table::set_field_value) and produced by
//! the struct codec. Strings and byte blobs use `Cow` so record structs can
//! hand out borrowed data without copying.
//!
//! Every signed and unsigned integer width promotes to `Int(i64)`; `f32`
//! promotes to `Float(f64)`. `Null` leaves a field untouched (all spaces).
//!
//! The [`FieldValue`] trait marks the leaf types a record struct may declare
//! and is the extension point for custom representations: an implementation
//! chooses how its value is rendered into a `Value` and recovered from one.

use std::borrow::Cow;

use chrono::NaiveDate;
use eyre::Result;

use crate::error::Error;
use crate::field::FieldType;

/// Polymorphic field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value<'a> {
    /// No value; setting it is a no-op.
    Null,
    Str(Cow<'a, str>),
    Int(i64),
    Float(f64),
    Bool(bool),
    Date(NaiveDate),
    /// Raw bytes; must be valid UTF-8 and routes to the character codec.
    Bytes(Cow<'a, [u8]>),
}

impl Value<'_> {
    /// Short name of the variant, used in error reports.
    pub(crate) fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Str(_) => "string",
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::Bool(_) => "bool",
            Value::Date(_) => "date",
            Value::Bytes(_) => "bytes",
        }
    }
}

impl<'a> From<&'a str> for Value<'a> {
    fn from(v: &'a str) -> Self {
        Value::Str(Cow::Borrowed(v))
    }
}

impl From<String> for Value<'_> {
    fn from(v: String) -> Self {
        Value::Str(Cow::Owned(v))
    }
}

impl From<bool> for Value<'_> {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<NaiveDate> for Value<'_> {
    fn from(v: NaiveDate) -> Self {
        Value::Date(v)
    }
}

impl From<Option<NaiveDate>> for Value<'_> {
    fn from(v: Option<NaiveDate>) -> Self {
        v.map_or(Value::Null, Value::Date)
    }
}

impl<'a> From<&'a [u8]> for Value<'a> {
    fn from(v: &'a [u8]) -> Self {
        Value::Bytes(Cow::Borrowed(v))
    }
}

impl From<Vec<u8>> for Value<'_> {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(Cow::Owned(v))
    }
}

impl From<f32> for Value<'_> {
    fn from(v: f32) -> Self {
        Value::Float(f64::from(v))
    }
}

impl From<f64> for Value<'_> {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

macro_rules! value_from_int {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Value<'_> {
                fn from(v: $ty) -> Self {
                    Value::Int(v as i64)
                }
            }
        )*
    };
}

value_from_int!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

/// The shape of a record-struct leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Str,
    Int,
    Float,
    Bool,
    Date,
}

impl ValueKind {
    /// Wire type used when a field tag does not declare one. Date leaves
    /// have no inferred type: `D` must be declared with a `type:D` token.
    pub(crate) fn inferred_field_type(self) -> Option<FieldType> {
        match self {
            ValueKind::Str => Some(FieldType::Character),
            ValueKind::Int => Some(FieldType::Numeric),
            ValueKind::Float => Some(FieldType::Float),
            ValueKind::Bool => Some(FieldType::Logical),
            ValueKind::Date => None,
        }
    }
}

fn unmarshal_err(value: &Value<'_>, target: &'static str) -> eyre::Report {
    let text = match value {
        Value::Str(s) => s.clone().into_owned(),
        Value::Int(i) => i.to_string(),
        Value::Float(f) => f.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Date(d) => d.format("%Y%m%d").to_string(),
        Value::Bytes(b) => String::from_utf8_lossy(b).into_owned(),
        Value::Null => String::new(),
    };
    Error::UnmarshalType {
        value: text,
        target,
    }
    .into()
}

/// Leaf types a record struct may declare.
pub trait FieldValue: Sized {
    /// Shape of this leaf, used for wire-type inference and column reads.
    const KIND: ValueKind;

    /// Renders the leaf into a [`Value`] for encoding.
    fn to_value(&self) -> Value<'_>;

    /// Recovers the leaf from a decoded [`Value`].
    fn from_value(value: &Value<'_>) -> Result<Self>;
}

impl FieldValue for String {
    const KIND: ValueKind = ValueKind::Str;

    fn to_value(&self) -> Value<'_> {
        Value::Str(Cow::Borrowed(self))
    }

    fn from_value(value: &Value<'_>) -> Result<Self> {
        match value {
            Value::Str(s) => Ok(s.clone().into_owned()),
            other => Err(unmarshal_err(other, "String")),
        }
    }
}

impl FieldValue for bool {
    const KIND: ValueKind = ValueKind::Bool;

    fn to_value(&self) -> Value<'_> {
        Value::Bool(*self)
    }

    fn from_value(value: &Value<'_>) -> Result<Self> {
        match value {
            Value::Bool(b) => Ok(*b),
            other => Err(unmarshal_err(other, "bool")),
        }
    }
}

impl FieldValue for NaiveDate {
    const KIND: ValueKind = ValueKind::Date;

    fn to_value(&self) -> Value<'_> {
        Value::Date(*self)
    }

    fn from_value(value: &Value<'_>) -> Result<Self> {
        match value {
            Value::Date(d) => Ok(*d),
            // A blank date field reads as the zero date.
            Value::Null => Ok(NaiveDate::default()),
            other => Err(unmarshal_err(other, "NaiveDate")),
        }
    }
}

impl FieldValue for Option<NaiveDate> {
    const KIND: ValueKind = ValueKind::Date;

    fn to_value(&self) -> Value<'_> {
        self.map_or(Value::Null, Value::Date)
    }

    fn from_value(value: &Value<'_>) -> Result<Self> {
        match value {
            Value::Date(d) => Ok(Some(*d)),
            Value::Null => Ok(None),
            other => Err(unmarshal_err(other, "Option<NaiveDate>")),
        }
    }
}

macro_rules! field_value_int {
    ($($ty:ty),*) => {
        $(
            impl FieldValue for $ty {
                const KIND: ValueKind = ValueKind::Int;

                fn to_value(&self) -> Value<'_> {
                    Value::Int(*self as i64)
                }

                fn from_value(value: &Value<'_>) -> Result<Self> {
                    match value {
                        Value::Int(i) => <$ty>::try_from(*i)
                            .map_err(|_| unmarshal_err(value, stringify!($ty))),
                        other => Err(unmarshal_err(other, stringify!($ty))),
                    }
                }
            }
        )*
    };
}

field_value_int!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl FieldValue for f32 {
    const KIND: ValueKind = ValueKind::Float;

    fn to_value(&self) -> Value<'_> {
        Value::Float(f64::from(*self))
    }

    fn from_value(value: &Value<'_>) -> Result<Self> {
        match value {
            Value::Float(f) => Ok(*f as f32),
            other => Err(unmarshal_err(other, "f32")),
        }
    }
}

impl FieldValue for f64 {
    const KIND: ValueKind = ValueKind::Float;

    fn to_value(&self) -> Value<'_> {
        Value::Float(*self)
    }

    fn from_value(value: &Value<'_>) -> Result<Self> {
        match value {
            Value::Float(f) => Ok(*f),
            other => Err(unmarshal_err(other, "f64")),
        }
    }
}
