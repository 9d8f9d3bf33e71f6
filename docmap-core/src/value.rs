//! Property values and per-type coercion.
//!
//! [`Value`] is the closed set of kinds a property can hold. Every mappable field
//! type implements [`FieldValue`], which converts the field into a [`Value`] on
//! encode and back on decode. Decoding is width-tolerant for numbers: any stored
//! integer converts into any integer field as long as the number fits, and a
//! number that does not fit is reported as [`Coercion::Overflow`] rather than
//! truncated.

use bson::oid::ObjectId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// A single property value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Absent value (an `Option` field holding `None`).
    Null,
    /// Boolean value.
    Bool(bool),
    /// 8-bit signed integer.
    I8(i8),
    /// 16-bit signed integer.
    I16(i16),
    /// 32-bit signed integer.
    I32(i32),
    /// 64-bit signed integer.
    I64(i64),
    /// 8-bit unsigned integer.
    U8(u8),
    /// 16-bit unsigned integer.
    U16(u16),
    /// 32-bit unsigned integer.
    U32(u32),
    /// 64-bit unsigned integer.
    U64(u64),
    /// 32-bit float.
    F32(f32),
    /// 64-bit float.
    F64(f64),
    /// UTF-8 string.
    String(String),
    /// Universally unique identifier.
    Uuid(Uuid),
    /// UTC timestamp.
    DateTime(DateTime<Utc>),
    /// Document object identifier.
    ObjectId(ObjectId),
}

/// The kind of a [`Value`] or of a field's declared type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldKind {
    Null,
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    String,
    Uuid,
    DateTime,
    ObjectId,
}

impl FieldKind {
    /// Returns the lowercase name used in error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::Null => "null",
            FieldKind::Bool => "bool",
            FieldKind::I8 => "i8",
            FieldKind::I16 => "i16",
            FieldKind::I32 => "i32",
            FieldKind::I64 => "i64",
            FieldKind::U8 => "u8",
            FieldKind::U16 => "u16",
            FieldKind::U32 => "u32",
            FieldKind::U64 => "u64",
            FieldKind::F32 => "f32",
            FieldKind::F64 => "f64",
            FieldKind::String => "string",
            FieldKind::Uuid => "uuid",
            FieldKind::DateTime => "datetime",
            FieldKind::ObjectId => "object id",
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Value {
    /// Returns the kind of this value.
    pub fn kind(&self) -> FieldKind {
        match self {
            Value::Null => FieldKind::Null,
            Value::Bool(_) => FieldKind::Bool,
            Value::I8(_) => FieldKind::I8,
            Value::I16(_) => FieldKind::I16,
            Value::I32(_) => FieldKind::I32,
            Value::I64(_) => FieldKind::I64,
            Value::U8(_) => FieldKind::U8,
            Value::U16(_) => FieldKind::U16,
            Value::U32(_) => FieldKind::U32,
            Value::U64(_) => FieldKind::U64,
            Value::F32(_) => FieldKind::F32,
            Value::F64(_) => FieldKind::F64,
            Value::String(_) => FieldKind::String,
            Value::Uuid(_) => FieldKind::Uuid,
            Value::DateTime(_) => FieldKind::DateTime,
            Value::ObjectId(_) => FieldKind::ObjectId,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns the string slice if this is a `String` value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::I8(v) => write!(f, "{v}"),
            Value::I16(v) => write!(f, "{v}"),
            Value::I32(v) => write!(f, "{v}"),
            Value::I64(v) => write!(f, "{v}"),
            Value::U8(v) => write!(f, "{v}"),
            Value::U16(v) => write!(f, "{v}"),
            Value::U32(v) => write!(f, "{v}"),
            Value::U64(v) => write!(f, "{v}"),
            Value::F32(v) => write!(f, "{v}"),
            Value::F64(v) => write!(f, "{v}"),
            Value::String(v) => write!(f, "{v:?}"),
            Value::Uuid(v) => write!(f, "{v}"),
            Value::DateTime(v) => write!(f, "{}", v.to_rfc3339()),
            Value::ObjectId(v) => write!(f, "{}", v.to_hex()),
        }
    }
}

/// Why a [`Value`] could not be converted into a field type.
///
/// The decoder turns this into a [`ModelError`](crate::error::ModelError) once it
/// knows which property key was being decoded.
#[derive(Debug, Clone, PartialEq)]
pub enum Coercion {
    /// The stored kind cannot be assigned to the field kind.
    Mismatch { expected: FieldKind, found: FieldKind },
    /// The stored number does not fit the field width.
    Overflow { value: String, target: FieldKind },
}

/// Conversion between a field type and a property [`Value`].
///
/// Implemented for all integer widths, `f32`, `f64`, `bool`, `String`, [`Uuid`],
/// `DateTime<Utc>`, [`ObjectId`] and `Option<T>` of any of these. A field whose
/// type does not implement this trait cannot derive `Record`.
pub trait FieldValue: Sized {
    /// The kind this type encodes to.
    const KIND: FieldKind;

    fn to_value(&self) -> Value;

    fn from_value(value: Value) -> Result<Self, Coercion>;
}

fn integer<T>(value: &Value, target: FieldKind) -> Result<T, Coercion>
where
    T: TryFrom<i64> + TryFrom<u64>,
{
    let converted = match value {
        Value::I8(v) => T::try_from(i64::from(*v)).ok(),
        Value::I16(v) => T::try_from(i64::from(*v)).ok(),
        Value::I32(v) => T::try_from(i64::from(*v)).ok(),
        Value::I64(v) => T::try_from(*v).ok(),
        Value::U8(v) => T::try_from(u64::from(*v)).ok(),
        Value::U16(v) => T::try_from(u64::from(*v)).ok(),
        Value::U32(v) => T::try_from(u64::from(*v)).ok(),
        Value::U64(v) => T::try_from(*v).ok(),
        other => {
            return Err(Coercion::Mismatch {
                expected: target,
                found: other.kind(),
            });
        }
    };

    converted.ok_or_else(|| Coercion::Overflow {
        value: value.to_string(),
        target,
    })
}

macro_rules! impl_integer {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl FieldValue for $ty {
                const KIND: FieldKind = FieldKind::$variant;

                fn to_value(&self) -> Value {
                    Value::$variant(*self)
                }

                fn from_value(value: Value) -> Result<Self, Coercion> {
                    integer(&value, Self::KIND)
                }
            }

            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v)
                }
            }
        )*
    };
}

impl_integer! {
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
}

impl FieldValue for isize {
    const KIND: FieldKind = FieldKind::I64;

    fn to_value(&self) -> Value {
        Value::I64(*self as i64)
    }

    fn from_value(value: Value) -> Result<Self, Coercion> {
        integer(&value, Self::KIND)
    }
}

impl FieldValue for usize {
    const KIND: FieldKind = FieldKind::U64;

    fn to_value(&self) -> Value {
        Value::U64(*self as u64)
    }

    fn from_value(value: Value) -> Result<Self, Coercion> {
        integer(&value, Self::KIND)
    }
}

impl FieldValue for f64 {
    const KIND: FieldKind = FieldKind::F64;

    fn to_value(&self) -> Value {
        Value::F64(*self)
    }

    fn from_value(value: Value) -> Result<Self, Coercion> {
        match value {
            Value::F32(v) => Ok(f64::from(v)),
            Value::F64(v) => Ok(v),
            other => Err(Coercion::Mismatch {
                expected: Self::KIND,
                found: other.kind(),
            }),
        }
    }
}

impl FieldValue for f32 {
    const KIND: FieldKind = FieldKind::F32;

    fn to_value(&self) -> Value {
        Value::F32(*self)
    }

    fn from_value(value: Value) -> Result<Self, Coercion> {
        match value {
            Value::F32(v) => Ok(v),
            Value::F64(v) if v.is_finite() && v.abs() > f64::from(f32::MAX) => {
                Err(Coercion::Overflow {
                    value: v.to_string(),
                    target: Self::KIND,
                })
            }
            Value::F64(v) => Ok(v as f32),
            other => Err(Coercion::Mismatch {
                expected: Self::KIND,
                found: other.kind(),
            }),
        }
    }
}

macro_rules! impl_exact {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl FieldValue for $ty {
                const KIND: FieldKind = FieldKind::$variant;

                fn to_value(&self) -> Value {
                    Value::$variant(self.clone())
                }

                fn from_value(value: Value) -> Result<Self, Coercion> {
                    match value {
                        Value::$variant(v) => Ok(v),
                        other => Err(Coercion::Mismatch {
                            expected: Self::KIND,
                            found: other.kind(),
                        }),
                    }
                }
            }

            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v)
                }
            }
        )*
    };
}

impl_exact! {
    bool => Bool,
    String => String,
    Uuid => Uuid,
    DateTime<Utc> => DateTime,
    ObjectId => ObjectId,
}

impl<T: FieldValue> FieldValue for Option<T> {
    const KIND: FieldKind = T::KIND;

    fn to_value(&self) -> Value {
        match self {
            Some(v) => v.to_value(),
            None => Value::Null,
        }
    }

    fn from_value(value: Value) -> Result<Self, Coercion> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::F32(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::F64(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}
