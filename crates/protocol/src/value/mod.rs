//! Row values and their binary wire encoding.
//!
//! Handlers emit rows as `Vec<Value>`. [`Value`] is a closed set of kinds so
//! the codec in [`encode`] is a total `match`; kinds the protocol knows about
//! but cannot encode yet fall into an explicit unsupported arm.
//!
//! ## Null values
//!
//! A null of any kind encodes to zero bytes. The encoding alone cannot tell a
//! null apart from an empty object, so readers rely on the column's
//! nullability metadata to disambiguate.

mod decode;
mod encode;
mod inet;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::types::Kind;

pub use decode::decode;
pub use encode::{
    encode, encode_bool, encode_f32, encode_f64, encode_i16, encode_i32, encode_i64, encode_i8,
    encode_inet, encode_row, encode_str, encode_u16, encode_u32, encode_u64, encode_u8,
    encode_uuid,
};
pub use inet::{Inet, ParseInetError};

/// A dynamically typed value emitted by a handler.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Absent value of the given kind.
    Null(Kind),
    Bool(bool),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Uint8(u8),
    Uint16(u16),
    Uint32(u32),
    Uint64(u64),
    Float32(f32),
    Float64(f64),
    String(String),
    Uuid(Uuid),
    Inet(Inet),
    /// Field name to value. Encoded in key order.
    Object(BTreeMap<String, Value>),
    /// Elements must all share one type.
    Array(Vec<Value>),
    /// Representable but not encodable yet.
    Timestamp(DateTime<Utc>),
}

impl Value {
    /// Returns the kind of this value.
    pub fn kind(&self) -> Kind {
        match self {
            Value::Null(kind) => *kind,
            Value::Bool(_) => Kind::Bool,
            Value::Int8(_) => Kind::Int8,
            Value::Int16(_) => Kind::Int16,
            Value::Int32(_) => Kind::Int32,
            Value::Int64(_) => Kind::Int64,
            Value::Uint8(_) => Kind::Uint8,
            Value::Uint16(_) => Kind::Uint16,
            Value::Uint32(_) => Kind::Uint32,
            Value::Uint64(_) => Kind::Uint64,
            Value::Float32(_) => Kind::Float32,
            Value::Float64(_) => Kind::Float64,
            Value::String(_) => Kind::String,
            Value::Uuid(_) => Kind::Uuid,
            Value::Inet(_) => Kind::Inet,
            Value::Object(_) => Kind::Object,
            Value::Array(_) => Kind::Array,
            Value::Timestamp(_) => Kind::Timestamp,
        }
    }

    /// Returns `true` for [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null(_))
    }
}

// ---------------------------------------------------------------------------
// Conversions. `Option<T>` maps `None` to a null of T's kind.
// ---------------------------------------------------------------------------
macro_rules! value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Value::$variant(value)
                }
            }

            impl From<Option<$ty>> for Value {
                fn from(value: Option<$ty>) -> Self {
                    value.map_or(Value::Null(Kind::$variant), Value::$variant)
                }
            }
        )*
    };
}

value_from! {
    bool => Bool,
    i8 => Int8,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
    u8 => Uint8,
    u16 => Uint16,
    u32 => Uint32,
    u64 => Uint64,
    f32 => Float32,
    f64 => Float64,
    String => String,
    Uuid => Uuid,
    Inet => Inet,
    DateTime<Utc> => Timestamp,
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<Option<&str>> for Value {
    fn from(value: Option<&str>) -> Self {
        value.map_or(Value::Null(Kind::String), Value::from)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(fields: BTreeMap<String, Value>) -> Self {
        Value::Object(fields)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::Array(items.into_iter().map(Into::into).collect())
    }
}
