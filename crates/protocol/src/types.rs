//! Type descriptors attached to encoded values.
//!
//! A [`Type`] tells a reader how to interpret the bytes produced by the value
//! codec. Composite values embed the serialised descriptor of each field so
//! the encoding stays self-describing.
//!
//! ## Descriptor bytes
//!
//! | Kind | Layout |
//! |------|--------|
//! | scalar | one kind byte |
//! | `array` | kind byte, then the underlying descriptor |
//! | `tuple` / `record` | kind byte, 4-byte big-endian item count, then each item descriptor |

use serde::{Deserialize, Serialize};

use crate::errors::CodecError;

/// Every value kind known to the protocol.
///
/// Not every kind is encodable by the codec; see [`crate::value::encode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum Kind {
    Any = 0,
    Bool = 1,
    String = 2,
    Int8 = 3,
    Int16 = 4,
    Int32 = 5,
    Int64 = 6,
    Uint8 = 7,
    Uint16 = 8,
    Uint32 = 9,
    Uint64 = 10,
    Float32 = 11,
    Float64 = 12,
    Array = 13,
    Object = 14,
    Tuple = 15,
    Time = 16,
    Date = 17,
    Bytes = 18,
    Uuid = 19,
    Timestamp = 20,
    Inet = 21,
    Duration = 22,
    Record = 23,
}

impl Kind {
    const ALL: [Kind; 24] = [
        Kind::Any,
        Kind::Bool,
        Kind::String,
        Kind::Int8,
        Kind::Int16,
        Kind::Int32,
        Kind::Int64,
        Kind::Uint8,
        Kind::Uint16,
        Kind::Uint32,
        Kind::Uint64,
        Kind::Float32,
        Kind::Float64,
        Kind::Array,
        Kind::Object,
        Kind::Tuple,
        Kind::Time,
        Kind::Date,
        Kind::Bytes,
        Kind::Uuid,
        Kind::Timestamp,
        Kind::Inet,
        Kind::Duration,
        Kind::Record,
    ];

    /// Returns the wire code of this kind.
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Looks up a kind by its wire code.
    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.get(usize::from(code)).copied()
    }

    /// Lower-case name used in descriptors and error messages.
    pub const fn name(self) -> &'static str {
        match self {
            Kind::Any => "any",
            Kind::Bool => "bool",
            Kind::String => "string",
            Kind::Int8 => "int8",
            Kind::Int16 => "int16",
            Kind::Int32 => "int32",
            Kind::Int64 => "int64",
            Kind::Uint8 => "uint8",
            Kind::Uint16 => "uint16",
            Kind::Uint32 => "uint32",
            Kind::Uint64 => "uint64",
            Kind::Float32 => "float32",
            Kind::Float64 => "float64",
            Kind::Array => "array",
            Kind::Object => "object",
            Kind::Tuple => "tuple",
            Kind::Time => "time",
            Kind::Date => "date",
            Kind::Bytes => "bytes",
            Kind::Uuid => "uuid",
            Kind::Timestamp => "timestamp",
            Kind::Inet => "inet",
            Kind::Duration => "duration",
            Kind::Record => "record",
        }
    }
}

impl std::fmt::Display for Kind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------

/// Declared type of a value or column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Type {
    /// The value kind.
    pub kind: Kind,

    /// Item types of a `tuple` or `record`; empty for every other kind.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<Type>,

    /// Element type of an `array`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub underlying: Option<Box<Type>>,
}

impl Type {
    /// A type with no items or element type (`Type::basic(Kind::String)`).
    pub const fn basic(kind: Kind) -> Self {
        Self {
            kind,
            items: Vec::new(),
            underlying: None,
        }
    }

    /// A tuple containing the given item types.
    pub fn tuple(items: impl IntoIterator<Item = Type>) -> Self {
        Self {
            kind: Kind::Tuple,
            items: items.into_iter().collect(),
            underlying: None,
        }
    }

    /// A record containing the given item types.
    pub fn record(items: impl IntoIterator<Item = Type>) -> Self {
        Self {
            kind: Kind::Record,
            items: items.into_iter().collect(),
            underlying: None,
        }
    }

    /// An array of `item`.
    pub fn array(item: Type) -> Self {
        Self {
            kind: Kind::Array,
            items: Vec::new(),
            underlying: Some(Box::new(item)),
        }
    }

    /// Serialises this descriptor into its byte form.
    pub fn to_bytes(&self) -> Result<Vec<u8>, CodecError> {
        let mut buf = Vec::new();
        self.write_to(&mut buf)?;
        Ok(buf)
    }

    /// Appends the byte form of this descriptor to `buf`.
    pub fn write_to(&self, buf: &mut Vec<u8>) -> Result<(), CodecError> {
        buf.push(self.kind.code());
        match self.kind {
            Kind::Array => match &self.underlying {
                Some(item) => item.write_to(buf)?,
                None => buf.push(Kind::Any.code()),
            },
            Kind::Tuple | Kind::Record => {
                let count = u32::try_from(self.items.len()).map_err(|_| CodecError::TooLarge {
                    what: "descriptor items",
                    len: self.items.len(),
                })?;
                buf.extend_from_slice(&count.to_be_bytes());
                for item in &self.items {
                    item.write_to(buf)?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Parses a descriptor, requiring that `bytes` holds exactly one.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        let (ty, rest) = Self::read_from(bytes)?;
        if !rest.is_empty() {
            return Err(CodecError::TrailingBytes {
                kind: ty.kind,
                count: rest.len(),
            });
        }
        Ok(ty)
    }

    fn read_from(bytes: &[u8]) -> Result<(Self, &[u8]), CodecError> {
        let (&code, rest) = bytes
            .split_first()
            .ok_or(CodecError::Truncated { kind: Kind::Any })?;
        let kind = Kind::from_code(code).ok_or(CodecError::UnknownKind(code))?;
        match kind {
            Kind::Array => {
                let (item, rest) = Self::read_from(rest)?;
                Ok((Self::array(item), rest))
            }
            Kind::Tuple | Kind::Record => {
                let (count, mut rest) = split_u32(rest).ok_or(CodecError::Truncated { kind })?;
                let mut items = Vec::new();
                for _ in 0..count {
                    let (item, remaining) = Self::read_from(rest)?;
                    items.push(item);
                    rest = remaining;
                }
                let ty = Self {
                    kind,
                    items,
                    underlying: None,
                };
                Ok((ty, rest))
            }
            _ => Ok((Self::basic(kind), rest)),
        }
    }
}

impl From<Kind> for Type {
    fn from(kind: Kind) -> Self {
        Self::basic(kind)
    }
}

impl std::fmt::Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            Kind::Array => match &self.underlying {
                Some(item) => write!(f, "array<{item}>"),
                None => f.write_str("array<any>"),
            },
            Kind::Tuple | Kind::Record => {
                write!(f, "{}<", self.kind)?;
                for (index, item) in self.items.iter().enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str(">")
            }
            kind => write!(f, "{kind}"),
        }
    }
}

/// Splits a big-endian `u32` off the front of `bytes`.
pub(crate) fn split_u32(bytes: &[u8]) -> Option<(u32, &[u8])> {
    let (head, rest) = bytes.split_first_chunk::<4>()?;
    Some((u32::from_be_bytes(*head), rest))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_codes_round_trip() {
        for kind in Kind::ALL {
            assert_eq!(Kind::from_code(kind.code()), Some(kind));
        }
        assert_eq!(Kind::from_code(200), None);
    }

    #[test]
    fn test_basic_descriptor_is_one_byte() {
        assert_eq!(Type::basic(Kind::Int32).to_bytes().unwrap(), vec![5]);
    }

    #[test]
    fn test_nested_descriptor_round_trips() {
        let ty = Type::record([
            Type::basic(Kind::String),
            Type::array(Type::basic(Kind::Float64)),
            Type::tuple([Type::basic(Kind::Bool), Type::basic(Kind::Uuid)]),
        ]);
        let bytes = ty.to_bytes().unwrap();
        assert_eq!(Type::from_bytes(&bytes).unwrap(), ty);
    }

    #[test]
    fn test_descriptor_rejects_trailing_and_unknown_bytes() {
        assert!(matches!(
            Type::from_bytes(&[1, 1]),
            Err(CodecError::TrailingBytes { .. })
        ));
        assert!(matches!(
            Type::from_bytes(&[99]),
            Err(CodecError::UnknownKind(99))
        ));
        assert!(matches!(
            Type::from_bytes(&[15, 0, 0]),
            Err(CodecError::Truncated { kind: Kind::Tuple })
        ));
    }

    #[test]
    fn test_type_display() {
        assert_eq!(Type::array(Type::basic(Kind::Int8)).to_string(), "array<int8>");
        assert_eq!(
            Type::tuple([Kind::Bool.into(), Kind::String.into()]).to_string(),
            "tuple<bool, string>"
        );
    }
}
