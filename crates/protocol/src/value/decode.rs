//! Value decoding, the inverse of [`super::encode`].

use std::collections::BTreeMap;

use uuid::Uuid;

use super::{Inet, Value};
use crate::errors::CodecError;
use crate::types::{split_u32, Kind, Type};

/// Decodes one value of type `ty` from `bytes`.
///
/// Empty input decodes to [`Value::Null`] of the declared kind.
pub fn decode(ty: &Type, bytes: &[u8]) -> Result<Value, CodecError> {
    let kind = ty.kind;
    if bytes.is_empty() {
        return Ok(Value::Null(kind));
    }

    let value = match kind {
        Kind::Bool => match fixed::<1>(kind, bytes)? {
            [0] => Value::Bool(false),
            [1] => Value::Bool(true),
            [other] => return Err(CodecError::InvalidBool(other)),
        },
        Kind::Int8 => Value::Int8(i8::from_be_bytes(fixed(kind, bytes)?)),
        Kind::Int16 => Value::Int16(i16::from_be_bytes(fixed(kind, bytes)?)),
        Kind::Int32 => Value::Int32(i32::from_be_bytes(fixed(kind, bytes)?)),
        Kind::Int64 => Value::Int64(i64::from_be_bytes(fixed(kind, bytes)?)),
        Kind::Uint8 => Value::Uint8(u8::from_be_bytes(fixed(kind, bytes)?)),
        Kind::Uint16 => Value::Uint16(u16::from_be_bytes(fixed(kind, bytes)?)),
        Kind::Uint32 => Value::Uint32(u32::from_be_bytes(fixed(kind, bytes)?)),
        Kind::Uint64 => Value::Uint64(u64::from_be_bytes(fixed(kind, bytes)?)),
        Kind::Float32 => Value::Float32(f32::from_be_bytes(fixed(kind, bytes)?)),
        Kind::Float64 => Value::Float64(f64::from_be_bytes(fixed(kind, bytes)?)),
        Kind::String => Value::String(decode_string(bytes)?),
        Kind::Uuid => Value::Uuid(Uuid::from_bytes(fixed(kind, bytes)?)),
        Kind::Inet => match (bytes.len(), Inet::from_binary(bytes)) {
            (_, Some(inet)) => Value::Inet(inet),
            (5 | 17, None) => {
                return Err(CodecError::InvalidPrefix(bytes[bytes.len() - 1]));
            }
            (actual, None) => {
                return Err(CodecError::InvalidLength {
                    kind,
                    expected: if actual > 5 { 17 } else { 5 },
                    actual,
                });
            }
        },
        Kind::Object => Value::Object(decode_object(bytes)?),
        Kind::Array => {
            let item = ty
                .underlying
                .as_deref()
                .cloned()
                .unwrap_or(Type::basic(Kind::Any));
            Value::Array(decode_array(&item, bytes)?)
        }
        Kind::Any
        | Kind::Tuple
        | Kind::Time
        | Kind::Date
        | Kind::Bytes
        | Kind::Timestamp
        | Kind::Duration
        | Kind::Record => return Err(CodecError::Unsupported { kind }),
    };
    Ok(value)
}

fn fixed<const N: usize>(kind: Kind, bytes: &[u8]) -> Result<[u8; N], CodecError> {
    <[u8; N]>::try_from(bytes).map_err(|_| CodecError::InvalidLength {
        kind,
        expected: N,
        actual: bytes.len(),
    })
}

fn decode_string(bytes: &[u8]) -> Result<String, CodecError> {
    let kind = Kind::String;
    let (len, rest) = bytes
        .split_first_chunk::<8>()
        .ok_or(CodecError::Truncated { kind })?;
    let len = u64::from_be_bytes(*len);
    if len != rest.len() as u64 {
        return Err(CodecError::InvalidLength {
            kind,
            expected: usize::try_from(len).unwrap_or(usize::MAX),
            actual: rest.len(),
        });
    }
    let text = std::str::from_utf8(rest).map_err(|source| CodecError::InvalidUtf8 { kind, source })?;
    Ok(text.to_string())
}

fn decode_object(mut bytes: &[u8]) -> Result<BTreeMap<String, Value>, CodecError> {
    let kind = Kind::Object;
    let mut fields = BTreeMap::new();

    while !bytes.is_empty() {
        let terminator = bytes
            .iter()
            .position(|&b| b == 0)
            .ok_or(CodecError::Truncated { kind })?;
        let (name, rest) = bytes.split_at(terminator);
        let name = std::str::from_utf8(name)
            .map_err(|source| CodecError::InvalidUtf8 { kind, source })?
            .to_string();

        let rest = &rest[1..];
        let (header_len, rest) = split_u32(rest).ok_or(CodecError::Truncated { kind })?;
        let (value_len, rest) = split_u32(rest).ok_or(CodecError::Truncated { kind })?;
        let (header, rest) = split_len(kind, rest, header_len)?;
        let (frame, rest) = split_len(kind, rest, value_len)?;

        let ty = Type::from_bytes(header)?;
        fields.insert(name, decode(&ty, frame)?);
        bytes = rest;
    }

    Ok(fields)
}

fn decode_array(item: &Type, bytes: &[u8]) -> Result<Vec<Value>, CodecError> {
    let kind = Kind::Array;
    let (count, mut rest) = split_u32(bytes).ok_or(CodecError::Truncated { kind })?;

    let mut items = Vec::new();
    for _ in 0..count {
        let (len, remaining) = split_u32(rest).ok_or(CodecError::Truncated { kind })?;
        let (frame, remaining) = split_len(kind, remaining, len)?;
        items.push(decode(item, frame)?);
        rest = remaining;
    }

    if !rest.is_empty() {
        return Err(CodecError::TrailingBytes {
            kind,
            count: rest.len(),
        });
    }
    Ok(items)
}

fn split_len(kind: Kind, bytes: &[u8], len: u32) -> Result<(&[u8], &[u8]), CodecError> {
    let len = usize::try_from(len).map_err(|_| CodecError::Truncated { kind })?;
    if bytes.len() < len {
        return Err(CodecError::Truncated { kind });
    }
    Ok(bytes.split_at(len))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::encode;

    fn round_trip(value: Value) {
        let mut buf = Vec::new();
        let ty = encode(&value, &mut buf).unwrap();
        assert_eq!(decode(&ty, &buf).unwrap(), value, "bytes: {buf:?}");
    }

    #[test]
    fn test_scalar_round_trips() {
        round_trip(Value::Bool(true));
        round_trip(Value::Bool(false));
        round_trip(Value::Int8(i8::MIN));
        round_trip(Value::Int16(-300));
        round_trip(Value::Int32(-1));
        round_trip(Value::Int64(i64::MAX));
        round_trip(Value::Uint8(200));
        round_trip(Value::Uint16(258));
        round_trip(Value::Uint32(u32::MAX));
        round_trip(Value::Uint64(1 << 40));
        round_trip(Value::Float32(3.5));
        round_trip(Value::Float64(-0.125));
        round_trip(Value::from("hello, wörld"));
        round_trip(Value::from(""));
        round_trip(Value::Uuid(Uuid::from_u128(0x0123_4567_89ab_cdef_0123_4567_89ab_cdef)));
        round_trip(Value::Inet("172.16.0.0/12".parse().unwrap()));
        round_trip(Value::Inet("fe80::1/64".parse().unwrap()));
    }

    #[test]
    fn test_null_round_trips_for_every_kind() {
        for kind in [Kind::Bool, Kind::Int32, Kind::Float64, Kind::String, Kind::Uuid, Kind::Inet] {
            round_trip(Value::Null(kind));
        }
    }

    #[test]
    fn test_object_round_trip() {
        let mut nested = BTreeMap::new();
        nested.insert("ok".to_string(), Value::Bool(true));

        let mut fields = BTreeMap::new();
        fields.insert("name".to_string(), Value::from("luno"));
        fields.insert("count".to_string(), Value::Uint32(3));
        fields.insert("missing".to_string(), Value::Null(Kind::Int64));
        fields.insert("nested".to_string(), Value::Object(nested));
        fields.insert("tags".to_string(), Value::from(vec!["a", "b"]));

        round_trip(Value::Object(fields));
    }

    #[test]
    fn test_array_round_trip() {
        round_trip(Value::from(vec![1.5f64, -2.0]));
        round_trip(Value::Array(vec![Value::from(vec![1i8]), Value::from(vec![2i8, 3])]));
    }

    #[test]
    fn test_rejects_bad_lengths() {
        assert!(matches!(
            decode(&Type::basic(Kind::Int32), &[0, 1]),
            Err(CodecError::InvalidLength { expected: 4, actual: 2, .. })
        ));
        assert!(matches!(
            decode(&Type::basic(Kind::String), &[0, 0, 0, 0, 0, 0, 0, 3, b'a']),
            Err(CodecError::InvalidLength { .. })
        ));
        assert!(matches!(
            decode(&Type::basic(Kind::Bool), &[2]),
            Err(CodecError::InvalidBool(2))
        ));
    }

    #[test]
    fn test_inet_prefix_out_of_range() {
        let inet = Type::basic(Kind::Inet);
        assert_eq!(
            decode(&inet, &[10, 0, 0, 0, 33]),
            Err(CodecError::InvalidPrefix(33))
        );
        let mut v6 = vec![0; 16];
        v6.push(129);
        assert_eq!(decode(&inet, &v6), Err(CodecError::InvalidPrefix(129)));
        assert!(matches!(
            decode(&inet, &[10, 0, 0]),
            Err(CodecError::InvalidLength { expected: 5, actual: 3, .. })
        ));
    }

    #[test]
    fn test_unsupported_kind_is_reported() {
        assert_eq!(
            decode(&Type::basic(Kind::Duration), &[1]),
            Err(CodecError::Unsupported { kind: Kind::Duration })
        );
    }
}
