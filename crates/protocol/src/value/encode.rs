//! Value encoding.
//!
//! | Kind | Bytes |
//! |------|-------|
//! | null (any kind) | nothing |
//! | bool | `0x01` / `0x00` |
//! | integers, floats | big-endian, matching width (floats as IEEE-754 bits) |
//! | string | 8-byte big-endian byte length, then raw bytes |
//! | uuid | raw 16 bytes |
//! | inet | address bytes, then one prefix-length byte |
//! | object | per field: name, `0x00`, u32 descriptor length, u32 value length, descriptor, value |
//! | array | u32 element count, then per element: u32 length, element bytes |

use uuid::Uuid;

use super::{Inet, Value};
use crate::errors::CodecError;
use crate::types::{Kind, Type};

macro_rules! encode_fixed {
    ($($(#[$attr:meta])* $name:ident => $ty:ty),* $(,)?) => {
        $(
            $(#[$attr])*
            pub fn $name(value: $ty, buf: &mut Vec<u8>) {
                buf.extend_from_slice(&value.to_be_bytes());
            }
        )*
    };
}

encode_fixed! {
    /// Appends one byte holding the two's-complement value.
    encode_i8 => i8,
    /// Appends two big-endian bytes (`-1` is `FF FF`).
    encode_i16 => i16,
    /// Appends four big-endian bytes (`-1` is `FF FF FF FF`).
    encode_i32 => i32,
    /// Appends eight big-endian bytes.
    encode_i64 => i64,
    /// Appends one byte.
    encode_u8 => u8,
    /// Appends two big-endian bytes (`258` is `01 02`).
    encode_u16 => u16,
    /// Appends four big-endian bytes.
    encode_u32 => u32,
    /// Appends eight big-endian bytes.
    encode_u64 => u64,
    /// Appends the IEEE-754 bit pattern, big-endian.
    encode_f32 => f32,
    /// Appends the IEEE-754 bit pattern, big-endian.
    encode_f64 => f64,
}

/// Appends `0x01` for true, `0x00` for false.
pub fn encode_bool(value: bool, buf: &mut Vec<u8>) {
    buf.push(u8::from(value));
}

/// Appends an 8-byte big-endian byte length followed by the raw bytes.
pub fn encode_str(value: &str, buf: &mut Vec<u8>) {
    // usize is at most 64 bits on every supported target.
    buf.extend_from_slice(&(value.len() as u64).to_be_bytes());
    buf.extend_from_slice(value.as_bytes());
}

/// Appends the 16 raw bytes of the identifier.
pub fn encode_uuid(value: &Uuid, buf: &mut Vec<u8>) {
    buf.extend_from_slice(value.as_bytes());
}

/// Appends the canonical binary form of the prefix.
pub fn encode_inet(value: &Inet, buf: &mut Vec<u8>) {
    value.append_binary(buf);
}

/// Appends the encoding of `value` to `buf` and returns its declared type.
///
/// On error `buf` may hold a partial encoding and must be discarded.
pub fn encode(value: &Value, buf: &mut Vec<u8>) -> Result<Type, CodecError> {
    let kind = value.kind();
    match value {
        Value::Null(Kind::Array) => return Ok(Type::array(Type::basic(Kind::Any))),
        Value::Null(_) => return Ok(Type::basic(kind)),
        Value::Bool(v) => encode_bool(*v, buf),
        Value::Int8(v) => encode_i8(*v, buf),
        Value::Int16(v) => encode_i16(*v, buf),
        Value::Int32(v) => encode_i32(*v, buf),
        Value::Int64(v) => encode_i64(*v, buf),
        Value::Uint8(v) => encode_u8(*v, buf),
        Value::Uint16(v) => encode_u16(*v, buf),
        Value::Uint32(v) => encode_u32(*v, buf),
        Value::Uint64(v) => encode_u64(*v, buf),
        Value::Float32(v) => encode_f32(*v, buf),
        Value::Float64(v) => encode_f64(*v, buf),
        Value::String(v) => encode_str(v, buf),
        Value::Uuid(v) => encode_uuid(v, buf),
        Value::Inet(v) => encode_inet(v, buf),
        Value::Object(fields) => {
            for (name, field) in fields {
                if name.as_bytes().contains(&0) {
                    return Err(CodecError::InvalidFieldName { name: name.clone() });
                }
                buf.extend_from_slice(name.as_bytes());
                buf.push(0);

                let mut frame = Vec::new();
                let ty = encode(field, &mut frame)?;
                let header = ty.to_bytes()?;

                buf.extend_from_slice(&frame_len("descriptor", header.len())?.to_be_bytes());
                buf.extend_from_slice(&frame_len("field value", frame.len())?.to_be_bytes());
                buf.extend_from_slice(&header);
                buf.extend_from_slice(&frame);
            }
        }
        Value::Array(items) => return encode_array(items, buf),
        Value::Timestamp(_) => return Err(CodecError::Unsupported { kind }),
    }
    Ok(Type::basic(kind))
}

fn encode_array(items: &[Value], buf: &mut Vec<u8>) -> Result<Type, CodecError> {
    buf.extend_from_slice(&frame_len("array elements", items.len())?.to_be_bytes());

    let mut element: Option<Type> = None;
    for item in items {
        let mut frame = Vec::new();
        let ty = encode(item, &mut frame)?;
        // Nulls carry no element type of their own.
        if !matches!(item, Value::Null(_)) {
            element = match element {
                None => Some(ty),
                Some(expected) => match unify(&expected, &ty) {
                    Some(merged) => Some(merged),
                    None => {
                        return Err(CodecError::MixedArray {
                            expected,
                            found: ty,
                        })
                    }
                },
            };
        }
        buf.extend_from_slice(&frame_len("array element", frame.len())?.to_be_bytes());
        buf.extend_from_slice(&frame);
    }

    Ok(Type::array(element.unwrap_or(Type::basic(Kind::Any))))
}

/// Merges two element types of one array. An empty nested array reports
/// `array<any>`, which is compatible with every other array type.
fn unify(expected: &Type, found: &Type) -> Option<Type> {
    if expected == found {
        return Some(expected.clone());
    }
    if expected.kind != Kind::Array || found.kind != Kind::Array {
        return None;
    }
    let any = Type::basic(Kind::Any);
    let left = expected.underlying.as_deref().unwrap_or(&any);
    let right = found.underlying.as_deref().unwrap_or(&any);
    let merged = match (left.kind, right.kind) {
        (Kind::Any, _) => right.clone(),
        (_, Kind::Any) => left.clone(),
        _ => unify(left, right)?,
    };
    Some(Type::array(merged))
}

fn frame_len(what: &'static str, len: usize) -> Result<u32, CodecError> {
    u32::try_from(len).map_err(|_| CodecError::TooLarge { what, len })
}

/// Encodes every column of a row, one byte sequence per value.
pub fn encode_row(values: &[Value]) -> Result<Vec<Vec<u8>>, CodecError> {
    values
        .iter()
        .map(|value| {
            let mut buf = Vec::new();
            encode(value, &mut buf)?;
            Ok(buf)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn bytes_of(value: impl Into<Value>) -> Vec<u8> {
        let mut buf = Vec::new();
        encode(&value.into(), &mut buf).unwrap();
        buf
    }

    #[test]
    fn test_integer_encodings() {
        assert_eq!(bytes_of(-1i32), vec![0xFF, 0xFF, 0xFF, 0xFF]);
        assert_eq!(bytes_of(258u16), vec![0x01, 0x02]);
        assert_eq!(bytes_of(-2i8), vec![0xFE]);
        assert_eq!(bytes_of(1i64), vec![0, 0, 0, 0, 0, 0, 0, 1]);
        assert_eq!(bytes_of(u64::MAX), vec![0xFF; 8]);
    }

    #[test]
    fn test_float_encodings_use_ieee_bits() {
        assert_eq!(bytes_of(1.0f32), vec![0x3F, 0x80, 0x00, 0x00]);
        assert_eq!(
            bytes_of(-2.5f64),
            vec![0xC0, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00]
        );
    }

    #[test]
    fn test_bool_encoding() {
        assert_eq!(bytes_of(true), vec![1]);
        assert_eq!(bytes_of(false), vec![0]);
    }

    #[test]
    fn test_string_encoding() {
        assert_eq!(bytes_of(""), vec![0; 8]);
        assert_eq!(bytes_of("ab"), vec![0, 0, 0, 0, 0, 0, 0, 2, b'a', b'b']);
        // Length counts bytes, not characters.
        assert_eq!(bytes_of("é")[..8], [0, 0, 0, 0, 0, 0, 0, 2]);
    }

    #[test]
    fn test_uuid_is_raw_bytes() {
        let id = Uuid::from_bytes([7; 16]);
        assert_eq!(bytes_of(id), vec![7; 16]);
    }

    #[test]
    fn test_null_appends_nothing_and_keeps_kind() {
        for kind in [Kind::Bool, Kind::Int64, Kind::String, Kind::Uuid, Kind::Object] {
            let mut buf = vec![9];
            let ty = encode(&Value::Null(kind), &mut buf).unwrap();
            assert_eq!(buf, vec![9]);
            assert_eq!(ty, Type::basic(kind));
        }
    }

    #[test]
    fn test_encode_appends_to_existing_buffer() {
        let mut buf = vec![0xAA];
        let ty = encode(&Value::Uint8(1), &mut buf).unwrap();
        assert_eq!(buf, vec![0xAA, 0x01]);
        assert_eq!(ty, Type::basic(Kind::Uint8));
    }

    #[test]
    fn test_object_field_framing() {
        let mut fields = BTreeMap::new();
        fields.insert("a".to_string(), Value::Int16(5));

        let mut buf = Vec::new();
        let ty = encode(&Value::Object(fields), &mut buf).unwrap();
        assert_eq!(ty, Type::basic(Kind::Object));
        assert_eq!(
            buf,
            vec![
                b'a', 0x00, // name + terminator
                0, 0, 0, 1, // descriptor length
                0, 0, 0, 2, // value length
                Kind::Int16.code(),
                0, 5,
            ]
        );
    }

    #[test]
    fn test_array_encoding() {
        let mut buf = Vec::new();
        let ty = encode(&Value::from(vec![1u8, 2]), &mut buf).unwrap();
        assert_eq!(ty, Type::array(Type::basic(Kind::Uint8)));
        assert_eq!(buf, vec![0, 0, 0, 2, 0, 0, 0, 1, 1, 0, 0, 0, 1, 2]);

        let mut buf = Vec::new();
        let ty = encode(&Value::Array(Vec::new()), &mut buf).unwrap();
        assert_eq!(ty, Type::array(Type::basic(Kind::Any)));
        assert_eq!(buf, vec![0, 0, 0, 0]);
    }

    #[test]
    fn test_mixed_array_is_rejected() {
        let value = Value::Array(vec![Value::Int32(1), Value::from("two")]);
        let err = encode(&value, &mut Vec::new()).unwrap_err();
        assert!(matches!(err, CodecError::MixedArray { .. }));
    }

    #[test]
    fn test_empty_nested_array_matches_typed_sibling() {
        let value = Value::Array(vec![Value::Array(Vec::new()), Value::from(vec![1i8])]);
        let mut buf = Vec::new();
        let ty = encode(&value, &mut buf).unwrap();
        assert_eq!(ty, Type::array(Type::array(Type::basic(Kind::Int8))));
        assert_eq!(
            crate::value::decode(&ty, &buf).unwrap(),
            Value::Array(vec![Value::Array(Vec::new()), Value::Array(vec![Value::Int8(1)])])
        );
    }

    #[test]
    fn test_null_elements_do_not_set_element_type() {
        let value = Value::Array(vec![Value::from(vec![1i8]), Value::Null(Kind::Array)]);
        let ty = encode(&value, &mut Vec::new()).unwrap();
        assert_eq!(ty, Type::array(Type::array(Type::basic(Kind::Int8))));

        let value = Value::Array(vec![Value::Null(Kind::Int32), Value::Int32(4)]);
        let ty = encode(&value, &mut Vec::new()).unwrap();
        assert_eq!(ty, Type::array(Type::basic(Kind::Int32)));
    }

    #[test]
    fn test_null_array_reports_array_of_any() {
        let ty = encode(&Value::Null(Kind::Array), &mut Vec::new()).unwrap();
        assert_eq!(ty, Type::array(Type::basic(Kind::Any)));
    }

    #[test]
    fn test_field_name_with_nul_is_rejected() {
        let mut fields = BTreeMap::new();
        fields.insert("a\0b".to_string(), Value::Int8(1));
        let err = encode(&Value::Object(fields), &mut Vec::new()).unwrap_err();
        assert_eq!(
            err,
            CodecError::InvalidFieldName {
                name: "a\0b".to_string()
            }
        );
    }

    #[test]
    fn test_timestamp_is_unsupported() {
        let value = Value::Timestamp(chrono::Utc::now());
        let err = encode(&value, &mut Vec::new()).unwrap_err();
        assert_eq!(err, CodecError::Unsupported { kind: Kind::Timestamp });
        assert_eq!(err.to_string(), "unsupported value type: timestamp");
    }

    #[test]
    fn test_unsupported_field_fails_whole_object() {
        let mut fields = BTreeMap::new();
        fields.insert("at".to_string(), Value::Timestamp(chrono::Utc::now()));
        assert!(encode(&Value::Object(fields), &mut Vec::new()).is_err());
    }

    #[test]
    fn test_encode_row_one_buffer_per_column() {
        let row = encode_row(&[Value::from("x"), Value::Null(Kind::Int32), Value::from(true)])
            .unwrap();
        assert_eq!(row.len(), 3);
        assert_eq!(row[1], Vec::<u8>::new());
        assert_eq!(row[2], vec![1]);
    }
}
