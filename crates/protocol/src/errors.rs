//! Value codec errors.
//!
//! [`CodecError`] covers both directions of the row-value encoding. On the
//! encode side it is a protocol failure: a row that cannot be represented
//! must never reach the wire, so callers propagate it instead of turning it
//! into in-band error data.

use thiserror::Error;

use crate::types::{Kind, Type};

/// Errors produced while encoding or decoding row values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// The codec has no encoding for values of this kind.
    #[error("unsupported value type: {kind}")]
    Unsupported {
        /// Kind of the offending value.
        kind: Kind,
    },

    /// An array contained elements of more than one type.
    #[error("array elements must share one type: expected {expected}, found {found}")]
    MixedArray {
        /// Type of the first element.
        expected: Type,
        /// Type of the first element that differed.
        found: Type,
    },

    /// An object field name contains `0x00`, which terminates names on the
    /// wire.
    #[error("invalid object field name {name:?}: contains a nul byte")]
    InvalidFieldName {
        /// The offending name.
        name: String,
    },

    /// A length does not fit the fixed-width field that frames it.
    #[error("{what} too large to encode: {len}")]
    TooLarge {
        /// What was being framed (e.g. `"array elements"`).
        what: &'static str,
        /// The offending length.
        len: usize,
    },

    /// A fixed-width value had the wrong number of bytes.
    #[error("invalid {kind} encoding: expected {expected} bytes, got {actual}")]
    InvalidLength {
        /// Kind being decoded.
        kind: Kind,
        /// Required byte length.
        expected: usize,
        /// Byte length found.
        actual: usize,
    },

    /// The input ended in the middle of a value.
    #[error("truncated {kind} encoding")]
    Truncated {
        /// Kind being decoded.
        kind: Kind,
    },

    /// Bytes were left over after a complete value.
    #[error("{count} trailing bytes after {kind} encoding")]
    TrailingBytes {
        /// Kind that was decoded.
        kind: Kind,
        /// Number of unconsumed bytes.
        count: usize,
    },

    /// A boolean byte other than `0x00` or `0x01`.
    #[error("invalid boolean byte: {0:#04x}")]
    InvalidBool(u8),

    /// A string or field name was not valid UTF-8.
    #[error("invalid utf-8 in {kind} encoding: {source}")]
    InvalidUtf8 {
        /// Kind being decoded.
        kind: Kind,
        /// Underlying conversion error.
        #[source]
        source: std::str::Utf8Error,
    },

    /// A network prefix with a length outside the address family's range.
    #[error("invalid inet prefix length: {0}")]
    InvalidPrefix(u8),

    /// A descriptor byte that names no known kind.
    #[error("unknown type kind code: {0}")]
    UnknownKind(u8),
}
