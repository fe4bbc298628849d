//! Newtype identifiers exchanged with Stargate.
//!
//! Every value with an identity on the wire is a distinct newtype wrapping a
//! primitive. This prevents accidentally interchanging a [`MessageId`] with a
//! [`SourceId`] even though both are plain integers under the hood.

use std::num::ParseIntError;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Macro for integer-wrapped newtypes.
// Generates: struct (Copy), new(), getter, Display, From<primitive>.
// ---------------------------------------------------------------------------
macro_rules! numeric_id {
    (
        $(#[$attr:meta])*
        $name:ident($inner:ty), $getter:ident
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name($inner);

        impl $name {
            /// Creates a new identifier from a raw integer.
            pub const fn new(value: $inner) -> Self {
                Self(value)
            }

            /// Returns the underlying integer value.
            pub const fn $getter(self) -> $inner {
                self.0
            }
        }

        impl From<$inner> for $name {
            fn from(value: $inner) -> Self {
                Self(value)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

numeric_id! {
    /// Correlation token chosen by Stargate for one logical request.
    ///
    /// Every response tied to a request echoes the id unchanged. Ids are not
    /// guaranteed unique across requests and the connector never deduplicates.
    MessageId(u32), as_u32
}

numeric_id! {
    /// Identifies the registered source this connector serves.
    ///
    /// Sent with every stream as the `source` metadata entry.
    SourceId(u64), as_u64
}

/// Error returned when parsing a [`SourceId`] from text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseSourceIdError {
    /// The text starts with a sign.
    #[error("source id must not carry a sign")]
    Signed,

    #[error(transparent)]
    Int(#[from] ParseIntError),
}

impl FromStr for SourceId {
    type Err = ParseSourceIdError;

    /// Parses a decimal, non-negative source id (`"42"`). Signs are rejected,
    /// including `+`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.starts_with(['+', '-']) {
            return Err(ParseSourceIdError::Signed);
        }
        Ok(Self(s.parse::<u64>()?))
    }
}

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

/// Secret bearer token used to authenticate with Stargate.
///
/// `Debug` and `Display` never reveal the value, so the token can sit inside
/// configuration structs that end up in log fields.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct SecretToken(String);

impl SecretToken {
    /// Wraps a raw token.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the raw token. Only transports should need this.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Returns `true` if no token was configured.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Debug for SecretToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SecretToken(<redacted>)")
    }
}

impl std::fmt::Display for SecretToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("<redacted>")
    }
}
