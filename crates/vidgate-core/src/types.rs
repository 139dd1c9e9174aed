//! Strong identifier types.
//!
//! Every entity is keyed by a 12-byte identifier rendered as 24 lowercase
//! hex characters. Each entity gets its own newtype so a `TopicId` can never
//! be passed where a `DomainId` is expected.

use std::fmt;
use std::str::FromStr;

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;

/// Length of an identifier in bytes.
pub const ID_LEN: usize = 12;

/// Failure to parse an identifier from its hex form.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum IdParseError {
    #[error("expected {expected} hex characters, got {got}")]
    Length { expected: usize, got: usize },

    #[error("invalid hex: {0}")]
    Hex(#[from] hex::FromHexError),
}

fn decode_id(s: &str) -> Result<[u8; ID_LEN], IdParseError> {
    if s.len() != ID_LEN * 2 {
        return Err(IdParseError::Length {
            expected: ID_LEN * 2,
            got: s.len(),
        });
    }
    let mut bytes = [0u8; ID_LEN];
    hex::decode_to_slice(s, &mut bytes)?;
    Ok(bytes)
}

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub [u8; ID_LEN]);

        impl $name {
            /// Generate a fresh random identifier.
            pub fn generate() -> Self {
                Self(rand::random())
            }

            /// Create from raw bytes.
            pub const fn from_bytes(bytes: [u8; ID_LEN]) -> Self {
                Self(bytes)
            }

            /// Get the raw bytes.
            pub const fn as_bytes(&self) -> &[u8; ID_LEN] {
                &self.0
            }

            /// Convert to hex string.
            pub fn to_hex(&self) -> String {
                hex::encode(self.0)
            }

            /// Parse from hex string.
            pub fn from_hex(s: &str) -> Result<Self, IdParseError> {
                decode_id(s).map(Self)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.to_hex())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.to_hex())
            }
        }

        impl FromStr for $name {
            type Err = IdParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::from_hex(s)
            }
        }

        impl TryFrom<&[u8]> for $name {
            type Error = std::array::TryFromSliceError;

            fn try_from(slice: &[u8]) -> Result<Self, Self::Error> {
                let arr: [u8; ID_LEN] = slice.try_into()?;
                Ok(Self(arr))
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_hex())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                struct IdVisitor;

                impl<'de> Visitor<'de> for IdVisitor {
                    type Value = $name;

                    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                        f.write_str("a 24 character hex identifier")
                    }

                    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                        $name::from_hex(v).map_err(E::custom)
                    }
                }

                deserializer.deserialize_str(IdVisitor)
            }
        }
    };
}

define_id!(
    /// Identifier of a user account.
    UserId
);
define_id!(
    /// Identifier of a catalog domain.
    DomainId
);
define_id!(
    /// Identifier of a topic within a domain.
    TopicId
);
define_id!(
    /// Identifier of a video.
    VideoId
);
define_id!(
    /// Identifier of an access rule.
    RuleId
);
define_id!(
    /// Identifier of an audit record.
    AuditId
);
