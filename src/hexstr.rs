//! Hex string handling for SA byte fields.
//!
//! Operators supply cipher suites, IVs, ARSNs and bitmasks as hex. Three
//! spellings are accepted: bare (`0102`), C-style (`0x0102`) and SQL-style
//! (`X'0102'`). Byte fields serialize to JSON as lowercase bare hex.

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum HexError {
    #[error("empty hex value")]
    Empty,

    #[error("'{input}' is not a valid hex string: {source}")]
    Invalid {
        input: String,
        #[source]
        source: hex::FromHexError,
    },
}

/// True for inputs that mean "no value": blank or the literal `null`.
pub fn is_null_token(input: &str) -> bool {
    let trimmed = input.trim();
    trimmed.is_empty() || trimmed.eq_ignore_ascii_case("null")
}

/// Strip any accepted prefix/quoting and return the bare digits.
fn strip_notation(input: &str) -> &str {
    let trimmed = input.trim();
    if let Some(inner) = trimmed
        .strip_prefix("X'")
        .or_else(|| trimmed.strip_prefix("x'"))
        .and_then(|rest| rest.strip_suffix('\''))
    {
        return inner;
    }
    trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed)
}

/// Decode an operator-supplied hex string.
pub fn parse_hex(input: &str) -> Result<Vec<u8>, HexError> {
    let digits = strip_notation(input);
    if digits.is_empty() {
        return Err(HexError::Empty);
    }
    hex::decode(digits).map_err(|source| HexError::Invalid {
        input: input.trim().to_string(),
        source,
    })
}

pub fn to_hex(bytes: &[u8]) -> String {
    hex::encode(bytes)
}

// ============================================================================
// serde helpers
// ============================================================================

/// `#[serde(with = "crate::hexstr::bytes")]` for `Vec<u8>` fields.
pub mod bytes {
    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::to_hex(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        if s.trim().is_empty() {
            return Ok(Vec::new());
        }
        super::parse_hex(&s).map_err(D::Error::custom)
    }
}

/// `#[serde(with = "crate::hexstr::opt_bytes")]` for `Option<Vec<u8>>` fields.
pub mod opt_bytes {
    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<Vec<u8>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(bytes) => serializer.serialize_some(&super::to_hex(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Vec<u8>>, D::Error> {
        let s: Option<String> = Option::deserialize(deserializer)?;
        match s {
            Some(s) if !super::is_null_token(&s) => {
                super::parse_hex(&s).map(Some).map_err(D::Error::custom)
            }
            _ => Ok(None),
        }
    }
}

/// `#[serde(with = "crate::hexstr::opt_opt_bytes")]` for patch fields where an
/// absent key leaves the value, `null` clears it and hex sets it. Pair with
/// `#[serde(default)]` on the container.
pub mod opt_opt_bytes {
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<Option<Vec<u8>>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(inner) => super::opt_bytes::serialize(inner, serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Option<Vec<u8>>>, D::Error> {
        super::opt_bytes::deserialize(deserializer).map(Some)
    }
}
