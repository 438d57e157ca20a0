//! # Account Addresses
//!
//! A 20-byte account identity. Parsing accepts any casing; input that mixes
//! upper and lower case must carry a valid EIP-55 checksum. Rendering is
//! always the EIP-55 checksummed form, so two spellings of the same address
//! compare, hash and encode identically.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ValidationError;
use crate::hash::keccak256;

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address([u8; 20]);

impl Address {
    pub const ZERO: Self = Self([0u8; 20]);

    pub const fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }

    /// An address whose last eight bytes hold `n` big-endian. Handy for
    /// deterministic fixtures.
    pub fn from_low_u64(n: u64) -> Self {
        let mut out = [0u8; 20];
        out[12..].copy_from_slice(&n.to_be_bytes());
        Self(out)
    }

    /// Take the trailing 20 bytes of a 32-byte digest, as the EVM does when
    /// deriving contract addresses.
    pub fn from_word_tail(word: &[u8; 32]) -> Self {
        let mut out = [0u8; 20];
        out.copy_from_slice(&word[12..]);
        Self(out)
    }

    /// Parse `0x`-prefixed (or bare) 40-character hex.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] on bad hex, wrong length, or a mixed-case
    /// string whose casing disagrees with the EIP-55 checksum.
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        let body = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);
        let bytes = hex::decode(body).map_err(|e| ValidationError::InvalidHex {
            field: "address",
            reason: e.to_string(),
        })?;
        let arr: [u8; 20] =
            bytes
                .as_slice()
                .try_into()
                .map_err(|_| ValidationError::InvalidLength {
                    field: "address",
                    expected: 20,
                    actual: bytes.len(),
                })?;
        let addr = Self(arr);

        let has_upper = body.chars().any(|c| c.is_ascii_uppercase());
        let has_lower = body.chars().any(|c| c.is_ascii_lowercase());
        if has_upper && has_lower && addr.to_checksum()[2..] != *body {
            return Err(ValidationError::BadChecksum(s.to_string()));
        }
        Ok(addr)
    }

    /// EIP-55 mixed-case checksum encoding with `0x` prefix.
    pub fn to_checksum(&self) -> String {
        let lower = hex::encode(self.0);
        let digest = keccak256(lower.as_bytes());
        let hash = digest.as_bytes();
        let mut out = String::with_capacity(42);
        out.push_str("0x");
        for (i, c) in lower.chars().enumerate() {
            let nibble = if i % 2 == 0 {
                hash[i / 2] >> 4
            } else {
                hash[i / 2] & 0x0f
            };
            if c.is_ascii_alphabetic() && nibble >= 8 {
                out.push(c.to_ascii_uppercase());
            } else {
                out.push(c);
            }
        }
        out
    }

    /// Lowercase `0x`-prefixed hex.
    pub fn to_lower_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_checksum())
    }
}

impl std::fmt::Debug for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Address({})", self.to_checksum())
    }
}

impl std::str::FromStr for Address {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_checksum())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}
