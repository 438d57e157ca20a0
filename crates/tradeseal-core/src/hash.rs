//! # Keccak-256 and Packed Encoding
//!
//! On-chain commitments and binding tags are keccak-256 digests over
//! Solidity `abi.encodePacked` byte strings. [`PackedEncoder`] reproduces
//! that encoding exactly:
//!
//! | Solidity type | Encoding                                  |
//! |---------------|-------------------------------------------|
//! | `string`      | raw UTF-8 bytes, no length prefix         |
//! | `uint256`     | 32-byte big-endian                        |
//! | `uint8`       | 1 byte                                    |
//! | `address`     | 20 raw bytes                              |
//! | `bytes32`     | 32 raw bytes                              |
//!
//! Packed encoding has no field separators, so two adjacent `string`
//! fields can collide (`"ab" ‖ "c"` == `"a" ‖ "bc"`). A layout that puts
//! two variable strings side by side must restrict their alphabets so the
//! boundary is unique; the binding tag does this for its schema version
//! and previous CID.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha3::{Digest, Keccak256};

use crate::address::Address;
use crate::error::ValidationError;

/// A 32-byte word: commitments, blinding factors, binding tags, salts.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Bytes32([u8; 32]);

impl Bytes32 {
    pub const ZERO: Self = Self([0u8; 32]);

    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    /// Build from a slice that must be exactly 32 bytes long.
    pub fn from_slice(field: &'static str, bytes: &[u8]) -> Result<Self, ValidationError> {
        let arr: [u8; 32] = bytes.try_into().map_err(|_| ValidationError::InvalidLength {
            field,
            expected: 32,
            actual: bytes.len(),
        })?;
        Ok(Self(arr))
    }

    /// Parse 64 hex characters, with or without a `0x` prefix.
    pub fn parse_hex(field: &'static str, s: &str) -> Result<Self, ValidationError> {
        let bytes = decode_hex(field, s)?;
        Self::from_slice(field, &bytes)
    }

    /// A word whose last eight bytes hold `n` big-endian.
    pub fn from_low_u64(n: u64) -> Self {
        let mut out = [0u8; 32];
        out[24..].copy_from_slice(&n.to_be_bytes());
        Self(out)
    }

    /// Lowercase hex without prefix.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Lowercase hex with a `0x` prefix.
    pub fn to_prefixed_hex(&self) -> String {
        format!("0x{}", self.to_hex())
    }
}

impl From<[u8; 32]> for Bytes32 {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for Bytes32 {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Display for Bytes32 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_prefixed_hex())
    }
}

impl std::fmt::Debug for Bytes32 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Bytes32({})", self.to_prefixed_hex())
    }
}

impl std::str::FromStr for Bytes32 {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_hex("bytes32", s)
    }
}

impl Serialize for Bytes32 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_prefixed_hex())
    }
}

impl<'de> Deserialize<'de> for Bytes32 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse_hex("bytes32", &s).map_err(serde::de::Error::custom)
    }
}

/// Decode hex with an optional `0x`/`0X` prefix.
pub fn decode_hex(field: &'static str, s: &str) -> Result<Vec<u8>, ValidationError> {
    let trimmed = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    hex::decode(trimmed).map_err(|e| ValidationError::InvalidHex {
        field,
        reason: e.to_string(),
    })
}

/// Keccak-256 (the pre-standard SHA-3 variant used by the EVM).
pub fn keccak256(data: impl AsRef<[u8]>) -> Bytes32 {
    let digest = Keccak256::digest(data.as_ref());
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    Bytes32(out)
}

/// Builder for Solidity `abi.encodePacked` byte strings.
#[derive(Debug, Default, Clone)]
pub struct PackedEncoder {
    buf: Vec<u8>,
}

impl PackedEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn string(&mut self, s: &str) -> &mut Self {
        self.buf.extend_from_slice(s.as_bytes());
        self
    }

    pub fn uint256(&mut self, n: u128) -> &mut Self {
        self.buf.extend_from_slice(&[0u8; 16]);
        self.buf.extend_from_slice(&n.to_be_bytes());
        self
    }

    pub fn uint8(&mut self, n: u8) -> &mut Self {
        self.buf.push(n);
        self
    }

    pub fn address(&mut self, addr: &Address) -> &mut Self {
        self.buf.extend_from_slice(addr.as_bytes());
        self
    }

    pub fn bytes32(&mut self, word: &Bytes32) -> &mut Self {
        self.buf.extend_from_slice(word.as_bytes());
        self
    }

    /// Raw bytes appended as-is (Solidity `bytes` in packed mode).
    pub fn raw(&mut self, bytes: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(bytes);
        self
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn keccak256(&self) -> Bytes32 {
        keccak256(&self.buf)
    }
}
