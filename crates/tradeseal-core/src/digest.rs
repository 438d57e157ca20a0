//! # Content Digests
//!
//! SHA-256 digests identify stored content. A digest renders as
//! `sha256:<64 hex>`; parsing also accepts the bare hex form.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

use crate::canonical::CanonicalBytes;
use crate::error::ValidationError;

const PREFIX: &str = "sha256:";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentDigest([u8; 32]);

impl ContentDigest {
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        let body = s.strip_prefix(PREFIX).unwrap_or(s);
        if body.len() != 64 {
            return Err(ValidationError::Malformed {
                field: "content digest",
                reason: format!("expected 64 hex characters, got {}", body.len()),
            });
        }
        let mut out = [0u8; 32];
        hex::decode_to_slice(body, &mut out).map_err(|e| ValidationError::InvalidHex {
            field: "content digest",
            reason: e.to_string(),
        })?;
        Ok(Self(out))
    }
}

impl std::fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{PREFIX}{}", self.to_hex())
    }
}

impl std::str::FromStr for ContentDigest {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for ContentDigest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ContentDigest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Digest of a canonical document.
pub fn sha256_digest(data: &CanonicalBytes) -> ContentDigest {
    sha256_bytes(data.as_bytes())
}

/// Digest of an opaque blob. Stores address raw bytes this way; documents
/// should go through [`sha256_digest`].
pub fn sha256_bytes(data: &[u8]) -> ContentDigest {
    let hash = Sha256::digest(data);
    let mut out = [0u8; 32];
    out.copy_from_slice(&hash);
    ContentDigest(out)
}
