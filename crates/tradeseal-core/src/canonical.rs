//! # Canonical Bytes
//!
//! `CanonicalBytes` is the only input accepted by [`crate::sha256_digest`].
//! Credentials are serialized through it before they are stored so that the
//! content address of a document does not depend on field order or
//! whitespace.
//!
//! Rules applied before RFC 8785 (JCS) serialization:
//!
//! - floats are rejected; amounts are decimal strings or integers;
//! - object keys are sorted and separators are compact (done by `serde_jcs`);
//! - timestamps arrive pre-normalized through [`crate::Timestamp`].

use serde::Serialize;
use serde_json::Value;

use crate::error::CanonicalizationError;

/// Bytes produced by JCS canonicalization. The inner buffer is private; the
/// only constructor is [`CanonicalBytes::new`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalBytes(Vec<u8>);

impl CanonicalBytes {
    /// Canonicalize any serializable value.
    ///
    /// # Errors
    ///
    /// `FloatRejected` if the value tree contains a non-integer number,
    /// `SerializationFailed` if serde cannot render the value.
    pub fn new(obj: &impl Serialize) -> Result<Self, CanonicalizationError> {
        let value = serde_json::to_value(obj)?;
        reject_floats(&value)?;
        let s = serde_jcs::to_string(&value)?;
        Ok(Self(s.into_bytes()))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[u8]> for CanonicalBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

fn reject_floats(value: &Value) -> Result<(), CanonicalizationError> {
    match value {
        Value::Number(n) if !n.is_i64() && !n.is_u64() => match n.as_f64() {
            Some(f) => Err(CanonicalizationError::FloatRejected(f)),
            None => Ok(()),
        },
        Value::Object(map) => map.values().try_for_each(reject_floats),
        Value::Array(items) => items.iter().try_for_each(reject_floats),
        _ => Ok(()),
    }
}
