use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tradeseal_core::{Bytes32, PackedEncoder, ValidationError};

use crate::context::BindingContext;

/// Domain-separation prefix of the binding-tag preimage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProtocolVersion {
    /// Context without a predecessor credential.
    V1,
    /// Context chained to the previous stage's credential.
    V2,
}

impl ProtocolVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::V1 => "zkp-bind-v1",
            Self::V2 => "zkp-bind-v2",
        }
    }

    pub fn for_context(ctx: &BindingContext) -> Self {
        if ctx.previous_vc_cid().is_some() {
            Self::V2
        } else {
            Self::V1
        }
    }
}

impl std::fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A 32-byte binding tag. Rendered as 64 lowercase hex characters without a
/// prefix; parsing accepts either form.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct BindingTag(Bytes32);

impl BindingTag {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(Bytes32::new(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        self.0.as_bytes()
    }

    pub fn as_word(&self) -> &Bytes32 {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        self.0.to_hex()
    }

    pub fn parse_hex(s: &str) -> Result<Self, ValidationError> {
        Bytes32::parse_hex("bindingTag", s).map(Self)
    }
}

impl From<Bytes32> for BindingTag {
    fn from(word: Bytes32) -> Self {
        Self(word)
    }
}

impl std::fmt::Display for BindingTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl std::fmt::Debug for BindingTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "BindingTag({})", self.to_hex())
    }
}

impl std::str::FromStr for BindingTag {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_hex(s)
    }
}

impl Serialize for BindingTag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for BindingTag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Derive the binding tag for a validated context.
///
/// Pure: equal contexts always yield equal tags, and changing any one field
/// changes the tag.
pub fn binding_tag(ctx: &BindingContext) -> BindingTag {
    let mut enc = PackedEncoder::new();
    enc.string(ProtocolVersion::for_context(ctx).as_str())
        .uint256(u128::from(ctx.chain_id()))
        .address(&ctx.escrow_address())
        .uint256(u128::from(ctx.product_id()))
        .uint8(ctx.stage().as_u8())
        .string(ctx.schema_version());
    if let Some(cid) = ctx.previous_vc_cid() {
        enc.string(cid);
    }
    BindingTag(enc.keccak256())
}
