//! Wei amounts. Serialized as decimal strings so canonical documents never
//! carry numbers wider than JSON integers can represent.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Wei(u128);

impl Wei {
    pub const ZERO: Self = Self(0);

    pub const fn new(amount: u128) -> Self {
        Self(amount)
    }

    pub fn get(&self) -> u128 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: Wei) -> Option<Wei> {
        self.0.checked_add(other.0).map(Wei)
    }

    pub fn checked_sub(self, other: Wei) -> Option<Wei> {
        self.0.checked_sub(other.0).map(Wei)
    }

    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        s.trim()
            .parse::<u128>()
            .map(Wei)
            .map_err(|e| ValidationError::Malformed {
                field: "amount",
                reason: e.to_string(),
            })
    }
}

impl From<u64> for Wei {
    fn from(n: u64) -> Self {
        Self(u128::from(n))
    }
}

impl std::fmt::Display for Wei {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::iter::Sum for Wei {
    fn sum<I: Iterator<Item = Wei>>(iter: I) -> Self {
        Wei(iter.map(|w| w.0).sum())
    }
}

impl Serialize for Wei {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for Wei {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}
