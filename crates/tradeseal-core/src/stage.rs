//! Lifecycle stages anchored by credentials. The numeric codes are part of
//! the binding-tag preimage (`uint8`) and must never be renumbered.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stage {
    Listing = 0,
    Purchase = 1,
    Delivery = 2,
}

impl Stage {
    pub const ALL: [Stage; 3] = [Stage::Listing, Stage::Purchase, Stage::Delivery];

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Listing => "listing",
            Self::Purchase => "purchase",
            Self::Delivery => "delivery",
        }
    }

    /// The stage that precedes this one, if any.
    pub fn previous(self) -> Option<Stage> {
        match self {
            Self::Listing => None,
            Self::Purchase => Some(Self::Listing),
            Self::Delivery => Some(Self::Purchase),
        }
    }
}

impl TryFrom<u8> for Stage {
    type Error = ValidationError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Listing),
            1 => Ok(Self::Purchase),
            2 => Ok(Self::Delivery),
            other => Err(ValidationError::OutOfRange {
                field: "stage",
                value: other.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Stage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.as_u8())
    }
}

impl<'de> Deserialize<'de> for Stage {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let n = u8::deserialize(deserializer)?;
        Stage::try_from(n).map_err(serde::de::Error::custom)
    }
}
