//! # Binding Context
//!
//! [`BindingContext`] is the validated, typed form of the six fields a
//! binding tag commits to. It can only be built through
//! [`BindingContext::new`] or [`BindingContextInput::validate`], so a
//! context in hand is always complete and in range.
//!
//! [`BindingContextInput`] is the wire form: every field optional, so that a
//! missing field is reported by name instead of as a generic
//! deserialization failure.

use serde::{Deserialize, Serialize};
use tradeseal_core::{Address, Stage, ValidationError};

use crate::error::BindingError;

/// Schema version assumed when the caller does not supply one.
pub const DEFAULT_SCHEMA_VERSION: &str = "1.0";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BindingContext {
    chain_id: u64,
    escrow_address: Address,
    product_id: u64,
    stage: Stage,
    schema_version: String,
    #[serde(rename = "previousVCCid", skip_serializing_if = "Option::is_none")]
    previous_vc_cid: Option<String>,
}

impl BindingContext {
    /// Build a context with the default schema version and no predecessor.
    ///
    /// # Errors
    ///
    /// Rejects a zero chain id.
    pub fn new(
        chain_id: u64,
        escrow_address: Address,
        product_id: u64,
        stage: Stage,
    ) -> Result<Self, BindingError> {
        if chain_id == 0 {
            return Err(ValidationError::OutOfRange {
                field: "chainId",
                value: "0".to_string(),
            }
            .into());
        }
        Ok(Self {
            chain_id,
            escrow_address,
            product_id,
            stage,
            schema_version: DEFAULT_SCHEMA_VERSION.to_string(),
            previous_vc_cid: None,
        })
    }

    /// Override the schema version. It must be non-empty and made of ASCII
    /// digits and dots only (`"1.0"`, `"2"`).
    pub fn with_schema_version(mut self, version: impl Into<String>) -> Result<Self, BindingError> {
        let version = version.into();
        check_schema_version(&version)?;
        self.schema_version = version;
        Ok(self)
    }

    /// Link to the credential of the preceding stage. An empty CID is
    /// treated as no link.
    ///
    /// # Errors
    ///
    /// Rejects a CID that starts with a digit or a dot; see
    /// [`check_previous_vc_cid`].
    pub fn with_previous_vc_cid(mut self, cid: impl Into<String>) -> Result<Self, BindingError> {
        let cid = cid.into();
        if cid.is_empty() {
            self.previous_vc_cid = None;
        } else {
            check_previous_vc_cid(&cid)?;
            self.previous_vc_cid = Some(cid);
        }
        Ok(self)
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn escrow_address(&self) -> Address {
        self.escrow_address
    }

    pub fn product_id(&self) -> u64 {
        self.product_id
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn schema_version(&self) -> &str {
        &self.schema_version
    }

    pub fn previous_vc_cid(&self) -> Option<&str> {
        self.previous_vc_cid.as_deref()
    }
}

/// Schema version and previous CID are adjacent in the packed tag
/// preimage. A `[0-9.]+` version followed by a CID that starts outside
/// that set has exactly one split point.
fn is_version_char(c: char) -> bool {
    c.is_ascii_digit() || c == '.'
}

fn check_schema_version(version: &str) -> Result<(), ValidationError> {
    if version.is_empty() {
        return Err(ValidationError::Empty("schemaVersion"));
    }
    if let Some(bad) = version.chars().find(|c| !is_version_char(*c)) {
        return Err(ValidationError::Malformed {
            field: "schemaVersion",
            reason: format!("unexpected character {bad:?}, only digits and dots are allowed"),
        });
    }
    Ok(())
}

/// Check that a non-empty CID can follow a schema version in a tag
/// preimage: its first character must not be a digit or a dot.
///
/// # Errors
///
/// `Malformed` naming `previousVCCid`.
pub fn check_previous_vc_cid(cid: &str) -> Result<(), ValidationError> {
    match cid.chars().next() {
        Some(first) if is_version_char(first) => Err(ValidationError::Malformed {
            field: "previousVCCid",
            reason: format!("must not start with {first:?}"),
        }),
        _ => Ok(()),
    }
}

/// Untrusted binding context as received over the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BindingContextInput {
    #[serde(default)]
    pub chain_id: Option<u64>,
    #[serde(default)]
    pub escrow_address: Option<String>,
    #[serde(default)]
    pub product_id: Option<u64>,
    #[serde(default)]
    pub stage: Option<u8>,
    #[serde(default)]
    pub schema_version: Option<String>,
    #[serde(default, rename = "previousVCCid")]
    pub previous_vc_cid: Option<String>,
}

impl BindingContextInput {
    /// Check presence and range of every field and produce a typed context.
    ///
    /// # Errors
    ///
    /// `MissingField` naming the first absent mandatory field, or the
    /// validation error of the first malformed one.
    pub fn validate(&self) -> Result<BindingContext, BindingError> {
        let chain_id = self
            .chain_id
            .ok_or(ValidationError::MissingField("chainId"))?;
        let escrow = self
            .escrow_address
            .as_deref()
            .ok_or(ValidationError::MissingField("escrowAddress"))?;
        let product_id = self
            .product_id
            .ok_or(ValidationError::MissingField("productId"))?;
        let stage = self.stage.ok_or(ValidationError::MissingField("stage"))?;

        let escrow = Address::parse(escrow)?;
        let stage = Stage::try_from(stage)?;

        let mut ctx = BindingContext::new(chain_id, escrow, product_id, stage)?;
        if let Some(version) = &self.schema_version {
            ctx = ctx.with_schema_version(version.clone())?;
        }
        if let Some(cid) = &self.previous_vc_cid {
            ctx = ctx.with_previous_vc_cid(cid.clone())?;
        }
        Ok(ctx)
    }
}

impl From<&BindingContext> for BindingContextInput {
    fn from(ctx: &BindingContext) -> Self {
        Self {
            chain_id: Some(ctx.chain_id),
            escrow_address: Some(ctx.escrow_address.to_checksum()),
            product_id: Some(ctx.product_id),
            stage: Some(ctx.stage.as_u8()),
            schema_version: Some(ctx.schema_version.clone()),
            previous_vc_cid: ctx.previous_vc_cid.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_input() -> BindingContextInput {
        BindingContextInput {
            chain_id: Some(11155111),
            escrow_address: Some("0x1234567890123456789012345678901234567890".into()),
            product_id: Some(1),
            stage: Some(0),
            schema_version: None,
            previous_vc_cid: None,
        }
    }

    #[test]
    fn schema_version_defaults() {
        let ctx = full_input().validate().unwrap();
        assert_eq!(ctx.schema_version(), "1.0");
        assert_eq!(ctx.previous_vc_cid(), None);
    }

    #[test]
    fn each_missing_field_is_named() {
        let cases: [(&str, fn(&mut BindingContextInput)); 4] = [
            ("chainId", |i| i.chain_id = None),
            ("escrowAddress", |i| i.escrow_address = None),
            ("productId", |i| i.product_id = None),
            ("stage", |i| i.stage = None),
        ];
        for (field, clear) in cases {
            let mut input = full_input();
            clear(&mut input);
            let err = input.validate().unwrap_err();
            assert_eq!(
                err,
                BindingError::Invalid(ValidationError::MissingField(field)),
                "field {field}"
            );
        }
    }

    #[test]
    fn stage_out_of_range_rejected() {
        let mut input = full_input();
        input.stage = Some(3);
        assert!(matches!(
            input.validate().unwrap_err(),
            BindingError::Invalid(ValidationError::OutOfRange { field: "stage", .. })
        ));
    }

    #[test]
    fn zero_chain_id_rejected() {
        let mut input = full_input();
        input.chain_id = Some(0);
        assert!(input.validate().is_err());
    }

    #[test]
    fn empty_schema_version_rejected_empty_cid_ignored() {
        let mut input = full_input();
        input.schema_version = Some(String::new());
        assert_eq!(
            input.validate().unwrap_err(),
            BindingError::Invalid(ValidationError::Empty("schemaVersion"))
        );

        let mut input = full_input();
        input.previous_vc_cid = Some(String::new());
        assert_eq!(input.validate().unwrap().previous_vc_cid(), None);
    }

    #[test]
    fn schema_version_limited_to_digits_and_dots() {
        for good in ["1.0", "2", "10.4.1"] {
            let mut input = full_input();
            input.schema_version = Some(good.into());
            assert_eq!(input.validate().unwrap().schema_version(), good);
        }
        for bad in ["1.0Q", "v1", "1.0 ", "1-0"] {
            let mut input = full_input();
            input.schema_version = Some(bad.into());
            assert!(
                matches!(
                    input.validate().unwrap_err(),
                    BindingError::Invalid(ValidationError::Malformed { field: "schemaVersion", .. })
                ),
                "{bad}"
            );
        }
    }

    #[test]
    fn previous_cid_must_not_start_like_a_version() {
        for bad in ["0abc", "9Qm", ".Qm"] {
            let mut input = full_input();
            input.previous_vc_cid = Some(bad.into());
            assert!(
                matches!(
                    input.validate().unwrap_err(),
                    BindingError::Invalid(ValidationError::Malformed { field: "previousVCCid", .. })
                ),
                "{bad}"
            );
        }
        let ctx = full_input().validate().unwrap();
        assert!(ctx.clone().with_previous_vc_cid("sha256:00").is_ok());
        assert!(ctx.with_previous_vc_cid("bafy1").is_ok());
    }

    #[test]
    fn wire_field_names() {
        let json = serde_json::json!({
            "chainId": 1,
            "escrowAddress": "0x00000000000000000000000000000000000000aa",
            "productId": 9,
            "stage": 2,
            "previousVCCid": "QmPrev"
        });
        let input: BindingContextInput = serde_json::from_value(json).unwrap();
        let ctx = input.validate().unwrap();
        assert_eq!(ctx.stage(), Stage::Delivery);
        assert_eq!(ctx.previous_vc_cid(), Some("QmPrev"));
    }
}
