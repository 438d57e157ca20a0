//! Keccak price commitments as stored by an escrow instance.
//!
//! The seller commits to `keccak256(uint256 price ‖ bytes32 blinding)` when
//! listing and the buyer opens it at delivery. Sellers that do not want to
//! manage a random blinding factor derive it from the escrow and their own
//! address, which makes it reproducible on any device they sign from.

use tradeseal_core::{decode_hex, Address, Bytes32, PackedEncoder};

/// `keccak256(packed(escrow, seller))`.
pub fn deterministic_blinding(escrow: &Address, seller: &Address) -> Bytes32 {
    let mut enc = PackedEncoder::new();
    enc.address(escrow).address(seller);
    enc.keccak256()
}

/// `keccak256(packed(uint256 value, bytes32 blinding))`.
pub fn price_commitment(value: u128, blinding: &Bytes32) -> Bytes32 {
    let mut enc = PackedEncoder::new();
    enc.uint256(value).bytes32(blinding);
    enc.keccak256()
}

/// Tag that links the purchase and delivery transaction-hash commitments
/// of one buyer to one escrow.
pub fn tx_hash_binding_tag(
    chain_id: u64,
    escrow: &Address,
    product_id: u64,
    buyer: &Address,
) -> Bytes32 {
    let mut enc = PackedEncoder::new();
    enc.string("tx-hash-bind-v1")
        .uint256(u128::from(chain_id))
        .address(escrow)
        .uint256(u128::from(product_id))
        .address(buyer);
    enc.keccak256()
}

/// Compare two hex-encoded commitments ignoring case and `0x` prefixes.
/// Malformed input never matches.
pub fn commitments_match(a: &str, b: &str) -> bool {
    match (decode_hex("commitment", a), decode_hex("commitment", b)) {
        (Ok(x), Ok(y)) => !x.is_empty() && x == y,
        _ => false,
    }
}
