//! # Instance Address Derivation
//!
//! Escrow instances get EVM-compatible identities:
//!
//! - sequential creation: `keccak256(rlp([factory, nonce]))[12..]`;
//! - deterministic creation: `keccak256(0xff ‖ factory ‖ salt ‖
//!   keccak256(init_code))[12..]`, where `init_code` is the EIP-1167
//!   minimal-proxy creation code pointing at the current implementation.
//!
//! A deterministic address therefore depends only on the factory, the
//! implementation and the salt, and can be predicted before creation.

use tradeseal_core::{keccak256, Address, Bytes32};

const CLONE_PREFIX: [u8; 20] = [
    0x3d, 0x60, 0x2d, 0x80, 0x60, 0x0a, 0x3d, 0x39, 0x81, 0xf3, 0x36, 0x3d, 0x3d, 0x37, 0x3d, 0x3d,
    0x3d, 0x36, 0x3d, 0x73,
];
const CLONE_SUFFIX: [u8; 15] = [
    0x5a, 0xf4, 0x3d, 0x82, 0x80, 0x3e, 0x90, 0x3d, 0x91, 0x60, 0x2b, 0x57, 0xfd, 0x5b, 0xf3,
];

/// EIP-1167 creation code for a minimal proxy delegating to `implementation`.
pub fn clone_init_code(implementation: &Address) -> Vec<u8> {
    let mut code = Vec::with_capacity(CLONE_PREFIX.len() + 20 + CLONE_SUFFIX.len());
    code.extend_from_slice(&CLONE_PREFIX);
    code.extend_from_slice(implementation.as_bytes());
    code.extend_from_slice(&CLONE_SUFFIX);
    code
}

fn rlp_uint(n: u64) -> Vec<u8> {
    match n {
        0 => vec![0x80],
        1..=0x7f => vec![n as u8],
        _ => {
            let bytes = n.to_be_bytes();
            let skip = bytes.iter().take_while(|b| **b == 0).count();
            let mut out = Vec::with_capacity(1 + bytes.len() - skip);
            out.push(0x80 + (bytes.len() - skip) as u8);
            out.extend_from_slice(&bytes[skip..]);
            out
        }
    }
}

/// Address of the contract created by `deployer` at `nonce`.
pub fn create_address(deployer: &Address, nonce: u64) -> Address {
    let nonce = rlp_uint(nonce);
    let mut payload = Vec::with_capacity(21 + nonce.len());
    payload.push(0x94);
    payload.extend_from_slice(deployer.as_bytes());
    payload.extend_from_slice(&nonce);

    let mut encoded = Vec::with_capacity(1 + payload.len());
    encoded.push(0xc0 + payload.len() as u8);
    encoded.extend_from_slice(&payload);
    Address::from_word_tail(keccak256(&encoded).as_bytes())
}

/// Address of the contract created by `deployer` with `salt` and `init_code`.
pub fn create2_address(deployer: &Address, salt: &Bytes32, init_code: &[u8]) -> Address {
    let mut preimage = Vec::with_capacity(1 + 20 + 32 + 32);
    preimage.push(0xff);
    preimage.extend_from_slice(deployer.as_bytes());
    preimage.extend_from_slice(salt.as_bytes());
    preimage.extend_from_slice(keccak256(init_code).as_bytes());
    Address::from_word_tail(keccak256(&preimage).as_bytes())
}

/// Deterministic clone address for `implementation` under `salt`.
pub fn predict_clone_address(factory: &Address, implementation: &Address, salt: &Bytes32) -> Address {
    create2_address(factory, salt, &clone_init_code(implementation))
}
