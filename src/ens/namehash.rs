use crate::ens::abi::Address;
use sha3::{Digest, Keccak256};

/// A 32-byte ENS node identifier.
pub type Node = [u8; 32];

pub fn keccak256(bytes: &[u8]) -> [u8; 32] {
    Keccak256::digest(bytes).into()
}

/// EIP-137 namehash. Labels are hashed as given; callers pass names that are
/// already normalized.
pub fn namehash(name: &str) -> Node {
    let mut node = [0u8; 32];
    if name.is_empty() {
        return node;
    }

    for label in name.rsplit('.') {
        let mut preimage = [0u8; 64];
        preimage[..32].copy_from_slice(&node);
        preimage[32..].copy_from_slice(&keccak256(label.as_bytes()));
        node = keccak256(&preimage);
    }

    node
}

/// The reverse-registrar name holding the primary name of `address`.
pub fn reverse_name(address: &Address) -> String {
    format!("{}.addr.reverse", hex::encode(address.as_bytes()))
}
