//! The slice of the Solidity ABI needed for ENS lookups: single-`bytes32`
//! call encoding and decoding of `address` and `string` return values.

use crate::ens::namehash::Node;
use anyhow::{bail, ensure, Result};
use std::fmt;
use std::str::FromStr;

const WORD: usize = 32;

/// `resolver(bytes32)` on the ENS registry.
pub const RESOLVER_SELECTOR: [u8; 4] = [0x01, 0x78, 0xb8, 0xbf];
/// `name(bytes32)` on a reverse resolver.
pub const NAME_SELECTOR: [u8; 4] = [0x69, 0x1f, 0x34, 0x31];
/// `addr(bytes32)` on a public resolver.
pub const ADDR_SELECTOR: [u8; 4] = [0x3b, 0x3b, 0x57, 0xde];
/// `resolve(bytes,bytes)`, also the ENSIP-10 interface id.
pub const RESOLVE_SELECTOR: [u8; 4] = [0x90, 0x61, 0xb9, 0x23];
/// `supportsInterface(bytes4)` from EIP-165.
pub const SUPPORTS_INTERFACE_SELECTOR: [u8; 4] = [0x01, 0xff, 0xc9, 0xa7];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Address([u8; 20]);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressParseError {
    input: String,
}

impl fmt::Display for AddressParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} is not a 20-byte hex address", self.input)
    }
}

impl std::error::Error for AddressParseError {}

impl Address {
    pub const ZERO: Address = Address([0u8; 20]);

    pub const fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }
}

impl FromStr for Address {
    type Err = AddressParseError;

    /// Accepts `0x`-prefixed hex in any letter case; checksums are not enforced.
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let error = || AddressParseError {
            input: input.to_owned(),
        };
        let digits = input
            .trim()
            .strip_prefix("0x")
            .or_else(|| input.trim().strip_prefix("0X"))
            .ok_or_else(error)?;
        if digits.len() != 40 {
            return Err(error());
        }
        let mut bytes = [0u8; 20];
        hex::decode_to_slice(digits, &mut bytes).map_err(|_| error())?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

/// Calldata for a function taking a single `bytes32` argument.
pub fn encode_node_call(selector: [u8; 4], node: &Node) -> Vec<u8> {
    let mut data = Vec::with_capacity(4 + WORD);
    data.extend_from_slice(&selector);
    data.extend_from_slice(node);
    data
}

/// Calldata for `supportsInterface(interface_id)`.
pub fn encode_supports_interface(interface_id: [u8; 4]) -> Vec<u8> {
    let mut data = Vec::with_capacity(4 + WORD);
    data.extend_from_slice(&SUPPORTS_INTERFACE_SELECTOR);
    data.extend_from_slice(&interface_id);
    data.resize(4 + WORD, 0);
    data
}

/// Calldata for a function taking `(bytes, bytes)`, such as
/// `resolve(bytes,bytes)` or an offchain lookup callback.
pub fn encode_bytes_pair_call(selector: [u8; 4], first: &[u8], second: &[u8]) -> Vec<u8> {
    let first = encode_dynamic(first);
    let second = encode_dynamic(second);
    let mut data = Vec::with_capacity(4 + 2 * WORD + first.len() + second.len());
    data.extend_from_slice(&selector);
    data.extend(word((2 * WORD) as u64));
    data.extend(word((2 * WORD + first.len()) as u64));
    data.extend(first);
    data.extend(second);
    data
}

/// Length-prefixed, zero-padded tail encoding of a dynamic `bytes`/`string`.
pub fn encode_dynamic(value: &[u8]) -> Vec<u8> {
    let mut out = word(value.len() as u64);
    out.extend_from_slice(value);
    out.resize(WORD + value.len().div_ceil(WORD) * WORD, 0);
    out
}

pub(crate) fn word(value: u64) -> Vec<u8> {
    let mut out = vec![0u8; WORD - 8];
    out.extend_from_slice(&value.to_be_bytes());
    out
}

/// DNS wire format of `name` as required by `resolve(bytes,bytes)`.
pub fn dns_encode(name: &str) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(name.len() + 2);
    if !name.is_empty() {
        for label in name.split('.') {
            ensure!(!label.is_empty(), "{name:?} has an empty label");
            let length = u8::try_from(label.len())
                .map_err(|_| anyhow::anyhow!("label {label:?} is longer than 255 bytes"))?;
            out.push(length);
            out.extend_from_slice(label.as_bytes());
        }
    }
    out.push(0);
    Ok(out)
}

pub fn decode_address(output: &[u8]) -> Result<Address> {
    ensure!(
        output.len() >= WORD,
        "address return value too short ({} bytes)",
        output.len()
    );
    let mut bytes = [0u8; 20];
    bytes.copy_from_slice(&output[12..WORD]);
    Ok(Address(bytes))
}

pub fn decode_bool(output: &[u8]) -> Result<bool> {
    Ok(read_word_as_usize(output, 0)? != 0)
}

/// Decodes a return value consisting of a single `bytes`.
pub fn decode_bytes(output: &[u8]) -> Result<Vec<u8>> {
    read_dynamic(output, 0)
}

pub fn decode_string(output: &[u8]) -> Result<String> {
    match String::from_utf8(decode_bytes(output)?) {
        Ok(value) => Ok(value),
        Err(_) => bail!("string return value is not valid UTF-8"),
    }
}

/// Reads the dynamic value whose offset (relative to `output`) sits in the
/// head word at `head`.
pub fn read_dynamic(output: &[u8], head: usize) -> Result<Vec<u8>> {
    let offset = read_word_as_usize(output, head)?;
    let length = read_word_as_usize(output, offset)?;
    let start = offset
        .checked_add(WORD)
        .ok_or_else(|| anyhow::anyhow!("dynamic offset overflows"))?;
    let end = start
        .checked_add(length)
        .ok_or_else(|| anyhow::anyhow!("dynamic length overflows"))?;
    ensure!(
        end <= output.len(),
        "value of {length} bytes runs past the {} byte buffer",
        output.len()
    );
    Ok(output[start..end].to_vec())
}

pub fn read_word_as_usize(output: &[u8], at: usize) -> Result<usize> {
    let end = at
        .checked_add(WORD)
        .ok_or_else(|| anyhow::anyhow!("word offset overflows"))?;
    ensure!(
        end <= output.len(),
        "return value too short: need {end} bytes, have {}",
        output.len()
    );
    let word = &output[at..end];
    let (high, low) = word.split_at(WORD - 8);
    ensure!(
        high.iter().all(|byte| *byte == 0),
        "word at {at} does not fit in 64 bits"
    );
    let mut buf = [0u8; 8];
    buf.copy_from_slice(low);
    usize::try_from(u64::from_be_bytes(buf)).map_err(|_| anyhow::anyhow!("word at {at} too large"))
}
