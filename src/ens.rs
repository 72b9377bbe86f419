//! ENS primary-name (reverse) resolution on Ethereum mainnet.

pub mod abi;
pub mod ccip;
pub mod namehash;
pub mod resolver;

pub use abi::{Address, AddressParseError};
pub use ccip::{HttpGateway, OffchainGateway, OffchainLookup};
pub use namehash::{namehash, reverse_name, Node};
pub use resolver::{EnsResolver, NameResolver, ENS_REGISTRY};
