//! Outbound network clients: the GraphQL proposals indexer and the Ethereum
//! JSON-RPC node used for ENS lookups, with their shared timeout options.

pub mod client;
pub mod graphql;
pub mod options;
pub mod query;

pub use client::{ContractCaller, EthRpcClient, RpcError};
pub use graphql::{GraphQlClient, ProposalSource, UpstreamError};
pub use options::RpcClientOptions;
pub use query::{GraphQlRequest, PageRequest, RawProposal, RawProposer};
