//! Primary-name lookup through the ENS registry:
//!
//! 1. find the resolver of `<addr>.addr.reverse` and read its `name()`
//! 2. optionally, the forward `addr()` record of that name must point back
//!    at the address, otherwise the claimed name is ignored.
//!
//! Resolvers are located as described in ENSIP-10: when a name has no
//! resolver of its own, its parents are tried in turn, and a resolver that
//! supports the extended interface is queried through `resolve(bytes,bytes)`.
//! Offchain resolvers answer through EIP-3668 gateways (see [`super::ccip`]).

use crate::ens::abi::{
    decode_address, decode_bool, decode_bytes, decode_string, dns_encode, encode_bytes_pair_call,
    encode_node_call, encode_supports_interface, Address, ADDR_SELECTOR, NAME_SELECTOR,
    RESOLVER_SELECTOR, RESOLVE_SELECTOR,
};
use crate::ens::ccip::{HttpGateway, OffchainGateway, OffchainLookup};
use crate::ens::namehash::{namehash, reverse_name, Node};
use crate::rpc::client::{ContractCaller, EthRpcClient, RpcError};
use crate::runtime::config::SyncConfig;
use anyhow::{anyhow, bail, ensure, Context, Result};
use futures::future::BoxFuture;
use std::sync::Arc;

/// Mainnet ENS registry.
pub const ENS_REGISTRY: &str = "0x00000000000C2E074eC69A0dFb2997BA6C7d2e1e";

/// Upper bound on chained offchain lookups for a single call.
const MAX_OFFCHAIN_LOOKUPS: usize = 4;

/// Resolves an address to its human-readable name.
pub trait NameResolver: Send + Sync {
    /// `Ok(None)` when the address has no name; `Err` when the lookup itself
    /// failed.
    fn resolve<'a>(&'a self, address: &'a str) -> BoxFuture<'a, Result<Option<String>>>;
}

impl<R: NameResolver + ?Sized> NameResolver for Arc<R> {
    fn resolve<'a>(&'a self, address: &'a str) -> BoxFuture<'a, Result<Option<String>>> {
        (**self).resolve(address)
    }
}

#[derive(Clone)]
pub struct EnsResolver<C> {
    caller: C,
    registry: Address,
    verify_forward: bool,
    gateway: Option<Arc<dyn OffchainGateway>>,
}

/// Resolver located for a name, and whether it was registered for the name
/// itself or for one of its parents.
struct Located {
    resolver: Address,
    exact: bool,
}

impl<C: ContractCaller> NameResolver for EnsResolver<C> {
    fn resolve<'a>(&'a self, address: &'a str) -> BoxFuture<'a, Result<Option<String>>> {
        Box::pin(self.lookup(address))
    }
}

impl EnsResolver<EthRpcClient> {
    pub fn from_config(config: &SyncConfig) -> Result<Self> {
        let client = EthRpcClient::from_config(config)?;
        let gateway = HttpGateway::from_config(config)?;
        Ok(Self::new(client)
            .verify_forward(config.verify_forward())
            .with_gateway(Arc::new(gateway)))
    }
}

impl<C: ContractCaller> EnsResolver<C> {
    /// A resolver without an offchain gateway: names served through EIP-3668
    /// fail to resolve until one is set with [`EnsResolver::with_gateway`].
    pub fn new(caller: C) -> Self {
        let registry = ENS_REGISTRY.parse().unwrap_or(Address::ZERO);
        Self {
            caller,
            registry,
            verify_forward: true,
            gateway: None,
        }
    }

    pub fn with_registry(mut self, registry: Address) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_gateway(mut self, gateway: Arc<dyn OffchainGateway>) -> Self {
        self.gateway = Some(gateway);
        self
    }

    pub fn verify_forward(mut self, enabled: bool) -> Self {
        self.verify_forward = enabled;
        self
    }

    pub fn registry(&self) -> Address {
        self.registry
    }

    pub async fn lookup(&self, address: &str) -> Result<Option<String>> {
        let parsed: Address = address.parse()?;
        let reverse = reverse_name(&parsed);
        let reverse_node = namehash(&reverse);

        let Some(output) = self
            .resolve_record(&reverse, encode_node_call(NAME_SELECTOR, &reverse_node))
            .await
            .context("reverse name() lookup failed")?
        else {
            return Ok(None);
        };
        let name = decode_string(&output).context("reverse resolver returned a malformed name")?;
        if name.is_empty() {
            return Ok(None);
        }

        if self.verify_forward && !self.points_back(&name, parsed).await? {
            tracing::debug!(
                address,
                name = name.as_str(),
                "reverse record does not resolve back to the address; ignoring it"
            );
            return Ok(None);
        }

        Ok(Some(name))
    }

    async fn points_back(&self, name: &str, address: Address) -> Result<bool> {
        let node = namehash(name);
        let Some(output) = self
            .resolve_record(name, encode_node_call(ADDR_SELECTOR, &node))
            .await
            .context("forward addr() lookup failed")?
        else {
            return Ok(false);
        };
        Ok(decode_address(&output)? == address)
    }

    /// Runs a resolver profile call for `name`. `Ok(None)` when no usable
    /// resolver exists or the record is empty.
    async fn resolve_record(&self, name: &str, call: Vec<u8>) -> Result<Option<Vec<u8>>> {
        let Some(located) = self.locate_resolver(name).await? else {
            return Ok(None);
        };

        let output = if self.supports_extended(located.resolver).await? {
            let wrapped = encode_bytes_pair_call(RESOLVE_SELECTOR, &dns_encode(name)?, &call);
            let output = self.call_with_offchain(located.resolver, wrapped).await?;
            decode_bytes(&output).context("resolve() returned malformed bytes")?
        } else if located.exact {
            self.call_with_offchain(located.resolver, call).await?
        } else {
            return Ok(None);
        };

        Ok((!output.is_empty()).then_some(output))
    }

    /// Walks from `name` towards the root (exclusive) until the registry
    /// reports a resolver.
    async fn locate_resolver(&self, name: &str) -> Result<Option<Located>> {
        let mut current = name;
        loop {
            if let Some(resolver) = self.registry_resolver(&namehash(current)).await? {
                return Ok(Some(Located {
                    resolver,
                    exact: current.len() == name.len(),
                }));
            }
            match current.split_once('.') {
                Some((_, parent)) => current = parent,
                None => return Ok(None),
            }
        }
    }

    async fn registry_resolver(&self, node: &Node) -> Result<Option<Address>> {
        let output = self
            .caller
            .call(self.registry, encode_node_call(RESOLVER_SELECTOR, node))
            .await
            .context("ENS registry resolver() call failed")?;
        let resolver = decode_address(&output)?;
        Ok((!resolver.is_zero()).then_some(resolver))
    }

    /// EIP-165 check for the ENSIP-10 interface. A reverting or empty answer
    /// means unsupported.
    async fn supports_extended(&self, resolver: Address) -> Result<bool> {
        match self
            .caller
            .call(resolver, encode_supports_interface(RESOLVE_SELECTOR))
            .await
        {
            Ok(output) => Ok(decode_bool(&output).unwrap_or(false)),
            Err(err) if matches!(err.downcast_ref::<RpcError>(), Some(RpcError::Call { .. })) => {
                Ok(false)
            }
            Err(err) => Err(err.context("supportsInterface() call failed")),
        }
    }

    /// `eth_call` that follows `OffchainLookup` reverts through the gateway
    /// and the resolver's callback.
    async fn call_with_offchain(&self, resolver: Address, data: Vec<u8>) -> Result<Vec<u8>> {
        let mut data = data;
        for _ in 0..=MAX_OFFCHAIN_LOOKUPS {
            let err = match self.caller.call(resolver, data).await {
                Ok(output) => return Ok(output),
                Err(err) => err,
            };
            let lookup = match err.downcast_ref::<RpcError>().and_then(RpcError::revert_data) {
                Some(revert) => OffchainLookup::decode(revert)?,
                None => None,
            };
            let Some(lookup) = lookup else {
                return Err(err);
            };
            ensure!(
                lookup.sender == resolver,
                "OffchainLookup sender {} does not match resolver {resolver}",
                lookup.sender
            );

            let response = self.fetch_offchain(&lookup).await?;
            data = encode_bytes_pair_call(lookup.callback, &response, &lookup.extra_data);
        }
        bail!("resolver {resolver} exceeded {MAX_OFFCHAIN_LOOKUPS} chained offchain lookups")
    }

    async fn fetch_offchain(&self, lookup: &OffchainLookup) -> Result<Vec<u8>> {
        let Some(gateway) = &self.gateway else {
            bail!(
                "resolver {} requires an offchain lookup but no gateway is configured",
                lookup.sender
            );
        };

        let mut last_error = None;
        for url in &lookup.urls {
            match gateway.fetch(url, lookup.sender, &lookup.call_data).await {
                Ok(response) => return Ok(response),
                Err(err) => {
                    let error = format!("{err:#}");
                    tracing::debug!(url = url.as_str(), error = %error, "gateway failed; trying next");
                    last_error = Some(err);
                }
            }
        }
        Err(last_error.unwrap_or_else(|| anyhow!("OffchainLookup carried no gateway urls")))
    }
}
