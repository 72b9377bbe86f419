//! EIP-3668 offchain lookups ("CCIP-read").
//!
//! A resolver that keeps its records offchain reverts with
//! `OffchainLookup(address,string[],bytes,bytes4,bytes)`. The caller fetches
//! the answer from one of the gateway URLs and hands it back to the resolver
//! through the callback function, which verifies it and returns the result.

use crate::ens::abi::{decode_address, read_dynamic, read_word_as_usize, Address};
use crate::rpc::options::RpcClientOptions;
use crate::runtime::config::SyncConfig;
use anyhow::{anyhow, bail, ensure, Context, Result};
use futures::future::BoxFuture;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

/// `OffchainLookup(address,string[],bytes,bytes4,bytes)`.
pub const OFFCHAIN_LOOKUP_SELECTOR: [u8; 4] = [0x55, 0x6f, 0x18, 0x30];

const WORD: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OffchainLookup {
    pub sender: Address,
    pub urls: Vec<String>,
    pub call_data: Vec<u8>,
    pub callback: [u8; 4],
    pub extra_data: Vec<u8>,
}

impl OffchainLookup {
    /// `Ok(None)` when `revert` is some other revert reason.
    pub fn decode(revert: &[u8]) -> Result<Option<Self>> {
        if revert.len() < 4 || revert[..4] != OFFCHAIN_LOOKUP_SELECTOR {
            return Ok(None);
        }
        let params = &revert[4..];
        ensure!(
            params.len() >= 5 * WORD,
            "OffchainLookup revert too short ({} bytes)",
            params.len()
        );

        let sender = decode_address(params)?;
        let urls_at = read_word_as_usize(params, WORD)?;
        let count = read_word_as_usize(params, urls_at)?;
        let base = urls_at
            .checked_add(WORD)
            .ok_or_else(|| anyhow!("url list offset overflows"))?;
        ensure!(base <= params.len(), "url list runs past the revert data");
        let list = &params[base..];
        let mut urls = Vec::with_capacity(count.min(16));
        for index in 0..count {
            let raw = read_dynamic(list, index * WORD)?;
            urls.push(String::from_utf8(raw).context("gateway url is not valid UTF-8")?);
        }

        let call_data = read_dynamic(params, 2 * WORD)?;
        let mut callback = [0u8; 4];
        callback.copy_from_slice(&params[3 * WORD..3 * WORD + 4]);
        let extra_data = read_dynamic(params, 4 * WORD)?;

        Ok(Some(Self {
            sender,
            urls,
            call_data,
            callback,
            extra_data,
        }))
    }
}

/// Fetches offchain data from a CCIP-read gateway.
pub trait OffchainGateway: Send + Sync {
    /// `url` is the raw template from the revert; `{sender}` and `{data}`
    /// are substituted by the implementation.
    fn fetch<'a>(
        &'a self,
        url: &'a str,
        sender: Address,
        call_data: &'a [u8],
    ) -> BoxFuture<'a, Result<Vec<u8>>>;
}

impl<G: OffchainGateway + ?Sized> OffchainGateway for Arc<G> {
    fn fetch<'a>(
        &'a self,
        url: &'a str,
        sender: Address,
        call_data: &'a [u8],
    ) -> BoxFuture<'a, Result<Vec<u8>>> {
        (**self).fetch(url, sender, call_data)
    }
}

#[derive(Debug, Deserialize)]
struct GatewayResponse {
    data: String,
}

/// Gateway client speaking the EIP-3668 HTTP protocol: `GET` when the
/// template carries `{data}`, otherwise a JSON `POST`.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: Client,
}

impl OffchainGateway for HttpGateway {
    fn fetch<'a>(
        &'a self,
        url: &'a str,
        sender: Address,
        call_data: &'a [u8],
    ) -> BoxFuture<'a, Result<Vec<u8>>> {
        Box::pin(self.fetch(url, sender, call_data))
    }
}

impl HttpGateway {
    pub fn with_options(options: RpcClientOptions) -> Result<Self> {
        options.validate()?;
        let client = Client::builder()
            .timeout(options.request_timeout)
            .connect_timeout(options.connect_timeout)
            .build()
            .map_err(|err| anyhow!("failed to build CCIP-read gateway client: {err}"))?;
        Ok(Self { client })
    }

    pub fn from_config(config: &SyncConfig) -> Result<Self> {
        Self::with_options(RpcClientOptions::from_config(config))
    }

    pub async fn fetch(&self, template: &str, sender: Address, call_data: &[u8]) -> Result<Vec<u8>> {
        let sender_hex = sender.to_string();
        let data_hex = format!("0x{}", hex::encode(call_data));
        let url = template.replace("{sender}", &sender_hex);

        let request = if template.contains("{data}") {
            self.client.get(url.replace("{data}", &data_hex))
        } else {
            self.client
                .post(url.as_str())
                .json(&json!({ "data": data_hex, "sender": sender_hex }))
        };

        let response = request
            .send()
            .await
            .with_context(|| format!("gateway {template} unreachable"))?;
        let status = response.status();
        if !status.is_success() {
            bail!("gateway {template} answered HTTP {}", status.as_u16());
        }
        let body: GatewayResponse = response
            .json()
            .await
            .with_context(|| format!("gateway {template} returned a malformed body"))?;
        let digits = body.data.strip_prefix("0x").unwrap_or(&body.data);
        hex::decode(digits).with_context(|| format!("gateway {template} returned non-hex data"))
    }
}

#[cfg(test)]
impl OffchainLookup {
    pub(crate) fn encode(&self) -> Vec<u8> {
        use crate::ens::abi::{encode_dynamic, word};

        let mut urls = word(self.urls.len() as u64);
        let tails: Vec<Vec<u8>> = self
            .urls
            .iter()
            .map(|url| encode_dynamic(url.as_bytes()))
            .collect();
        let mut offset = tails.len() * WORD;
        for tail in &tails {
            urls.extend(word(offset as u64));
            offset += tail.len();
        }
        for tail in tails {
            urls.extend(tail);
        }
        let call_data = encode_dynamic(&self.call_data);
        let extra_data = encode_dynamic(&self.extra_data);

        let mut out = OFFCHAIN_LOOKUP_SELECTOR.to_vec();
        out.extend(vec![0u8; 12]);
        out.extend_from_slice(self.sender.as_bytes());
        let urls_at = 5 * WORD;
        out.extend(word(urls_at as u64));
        out.extend(word((urls_at + urls.len()) as u64));
        let mut callback = self.callback.to_vec();
        callback.resize(WORD, 0);
        out.extend(callback);
        out.extend(word((urls_at + urls.len() + call_data.len()) as u64));
        out.extend(urls);
        out.extend(call_data);
        out.extend(extra_data);
        out
    }
}
