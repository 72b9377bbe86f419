//! Ethereum JSON-RPC client used for read-only contract calls, and the
//! `ContractCaller` trait consumed by the ENS resolver.

use crate::ens::abi::Address;
use crate::rpc::options::RpcClientOptions;
use crate::runtime::config::SyncConfig;
use anyhow::{anyhow, Context, Result};
use futures::future::BoxFuture;
use jsonrpsee::core::{client::ClientT, client::Error as JsonRpcError, http_helpers::HttpError};
use jsonrpsee::http_client::transport::Error as HttpTransportError;
use jsonrpsee::http_client::{HttpClient, HttpClientBuilder};
use jsonrpsee::rpc_params;
use serde_json::json;
use std::sync::Arc;
use tokio::time::{timeout, Instant};

const ETH_CALL: &str = "eth_call";

#[derive(Debug)]
pub enum RpcError {
    Timeout {
        method: &'static str,
    },
    ResponseTooLarge {
        method: &'static str,
    },
    Call {
        method: &'static str,
        code: i32,
        message: String,
        /// ABI-encoded revert reason when the node returned one.
        revert_data: Option<Vec<u8>>,
    },
    InvalidHex {
        method: &'static str,
    },
}

impl std::fmt::Display for RpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RpcError::Timeout { method } => write!(f, "rpc method {method} timed out"),
            RpcError::ResponseTooLarge { method } => {
                write!(f, "rpc {method} response exceeded HTTP size limits")
            }
            RpcError::Call {
                method,
                code,
                message,
                ..
            } => write!(f, "rpc {method} call failed (code={code}, message={message})"),
            RpcError::InvalidHex { method } => {
                write!(f, "rpc {method} returned a non-hex result")
            }
        }
    }
}

impl std::error::Error for RpcError {}

impl RpcError {
    /// Revert data attached to a failed call, if any.
    pub fn revert_data(&self) -> Option<&[u8]> {
        match self {
            RpcError::Call { revert_data, .. } => revert_data.as_deref(),
            _ => None,
        }
    }
}

/// Executes a read-only call against a contract and returns the raw ABI
/// encoded return data.
pub trait ContractCaller: Send + Sync {
    fn call<'a>(&'a self, to: Address, data: Vec<u8>) -> BoxFuture<'a, Result<Vec<u8>>>;
}

impl<C: ContractCaller + ?Sized> ContractCaller for Arc<C> {
    fn call<'a>(&'a self, to: Address, data: Vec<u8>) -> BoxFuture<'a, Result<Vec<u8>>> {
        (**self).call(to, data)
    }
}

#[derive(Debug, Clone)]
pub struct EthRpcClient {
    rpc_url: Arc<String>,
    client: HttpClient,
    options: RpcClientOptions,
}

impl ContractCaller for EthRpcClient {
    fn call<'a>(&'a self, to: Address, data: Vec<u8>) -> BoxFuture<'a, Result<Vec<u8>>> {
        Box::pin(async move { self.eth_call(to, &data).await })
    }
}

impl EthRpcClient {
    pub fn new(url: impl Into<String>) -> Result<Self> {
        Self::with_options(url, RpcClientOptions::default())
    }

    pub fn with_options(url: impl Into<String>, options: RpcClientOptions) -> Result<Self> {
        options.validate()?;

        let rpc_url = url.into();
        let max_request_body_size = options.max_request_body_bytes.min(u32::MAX as usize) as u32;
        let max_response_body_size = options.max_response_body_bytes.min(u32::MAX as usize) as u32;

        let client = HttpClientBuilder::default()
            .request_timeout(options.request_timeout)
            .max_request_size(max_request_body_size)
            .max_response_size(max_response_body_size)
            .build(&rpc_url)
            .map_err(|err| anyhow!("failed to build Ethereum RPC client: {err}"))?;

        Ok(Self {
            rpc_url: Arc::new(rpc_url),
            client,
            options,
        })
    }

    pub fn from_config(config: &SyncConfig) -> Result<Self> {
        Self::with_options(
            config.eth_rpc_url().to_owned(),
            RpcClientOptions::from_config(config),
        )
    }

    pub fn endpoint(&self) -> &str {
        &self.rpc_url
    }

    /// `eth_call` against the latest block.
    pub async fn eth_call(&self, to: Address, data: &[u8]) -> Result<Vec<u8>> {
        let call = json!({
            "to": to.to_string(),
            "data": format!("0x{}", hex::encode(data)),
        });
        let start = Instant::now();

        let result: String = timeout(
            self.options.request_timeout,
            self.client.request(ETH_CALL, rpc_params![call, "latest"]),
        )
        .await
        .map_err(|_| RpcError::Timeout { method: ETH_CALL })?
        .map_err(|err| map_rpc_error(ETH_CALL, err))?;

        tracing::trace!(
            to = %to,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "eth_call completed"
        );

        decode_hex_result(ETH_CALL, &result)
    }
}

fn decode_hex_result(method: &'static str, result: &str) -> Result<Vec<u8>> {
    let digits = result
        .strip_prefix("0x")
        .or_else(|| result.strip_prefix("0X"))
        .unwrap_or(result);
    hex::decode(digits)
        .map_err(|_| RpcError::InvalidHex { method })
        .with_context(|| format!("unexpected {method} result {result:?}"))
}

fn map_rpc_error(label: &'static str, err: JsonRpcError) -> anyhow::Error {
    if response_too_large(&err) {
        return RpcError::ResponseTooLarge { method: label }.into();
    }
    if let JsonRpcError::Call(call) = &err {
        return RpcError::Call {
            method: label,
            code: call.code(),
            message: call.message().to_owned(),
            revert_data: call.data().and_then(|raw| decode_revert_data(raw.get())),
        }
        .into();
    }
    if matches!(err, JsonRpcError::RequestTimeout) {
        return RpcError::Timeout { method: label }.into();
    }
    anyhow!("rpc {label} call failed: {err}")
}

/// Nodes return revert data either as a bare hex string or nested under
/// `data`; anything else is ignored.
fn decode_revert_data(raw: &str) -> Option<Vec<u8>> {
    let value: serde_json::Value = serde_json::from_str(raw).ok()?;
    let text = match &value {
        serde_json::Value::String(text) => text.as_str(),
        serde_json::Value::Object(map) => map.get("data")?.as_str()?,
        _ => return None,
    };
    hex::decode(text.strip_prefix("0x").unwrap_or(text)).ok()
}

fn response_too_large(err: &JsonRpcError) -> bool {
    match err {
        JsonRpcError::Transport(inner) => match inner.downcast_ref::<HttpTransportError>() {
            Some(HttpTransportError::Http(http_err)) => matches!(http_err, HttpError::TooLarge),
            Some(HttpTransportError::RequestTooLarge) => true,
            _ => false,
        },
        _ => false,
    }
}
