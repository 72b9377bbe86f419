use crate::rpc::options::DEFAULT_REQUEST_TIMEOUT_SECS;
use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_GRAPHQL_ENDPOINT: &str =
    "https://api.goldsky.com/api/public/project_cldf2o9pqagp43svvbk5u3kmo/subgraphs/nouns/prod/gn";
pub const DEFAULT_ETH_RPC_URL: &str = "https://eth.merkle.io";
pub const DEFAULT_PROPOSALS_PATH: &str = "proposals.json";
pub const DEFAULT_ENS_CACHE_PATH: &str = "ens-cache.json";
pub const DEFAULT_PAGE_SIZE: usize = 1000;
pub const DEFAULT_CHECKPOINT_INTERVAL: usize = 10;

pub const GRAPHQL_ENDPOINT_ENV: &str = "GRAPHQL_ENDPOINT";
pub const ETH_RPC_URL_ENV: &str = "ETH_RPC_URL";
pub const PROPOSALS_PATH_ENV: &str = "PROPOSALS_PATH";
pub const ENS_CACHE_PATH_ENV: &str = "ENS_CACHE_PATH";
pub const REQUEST_TIMEOUT_ENV: &str = "SYNC_REQUEST_TIMEOUT_SECS";
pub const CHECKPOINT_INTERVAL_ENV: &str = "ENS_CHECKPOINT_INTERVAL";
pub const VERIFY_FORWARD_ENV: &str = "ENS_VERIFY_FORWARD";

/// Runtime configuration shared by the three pipeline stages.
///
/// All instances are validated on construction through [`SyncConfig::builder`],
/// [`SyncConfig::new`] or [`SyncConfig::from_env`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    graphql_endpoint: String,
    eth_rpc_url: String,
    proposals_path: PathBuf,
    ens_cache_path: PathBuf,
    page_size: usize,
    request_timeout: Duration,
    checkpoint_interval: usize,
    verify_forward: bool,
}

pub struct SyncConfigParams {
    pub graphql_endpoint: String,
    pub eth_rpc_url: String,
    pub proposals_path: PathBuf,
    pub ens_cache_path: PathBuf,
    pub page_size: usize,
    pub request_timeout: Duration,
    pub checkpoint_interval: usize,
    pub verify_forward: bool,
}

impl SyncConfig {
    pub fn builder() -> SyncConfigBuilder {
        SyncConfigBuilder::default()
    }

    pub fn new(params: SyncConfigParams) -> Result<Self> {
        let SyncConfigParams {
            graphql_endpoint,
            eth_rpc_url,
            proposals_path,
            ens_cache_path,
            page_size,
            request_timeout,
            checkpoint_interval,
            verify_forward,
        } = params;

        let config = Self {
            graphql_endpoint: graphql_endpoint.trim().to_owned(),
            eth_rpc_url: eth_rpc_url.trim().to_owned(),
            proposals_path,
            ens_cache_path,
            page_size,
            request_timeout,
            checkpoint_interval,
            verify_forward,
        };

        config.validate()?;
        Ok(config)
    }

    /// Reads overrides from the process environment; unset variables keep
    /// their defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`SyncConfig::from_env`] with an injectable variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };

        let mut builder = Self::builder();
        if let Some(endpoint) = read(GRAPHQL_ENDPOINT_ENV) {
            builder = builder.graphql_endpoint(endpoint);
        }
        if let Some(url) = read(ETH_RPC_URL_ENV) {
            builder = builder.eth_rpc_url(url);
        }
        if let Some(path) = read(PROPOSALS_PATH_ENV) {
            builder = builder.proposals_path(path);
        }
        if let Some(path) = read(ENS_CACHE_PATH_ENV) {
            builder = builder.ens_cache_path(path);
        }
        if let Some(raw) = read(REQUEST_TIMEOUT_ENV) {
            let secs: u64 = raw.parse().with_context(|| {
                format!("{REQUEST_TIMEOUT_ENV} must be a whole number of seconds")
            })?;
            builder = builder.request_timeout(Duration::from_secs(secs));
        }
        if let Some(raw) = read(CHECKPOINT_INTERVAL_ENV) {
            let interval: usize = raw.parse().with_context(|| {
                format!("{CHECKPOINT_INTERVAL_ENV} must be a positive integer")
            })?;
            builder = builder.checkpoint_interval(interval);
        }
        if let Some(raw) = read(VERIFY_FORWARD_ENV) {
            builder = builder.verify_forward(parse_flag(VERIFY_FORWARD_ENV, &raw)?);
        }

        builder.build()
    }

    /// GraphQL endpoint serving the proposals list.
    pub fn graphql_endpoint(&self) -> &str {
        &self.graphql_endpoint
    }

    /// Ethereum JSON-RPC endpoint used for ENS lookups.
    pub fn eth_rpc_url(&self) -> &str {
        &self.eth_rpc_url
    }

    pub fn proposals_path(&self) -> &Path {
        &self.proposals_path
    }

    pub fn ens_cache_path(&self) -> &Path {
        &self.ens_cache_path
    }

    /// Records requested per upstream page.
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Timeout applied to every outbound request.
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Resolutions between name cache checkpoints.
    pub fn checkpoint_interval(&self) -> usize {
        self.checkpoint_interval
    }

    /// Whether reverse records must resolve back to the address.
    pub fn verify_forward(&self) -> bool {
        self.verify_forward
    }

    pub fn validate(&self) -> Result<()> {
        validate_url(&self.graphql_endpoint, "graphql_endpoint")?;
        validate_url(&self.eth_rpc_url, "eth_rpc_url")?;
        ensure_path(&self.proposals_path, "proposals_path")?;
        ensure_path(&self.ens_cache_path, "ens_cache_path")?;

        if self.page_size == 0 {
            bail!("page_size must be greater than 0");
        }

        if self.request_timeout.is_zero() {
            bail!("request_timeout must be greater than 0");
        }

        if self.checkpoint_interval == 0 {
            bail!("checkpoint_interval must be greater than 0");
        }

        if self.proposals_path == self.ens_cache_path {
            bail!("proposals_path and ens_cache_path must differ");
        }

        Ok(())
    }
}

#[derive(Debug, Default, Clone)]
pub struct SyncConfigBuilder {
    graphql_endpoint: Option<String>,
    eth_rpc_url: Option<String>,
    proposals_path: Option<PathBuf>,
    ens_cache_path: Option<PathBuf>,
    page_size: Option<usize>,
    request_timeout: Option<Duration>,
    checkpoint_interval: Option<usize>,
    verify_forward: Option<bool>,
}

impl SyncConfigBuilder {
    pub fn graphql_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.graphql_endpoint = Some(endpoint.into());
        self
    }

    pub fn eth_rpc_url(mut self, url: impl Into<String>) -> Self {
        self.eth_rpc_url = Some(url.into());
        self
    }

    pub fn proposals_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.proposals_path = Some(path.into());
        self
    }

    pub fn ens_cache_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.ens_cache_path = Some(path.into());
        self
    }

    /// Places both files under `dir` with their default names.
    pub fn data_dir(self, dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        self.proposals_path(dir.join(DEFAULT_PROPOSALS_PATH))
            .ens_cache_path(dir.join(DEFAULT_ENS_CACHE_PATH))
    }

    pub fn page_size(mut self, size: usize) -> Self {
        self.page_size = Some(size);
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn checkpoint_interval(mut self, interval: usize) -> Self {
        self.checkpoint_interval = Some(interval);
        self
    }

    pub fn verify_forward(mut self, enabled: bool) -> Self {
        self.verify_forward = Some(enabled);
        self
    }

    pub fn build(self) -> Result<SyncConfig> {
        SyncConfig::new(SyncConfigParams {
            graphql_endpoint: self
                .graphql_endpoint
                .unwrap_or_else(|| DEFAULT_GRAPHQL_ENDPOINT.to_owned()),
            eth_rpc_url: self
                .eth_rpc_url
                .unwrap_or_else(|| DEFAULT_ETH_RPC_URL.to_owned()),
            proposals_path: self
                .proposals_path
                .unwrap_or_else(|| PathBuf::from(DEFAULT_PROPOSALS_PATH)),
            ens_cache_path: self
                .ens_cache_path
                .unwrap_or_else(|| PathBuf::from(DEFAULT_ENS_CACHE_PATH)),
            page_size: self.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
            request_timeout: self
                .request_timeout
                .unwrap_or_else(|| Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS)),
            checkpoint_interval: self
                .checkpoint_interval
                .unwrap_or(DEFAULT_CHECKPOINT_INTERVAL),
            verify_forward: self.verify_forward.unwrap_or(true),
        })
    }
}

fn validate_url(url: &str, field: &str) -> Result<()> {
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        bail!("{field} must start with http:// or https://");
    }
    Ok(())
}

fn ensure_path(path: &Path, field: &str) -> Result<()> {
    if path.as_os_str().is_empty() {
        bail!("{field} cannot be empty");
    }
    Ok(())
}

fn parse_flag(key: &str, raw: &str) -> Result<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => bail!("{key} must be a boolean (true/false), got {raw:?}"),
    }
}
