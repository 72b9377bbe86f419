use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use once_cell::sync::Lazy;
use proposal_sync::{FileStore, NameCache, Snapshot, SyncConfig};
use proposal_sync::store::load_json;
use tracing_subscriber::EnvFilter;

static TRACING_SUBSCRIBER: Lazy<()> = Lazy::new(|| {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
});

pub fn init_tracing() {
    Lazy::force(&TRACING_SUBSCRIBER);
}

/// Proposer address used for proposal `id`: proposals share `distinct`
/// proposers round-robin.
pub fn proposer_address(id: u64, distinct: u64) -> String {
    format!("0x{:040x}", 0x1000 + id % distinct)
}

pub fn config_for(dir: &Path, graphql: &str, eth_rpc: &str) -> Result<SyncConfig> {
    SyncConfig::builder()
        .graphql_endpoint(graphql)
        .eth_rpc_url(eth_rpc)
        .data_dir(dir)
        .request_timeout(Duration::from_secs(5))
        .build()
}

pub fn read_snapshot(config: &SyncConfig) -> Result<Snapshot> {
    Ok(load_json(&FileStore::new(), config.proposals_path())?)
}

pub fn read_cache(config: &SyncConfig) -> Result<NameCache> {
    Ok(NameCache::load(&FileStore::new(), config.ens_cache_path())?)
}
