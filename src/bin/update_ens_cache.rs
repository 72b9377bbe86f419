use anyhow::Result;
use proposal_sync::{
    init_tracing, EnsResolver, FileStore, NameCacheUpdater, Runner, SyncConfig, Telemetry,
};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config = SyncConfig::from_env()?;
    tracing::info!(
        rpc_url = config.eth_rpc_url(),
        verify_forward = config.verify_forward(),
        "updating ENS cache"
    );

    let resolver = EnsResolver::from_config(&config)?;
    let telemetry = Arc::new(Telemetry::default());
    let updater =
        NameCacheUpdater::with_telemetry(config, resolver, FileStore::new(), Arc::clone(&telemetry));

    let outcome = Runner::new(updater).run_until_ctrl_c().await;
    telemetry.log_summary();
    let report = outcome?;
    tracing::info!("{report}");
    Ok(())
}
