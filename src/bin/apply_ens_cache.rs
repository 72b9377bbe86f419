use anyhow::Result;
use proposal_sync::{init_tracing, CacheApplier, FileStore, Runner, SyncConfig, Telemetry};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config = SyncConfig::from_env()?;
    let telemetry = Arc::new(Telemetry::default());
    let applier = CacheApplier::with_telemetry(config, FileStore::new(), Arc::clone(&telemetry));

    let outcome = Runner::new(applier).run_until_ctrl_c().await;
    telemetry.log_summary();
    let report = outcome?;
    tracing::info!("{report}");
    Ok(())
}
