use anyhow::Result;
use proposal_sync::{
    init_tracing, FileStore, GraphQlClient, ProposalFetcher, Runner, SyncConfig, Telemetry,
};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config = SyncConfig::from_env()?;
    tracing::info!(endpoint = config.graphql_endpoint(), "fetching proposals");

    let source = GraphQlClient::from_config(&config)?;
    let telemetry = Arc::new(Telemetry::default());
    let fetcher =
        ProposalFetcher::with_telemetry(config, source, FileStore::new(), Arc::clone(&telemetry));

    let outcome = Runner::new(fetcher).run_until_ctrl_c().await;
    telemetry.log_summary();
    let report = outcome?;
    tracing::info!("{report}");
    Ok(())
}
