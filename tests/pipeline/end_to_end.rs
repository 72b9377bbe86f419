use crate::support::{
    helpers::{config_for, init_tracing, proposer_address, read_cache, read_snapshot},
    mock_graphql::MockIndexer,
    mock_rpc::MockEns,
};
use anyhow::Result;
use proposal_sync::{
    CacheApplier, EnsResolver, FileStore, GraphQlClient, NameCacheUpdater, ProposalFetcher,
    Runner, Telemetry,
};
use std::sync::Arc;
use tempfile::tempdir;

const DISTINCT_PROPOSERS: u64 = 25;

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn fetch_update_apply_round_trip() -> Result<()> {
    init_tracing();
    let dir = tempdir()?;

    let indexer = MockIndexer::new(2_345, |id| proposer_address(id, DISTINCT_PROPOSERS));
    let graphql = indexer.serve().await?;
    let ens = MockEns::default();
    ens.register(&proposer_address(1, DISTINCT_PROPOSERS), "alice.eth");
    ens.register(&proposer_address(2, DISTINCT_PROPOSERS), "bob.eth");
    ens.revert_for(&proposer_address(3, DISTINCT_PROPOSERS));
    let node = ens.serve().await?;

    let config = config_for(dir.path(), graphql.url(), node.url())?;
    let telemetry = Arc::new(Telemetry::default());

    // No cache yet: every proposer is written without a name.
    let fetcher = ProposalFetcher::with_telemetry(
        config.clone(),
        GraphQlClient::from_config(&config)?,
        FileStore::new(),
        Arc::clone(&telemetry),
    );
    let fetched = Runner::new(fetcher).run().await?;
    assert_eq!(fetched.total, 2_345);
    assert_eq!(fetched.pages, 3);
    assert_eq!(fetched.named, 0);
    assert_eq!(indexer.requests(), 3);

    let snapshot = read_snapshot(&config)?;
    let ids: Vec<u64> = snapshot
        .proposals()
        .iter()
        .map(|proposal| proposal.id.parse())
        .collect::<Result<_, _>>()?;
    assert_eq!(ids, (1..=2_345).collect::<Vec<u64>>());

    // Resolve the 25 proposers: 2 named, 1 failing, the rest unnamed.
    let updater = NameCacheUpdater::with_telemetry(
        config.clone(),
        EnsResolver::from_config(&config)?,
        FileStore::new(),
        Arc::clone(&telemetry),
    );
    let updated = Runner::new(updater).run().await?;
    assert_eq!(updated.unique, 25);
    assert_eq!(updated.newly_resolved, 25);
    assert_eq!(updated.found, 2);
    assert_eq!(updated.failed, 1);
    assert_eq!(updated.empty, 22);
    assert_eq!(updated.total_named, 2);

    let cache = read_cache(&config)?;
    assert_eq!(cache.len(), 25);
    assert_eq!(
        cache.entry(&proposer_address(1, DISTINCT_PROPOSERS)),
        Some(Some("alice.eth"))
    );
    assert_eq!(cache.entry(&proposer_address(3, DISTINCT_PROPOSERS)), Some(None));

    // A second update is a no-op and issues no lookups.
    let calls_before = ens.calls();
    let again = NameCacheUpdater::new(
        config.clone(),
        EnsResolver::from_config(&config)?,
        FileStore::new(),
    )
    .update(&Default::default())
    .await?;
    assert!(again.up_to_date);
    assert_eq!(ens.calls(), calls_before);

    // Applying the cache names every proposal by alice or bob.
    let applier = CacheApplier::with_telemetry(config.clone(), FileStore::new(), Arc::clone(&telemetry));
    let applied = Runner::new(applier).run().await?;
    let expected_named = (1..=2_345u64)
        .filter(|id| matches!(id % DISTINCT_PROPOSERS, 1 | 2))
        .count();
    assert_eq!(applied.updated, expected_named);
    assert_eq!(applied.named, expected_named);

    let snapshot = read_snapshot(&config)?;
    for proposal in snapshot.proposals() {
        let expected = cache.name_for(&proposal.proposer.id);
        assert_eq!(proposal.proposer.name(), expected);
    }

    // Re-fetching now embeds the cached names directly.
    let refetch = ProposalFetcher::new(
        config.clone(),
        GraphQlClient::from_config(&config)?,
        FileStore::new(),
    )
    .fetch(&Default::default())
    .await?;
    assert_eq!(refetch.named, expected_named);

    let metrics = telemetry.snapshot();
    assert_eq!(metrics.pages_fetched, 3);
    assert_eq!(metrics.records_fetched, 2_345);
    assert_eq!(metrics.names_found, 2);
    assert_eq!(metrics.names_failed, 1);
    assert_eq!(metrics.cache_writes, 4);
    assert_eq!(metrics.snapshot_writes, 2);

    graphql.shutdown().await;
    node.shutdown().await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn fetch_with_exact_page_multiple_requests_one_empty_page() -> Result<()> {
    init_tracing();
    let dir = tempdir()?;
    let indexer = MockIndexer::new(2_000, |id| proposer_address(id, 4));
    let graphql = indexer.serve().await?;
    let config = config_for(dir.path(), graphql.url(), "http://127.0.0.1:9")?;

    let report = ProposalFetcher::new(
        config.clone(),
        GraphQlClient::from_config(&config)?,
        FileStore::new(),
    )
    .fetch(&Default::default())
    .await?;

    assert_eq!(report.total, 2_000);
    assert_eq!(indexer.requests(), 3);
    assert_eq!(read_snapshot(&config)?.len(), 2_000);

    graphql.shutdown().await;
    Ok(())
}
