use crate::support::{
    helpers::{config_for, init_tracing, proposer_address},
    mock_graphql::{Failure, MockIndexer},
};
use anyhow::Result;
use proposal_sync::{
    CacheApplier, FileStore, GraphQlClient, ProposalFetcher, Runner, StageKind, UpstreamError,
};
use tempfile::tempdir;

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn http_failure_mid_fetch_leaves_previous_snapshot() -> Result<()> {
    init_tracing();
    let dir = tempdir()?;
    let indexer = MockIndexer::new(2_500, |id| proposer_address(id, 3));
    indexer.fail_with(Failure::Status {
        from_skip: 2_000,
        status: 503,
    });
    let graphql = indexer.serve().await?;
    let config = config_for(dir.path(), graphql.url(), "http://127.0.0.1:9")?;
    std::fs::write(config.proposals_path(), b"{\"data\":{\"proposals\":[]}}")?;

    let fetcher = ProposalFetcher::new(
        config.clone(),
        GraphQlClient::from_config(&config)?,
        FileStore::new(),
    );
    let err = Runner::new(fetcher).run().await.err().expect("fetch should fail");
    assert_eq!(err.stage(), StageKind::FetchProposals);
    let upstream = err
        .into_source()
        .downcast::<UpstreamError>()
        .expect("upstream error preserved");
    assert!(matches!(upstream, UpstreamError::Status { status: 503, .. }));

    assert_eq!(
        std::fs::read_to_string(config.proposals_path())?,
        "{\"data\":{\"proposals\":[]}}"
    );
    assert_eq!(indexer.requests(), 3);

    graphql.shutdown().await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn graphql_errors_payload_aborts_fetch() -> Result<()> {
    init_tracing();
    let dir = tempdir()?;
    let indexer = MockIndexer::new(1_500, |id| proposer_address(id, 3));
    indexer.fail_with(Failure::Errors { from_skip: 1_000 });
    let graphql = indexer.serve().await?;
    let config = config_for(dir.path(), graphql.url(), "http://127.0.0.1:9")?;

    let err = ProposalFetcher::new(
        config.clone(),
        GraphQlClient::from_config(&config)?,
        FileStore::new(),
    )
    .fetch(&Default::default())
    .await
    .expect_err("errors payload must be fatal");
    assert!(format!("{err:#}").contains("indexer is syncing"));
    assert!(!config.proposals_path().exists());

    graphql.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn applier_requires_both_files() -> Result<()> {
    init_tracing();
    let dir = tempdir()?;
    let config = config_for(dir.path(), "http://127.0.0.1:9", "http://127.0.0.1:9")?;

    let err = CacheApplier::new(config.clone(), FileStore::new())
        .apply()
        .expect_err("missing cache is fatal");
    assert!(err.to_string().contains("update-ens-cache"));

    std::fs::write(config.ens_cache_path(), b"{\"0xA\": \"alice.eth\"}")?;
    let err = CacheApplier::new(config.clone(), FileStore::new())
        .apply()
        .expect_err("missing snapshot is fatal");
    assert!(err.to_string().contains("fetch-proposals"));
    assert!(!config.proposals_path().exists());
    Ok(())
}
