//! Builds `proposals.json` from the upstream GraphQL source.

use crate::rpc::graphql::ProposalSource;
use crate::rpc::query::{PageRequest, RawProposal};
use crate::runtime::config::SyncConfig;
use crate::runtime::stage::{Interrupted, StageFuture, StageKind, SyncStage};
use crate::runtime::telemetry::Telemetry;
use crate::store::{save_json, sort_by_numeric_id, DocumentStore, NameCache, Proposal, Snapshot};
use anyhow::{Context, Result};
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchReport {
    pub total: usize,
    pub named: usize,
    pub pages: usize,
}

impl fmt::Display for FetchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "fetched {} proposals over {} pages; {} proposers have ENS names",
            self.total, self.pages, self.named
        )
    }
}

pub struct ProposalFetcher<S, D> {
    config: SyncConfig,
    source: S,
    store: D,
    telemetry: Arc<Telemetry>,
}

impl<S: ProposalSource, D: DocumentStore> ProposalFetcher<S, D> {
    pub fn new(config: SyncConfig, source: S, store: D) -> Self {
        Self::with_telemetry(config, source, store, Arc::new(Telemetry::default()))
    }

    pub fn with_telemetry(
        config: SyncConfig,
        source: S,
        store: D,
        telemetry: Arc<Telemetry>,
    ) -> Self {
        Self {
            config,
            source,
            store,
            telemetry,
        }
    }

    pub fn telemetry(&self) -> Arc<Telemetry> {
        Arc::clone(&self.telemetry)
    }

    /// Fetches every proposal, attaches cached names, sorts by numeric id and
    /// overwrites the snapshot. Nothing is written if any page fails.
    pub async fn fetch(&self, shutdown: &CancellationToken) -> Result<FetchReport> {
        let cache = NameCache::load_or_default(&self.store, self.config.ens_cache_path());

        let (raw, pages) = self.fetch_all(shutdown).await?;
        let mut proposals: Vec<Proposal> = raw
            .into_iter()
            .map(|record| {
                let ens = cache.name_for(&record.proposer.id).map(str::to_owned);
                Proposal::from_upstream(record, ens)
            })
            .collect();
        sort_by_numeric_id(&mut proposals);

        let snapshot = Snapshot::new(proposals);
        let path = self.config.proposals_path();
        save_json(&self.store, path, &snapshot)
            .with_context(|| format!("failed to write snapshot to {}", path.display()))?;
        self.telemetry.record_snapshot_write();

        let report = FetchReport {
            total: snapshot.len(),
            named: snapshot.named_count(),
            pages,
        };
        tracing::info!(
            path = %path.display(),
            total = report.total,
            named = report.named,
            "snapshot written"
        );
        Ok(report)
    }

    async fn fetch_all(&self, shutdown: &CancellationToken) -> Result<(Vec<RawProposal>, usize)> {
        let mut records = Vec::new();
        let mut page = PageRequest::first_page(self.config.page_size());
        let mut pages = 0usize;

        loop {
            if shutdown.is_cancelled() {
                return Err(Interrupted).context("proposal fetch stopped before completion");
            }

            let batch = self
                .source
                .fetch_page(page)
                .await
                .with_context(|| format!("failed to fetch proposals at offset {}", page.skip))?;
            let returned = batch.len();
            pages += 1;
            self.telemetry.record_page(returned);
            records.extend(batch);
            tracing::info!(
                page = pages,
                skip = page.skip,
                returned,
                total = records.len(),
                "fetched proposal page"
            );

            if page.is_last(returned) {
                break;
            }
            page = page.next();
        }

        Ok((records, pages))
    }
}

impl<S, D> SyncStage for ProposalFetcher<S, D>
where
    S: ProposalSource + 'static,
    D: DocumentStore + 'static,
{
    type Report = FetchReport;

    fn kind(&self) -> StageKind {
        StageKind::FetchProposals
    }

    fn run<'a>(&'a self, shutdown: CancellationToken) -> StageFuture<'a, FetchReport> {
        Box::pin(async move { self.fetch(&shutdown).await })
    }
}
