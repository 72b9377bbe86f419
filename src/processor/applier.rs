//! Copies cached names into an existing snapshot without touching the cache.

use crate::runtime::config::SyncConfig;
use crate::runtime::stage::{StageFuture, StageKind, SyncStage};
use crate::runtime::telemetry::Telemetry;
use crate::store::{load_json, save_json, DocumentStore, NameCache, Snapshot};
use anyhow::{Context, Result};
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApplyReport {
    pub cache_entries: usize,
    pub proposals: usize,
    pub updated: usize,
    pub named: usize,
}

impl fmt::Display for ApplyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "updated {} of {} proposals from {} cached names; {} proposals now have ENS names",
            self.updated, self.proposals, self.cache_entries, self.named
        )
    }
}

/// Sets `proposer.ens` from the cache wherever the cache has an entry that
/// differs from the current value. A proposer without an `ens` key differs
/// from every entry, a cached null included. Returns the number of proposals
/// changed.
pub fn apply_cache(snapshot: &mut Snapshot, cache: &NameCache) -> usize {
    let mut updated = 0;
    for proposal in snapshot.proposals_mut() {
        let Some(cached) = cache.entry(&proposal.proposer.id) else {
            continue;
        };
        if proposal.proposer.ens_entry() != Some(cached) {
            proposal.proposer.set_ens(cached.map(str::to_owned));
            updated += 1;
        }
    }
    updated
}

pub struct CacheApplier<D> {
    config: SyncConfig,
    store: D,
    telemetry: Arc<Telemetry>,
}

impl<D: DocumentStore> CacheApplier<D> {
    pub fn new(config: SyncConfig, store: D) -> Self {
        Self::with_telemetry(config, store, Arc::new(Telemetry::default()))
    }

    pub fn with_telemetry(config: SyncConfig, store: D, telemetry: Arc<Telemetry>) -> Self {
        Self {
            config,
            store,
            telemetry,
        }
    }

    pub fn telemetry(&self) -> Arc<Telemetry> {
        Arc::clone(&self.telemetry)
    }

    /// Both files are required. The snapshot is rewritten even when nothing
    /// changed.
    pub fn apply(&self) -> Result<ApplyReport> {
        let cache_path = self.config.ens_cache_path();
        let cache = NameCache::load(&self.store, cache_path).with_context(|| {
            format!(
                "cannot apply names without a cache at {}; run update-ens-cache first",
                cache_path.display()
            )
        })?;
        tracing::info!(entries = cache.len(), "loaded ENS cache");

        let proposals_path = self.config.proposals_path();
        let mut snapshot: Snapshot = load_json(&self.store, proposals_path).with_context(|| {
            format!(
                "cannot apply names without a snapshot at {}; run fetch-proposals first",
                proposals_path.display()
            )
        })?;

        let updated = apply_cache(&mut snapshot, &cache);
        save_json(&self.store, proposals_path, &snapshot)
            .with_context(|| format!("failed to write snapshot to {}", proposals_path.display()))?;
        self.telemetry.record_snapshot_write();

        Ok(ApplyReport {
            cache_entries: cache.len(),
            proposals: snapshot.len(),
            updated,
            named: snapshot.named_count(),
        })
    }
}

impl<D: DocumentStore + 'static> SyncStage for CacheApplier<D> {
    type Report = ApplyReport;

    fn kind(&self) -> StageKind {
        StageKind::ApplyNameCache
    }

    /// Runs to completion; the single rewrite is not interruptible.
    fn run<'a>(&'a self, _shutdown: CancellationToken) -> StageFuture<'a, ApplyReport> {
        Box::pin(async move { self.apply() })
    }
}
