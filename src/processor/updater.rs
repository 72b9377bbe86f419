//! Resolves proposer addresses that have no cache entry yet and persists the
//! cache incrementally.

use crate::ens::NameResolver;
use crate::processor::checkpoint::CheckpointPolicy;
use crate::runtime::config::SyncConfig;
use crate::runtime::stage::{Interrupted, StageFuture, StageKind, SyncStage};
use crate::runtime::telemetry::Telemetry;
use crate::store::{load_json, save_json, DocumentStore, NameCache, ProposerIndex};
use anyhow::{Context, Result};
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateReport {
    /// Distinct proposer addresses in the snapshot.
    pub unique: usize,
    pub already_cached: usize,
    pub newly_resolved: usize,
    pub found: usize,
    pub empty: usize,
    pub failed: usize,
    /// Cache entries carrying a name after the run.
    pub total_named: usize,
    pub total_cached: usize,
    pub up_to_date: bool,
}

impl fmt::Display for UpdateReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.up_to_date {
            return write!(
                f,
                "all {} proposer addresses already cached; ENS cache is up to date",
                self.unique
            );
        }
        write!(
            f,
            "{} already cached, {} newly resolved ({} named, {} without a name, {} failed); \
             {} of {} cached addresses have ENS names",
            self.already_cached,
            self.newly_resolved,
            self.found,
            self.empty,
            self.failed,
            self.total_named,
            self.total_cached
        )
    }
}

pub struct NameCacheUpdater<R, D> {
    config: SyncConfig,
    resolver: R,
    store: D,
    telemetry: Arc<Telemetry>,
}

impl<R: NameResolver, D: DocumentStore> NameCacheUpdater<R, D> {
    pub fn new(config: SyncConfig, resolver: R, store: D) -> Self {
        Self::with_telemetry(config, resolver, store, Arc::new(Telemetry::default()))
    }

    pub fn with_telemetry(
        config: SyncConfig,
        resolver: R,
        store: D,
        telemetry: Arc<Telemetry>,
    ) -> Self {
        Self {
            config,
            resolver,
            store,
            telemetry,
        }
    }

    pub fn telemetry(&self) -> Arc<Telemetry> {
        Arc::clone(&self.telemetry)
    }

    /// Resolves every snapshot proposer missing from the cache, one at a time.
    ///
    /// Only proposer ids are read from the snapshot; one without
    /// `data.proposals` has nothing to resolve.
    ///
    /// A cancelled `shutdown` token stops the batch at the next lookup; the
    /// entries recorded so far are saved before the interruption is reported.
    pub async fn update(&self, shutdown: &CancellationToken) -> Result<UpdateReport> {
        let proposals_path = self.config.proposals_path();
        let snapshot: ProposerIndex = load_json(&self.store, proposals_path).with_context(|| {
            format!(
                "cannot resolve names without a snapshot at {}; run fetch-proposals first",
                proposals_path.display()
            )
        })?;
        let mut cache = NameCache::load_or_default(&self.store, self.config.ens_cache_path());

        let addresses = snapshot.distinct_proposers();
        let pending: Vec<String> = cache
            .missing(addresses.iter().copied())
            .into_iter()
            .map(str::to_owned)
            .collect();

        let mut report = UpdateReport {
            unique: addresses.len(),
            already_cached: addresses.len() - pending.len(),
            newly_resolved: pending.len(),
            ..UpdateReport::default()
        };
        tracing::info!(
            unique = report.unique,
            cached = report.already_cached,
            pending = pending.len(),
            "collected proposer addresses"
        );

        if pending.is_empty() {
            report.up_to_date = true;
            report.total_named = cache.resolved_count();
            report.total_cached = cache.len();
            tracing::info!("ENS cache is already up to date");
            return Ok(report);
        }

        let policy = CheckpointPolicy::new(self.config.checkpoint_interval(), pending.len());
        for (index, address) in pending.iter().enumerate() {
            let outcome = tokio::select! {
                biased;
                _ = shutdown.cancelled() => None,
                result = self.resolver.resolve(address) => Some(result),
            };

            let Some(result) = outcome else {
                self.save(&cache)?;
                tracing::warn!(
                    resolved = index,
                    remaining = pending.len() - index,
                    "shutdown requested; saved partial ENS cache"
                );
                return Err(Interrupted).context(format!(
                    "name resolution stopped after {index} of {} addresses",
                    pending.len()
                ));
            };

            let name = match result {
                Ok(Some(name)) if !name.is_empty() => {
                    report.found += 1;
                    self.telemetry.record_name_found();
                    tracing::debug!(address = address.as_str(), name = name.as_str(), "resolved");
                    Some(name)
                }
                Ok(_) => {
                    report.empty += 1;
                    self.telemetry.record_name_empty();
                    None
                }
                Err(err) => {
                    let error = format!("{err:#}");
                    report.failed += 1;
                    self.telemetry.record_name_failed();
                    tracing::warn!(
                        address = address.as_str(),
                        error = %error,
                        "name resolution failed; caching no name"
                    );
                    None
                }
            };
            cache.record(address.clone(), name);

            let processed = index + 1;
            if policy.should_save(processed) {
                self.save(&cache)?;
                tracing::info!(
                    processed,
                    total = pending.len(),
                    found = report.found,
                    "ENS cache checkpoint saved"
                );
            }
        }

        self.save(&cache)?;

        report.total_named = cache.resolved_count();
        report.total_cached = cache.len();
        Ok(report)
    }

    fn save(&self, cache: &NameCache) -> Result<()> {
        let path = self.config.ens_cache_path();
        save_json(&self.store, path, cache)
            .with_context(|| format!("failed to write ENS cache to {}", path.display()))?;
        self.telemetry.record_cache_write();
        Ok(())
    }
}

impl<R, D> SyncStage for NameCacheUpdater<R, D>
where
    R: NameResolver + 'static,
    D: DocumentStore + 'static,
{
    type Report = UpdateReport;

    fn kind(&self) -> StageKind {
        StageKind::UpdateNameCache
    }

    fn run<'a>(&'a self, shutdown: CancellationToken) -> StageFuture<'a, UpdateReport> {
        Box::pin(async move { self.update(&shutdown).await })
    }
}
