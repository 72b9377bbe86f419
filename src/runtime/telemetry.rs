use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;
use tracing_subscriber::EnvFilter;

static TRACING_INIT: OnceLock<()> = OnceLock::new();

/// Installs a console tracing subscriber (if one is not already active).
///
/// The subscriber honours `RUST_LOG` if it is present, otherwise it falls back to `info`.
/// Calling this function multiple times is harmless.
pub fn init_tracing() {
    if TRACING_INIT.get().is_some() {
        return;
    }

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();

    let _ = TRACING_INIT.set(());
}

/// Run-wide counters shared by the stages of one process.
#[derive(Default, Debug)]
pub struct Telemetry {
    pages_fetched: AtomicU64,
    records_fetched: AtomicU64,
    names_found: AtomicU64,
    names_empty: AtomicU64,
    names_failed: AtomicU64,
    cache_writes: AtomicU64,
    snapshot_writes: AtomicU64,
}

impl Telemetry {
    pub fn record_page(&self, records: usize) {
        self.pages_fetched.fetch_add(1, Ordering::Relaxed);
        self.records_fetched
            .fetch_add(records as u64, Ordering::Relaxed);
    }

    pub fn record_name_found(&self) {
        self.names_found.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_name_empty(&self) {
        self.names_empty.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_name_failed(&self) {
        self.names_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_write(&self) {
        self.cache_writes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_snapshot_write(&self) {
        self.snapshot_writes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        TelemetrySnapshot {
            pages_fetched: self.pages_fetched.load(Ordering::Relaxed),
            records_fetched: self.records_fetched.load(Ordering::Relaxed),
            names_found: self.names_found.load(Ordering::Relaxed),
            names_empty: self.names_empty.load(Ordering::Relaxed),
            names_failed: self.names_failed.load(Ordering::Relaxed),
            cache_writes: self.cache_writes.load(Ordering::Relaxed),
            snapshot_writes: self.snapshot_writes.load(Ordering::Relaxed),
        }
    }

    /// Emits the counters as one structured log line.
    pub fn log_summary(&self) {
        let snapshot = self.snapshot();
        tracing::info!(
            target: "proposal_sync::metrics",
            pages_fetched = snapshot.pages_fetched,
            records_fetched = snapshot.records_fetched,
            names_found = snapshot.names_found,
            names_empty = snapshot.names_empty,
            names_failed = snapshot.names_failed,
            cache_writes = snapshot.cache_writes,
            snapshot_writes = snapshot.snapshot_writes,
            "run metrics"
        );
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct TelemetrySnapshot {
    pub pages_fetched: u64,
    pub records_fetched: u64,
    pub names_found: u64,
    pub names_empty: u64,
    pub names_failed: u64,
    pub cache_writes: u64,
    pub snapshot_writes: u64,
}
