pub mod ens;
pub mod processor;
pub mod rpc;
pub mod runtime;
pub mod store;

pub use ens::{Address, EnsResolver, NameResolver};
pub use processor::applier::{ApplyReport, CacheApplier};
pub use processor::fetcher::{FetchReport, ProposalFetcher};
pub use processor::updater::{NameCacheUpdater, UpdateReport};
pub use rpc::{EthRpcClient, GraphQlClient, ProposalSource, RpcError, UpstreamError};
pub use runtime::config::{SyncConfig, SyncConfigBuilder, SyncConfigParams};
pub use runtime::runner::Runner;
pub use runtime::stage::{Interrupted, StageError, StageFuture, StageKind, SyncStage};
pub use runtime::telemetry::{init_tracing, Telemetry, TelemetrySnapshot};
pub use store::{DocumentStore, FileStore, MemoryStore, NameCache, Proposal, Snapshot, StoreError};
