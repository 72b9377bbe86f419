//! Whole-document JSON persistence for the proposals snapshot and the ENS
//! name cache, plus the serde models stored in those files.

pub mod cache;
pub mod document;
pub mod fs;
pub mod memory;
pub mod snapshot;

pub use cache::NameCache;
pub use document::{load_json, save_json, DocumentStore, StoreError};
pub use fs::FileStore;
pub use memory::MemoryStore;
pub use snapshot::{sort_by_numeric_id, Proposal, Proposer, ProposerIndex, Snapshot, SnapshotData};
