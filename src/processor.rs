//! The three sync stages: fetching proposals, resolving proposer names into
//! the cache, and applying cached names to the snapshot.

pub mod applier;
pub mod checkpoint;
pub mod fetcher;
pub mod updater;
