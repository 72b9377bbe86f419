//! The persistent address -> ENS name mapping (`ens-cache.json`).
//!
//! A key mapped to `null` records a lookup that produced no name. Presence of
//! the key, not its value, decides whether an address is already resolved.

use crate::store::document::{load_json, DocumentStore, StoreError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NameCache {
    entries: BTreeMap<String, Option<String>>,
}

impl NameCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a cache the caller cannot proceed without.
    pub fn load<S: DocumentStore + ?Sized>(store: &S, path: &Path) -> Result<Self, StoreError> {
        load_json(store, path)
    }

    /// Loads an optional cache, falling back to an empty one when the file is
    /// absent or unreadable.
    pub fn load_or_default<S: DocumentStore + ?Sized>(store: &S, path: &Path) -> Self {
        match Self::load(store, path) {
            Ok(cache) => {
                tracing::info!(
                    path = %path.display(),
                    entries = cache.len(),
                    "loaded cached ENS names"
                );
                cache
            }
            Err(err) if err.is_missing() => {
                tracing::info!(
                    path = %path.display(),
                    "no ENS cache found; run update-ens-cache to resolve ENS names"
                );
                Self::new()
            }
            Err(err) => {
                tracing::warn!(error = %err, "could not load ENS cache; starting from an empty cache");
                Self::new()
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, address: &str) -> bool {
        self.entries.contains_key(address)
    }

    /// `None` means the address was never looked up; `Some(None)` means it
    /// was looked up and has no name.
    pub fn entry(&self, address: &str) -> Option<Option<&str>> {
        self.entries.get(address).map(Option::as_deref)
    }

    /// The cached name for `address`, treating empty strings as no name.
    pub fn name_for(&self, address: &str) -> Option<&str> {
        self.entry(address)
            .flatten()
            .filter(|name| !name.is_empty())
    }

    /// Records a lookup result. Existing entries are never overwritten;
    /// returns `false` when `address` was already present.
    pub fn record(&mut self, address: impl Into<String>, name: Option<String>) -> bool {
        let address = address.into();
        if self.entries.contains_key(&address) {
            return false;
        }
        self.entries.insert(address, name);
        true
    }

    /// Entries carrying a non-empty name.
    pub fn resolved_count(&self) -> usize {
        self.entries
            .values()
            .filter(|name| name.as_deref().is_some_and(|name| !name.is_empty()))
            .count()
    }

    /// Addresses from `addresses` with no entry yet, preserving input order.
    pub fn missing<'a, I>(&self, addresses: I) -> Vec<&'a str>
    where
        I: IntoIterator<Item = &'a str>,
    {
        addresses
            .into_iter()
            .filter(|address| !self.contains(address))
            .collect()
    }
}
