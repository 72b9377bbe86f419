//! Serde model of `proposals.json`: `{ "data": { "proposals": [...] } }`.
//!
//! Fields the pipeline does not understand are carried through `extra` at
//! every level so a rewrite never drops data that another tool added to the
//! file.

use crate::rpc::query::RawProposal;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::HashSet;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub data: SnapshotData,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotData {
    pub proposals: Vec<Proposal>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Proposal {
    pub id: String,
    pub title: String,
    pub status: String,
    pub proposer: Proposer,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Proposer {
    pub id: String,
    /// `None` when the key is absent, `Some(None)` for an explicit `null`.
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub ens: Option<Option<String>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn present<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Option<String>>, D::Error> {
    Option::<String>::deserialize(deserializer).map(Some)
}

/// Proposer ids read from a snapshot without requiring the full schema. A
/// missing or null `data` or `data.proposals` reads as no proposals.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProposerIndex {
    #[serde(default)]
    data: Option<IndexData>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct IndexData {
    #[serde(default)]
    proposals: Option<Vec<IndexProposal>>,
}

#[derive(Debug, Clone, Deserialize)]
struct IndexProposal {
    proposer: IndexProposer,
}

#[derive(Debug, Clone, Deserialize)]
struct IndexProposer {
    id: String,
}

impl ProposerIndex {
    pub fn len(&self) -> usize {
        self.proposals().len()
    }

    pub fn is_empty(&self) -> bool {
        self.proposals().is_empty()
    }

    /// Distinct proposer addresses in order of first appearance.
    pub fn distinct_proposers(&self) -> Vec<&str> {
        first_seen(self.proposals().iter().map(|proposal| proposal.proposer.id.as_str()))
    }

    fn proposals(&self) -> &[IndexProposal] {
        self.data
            .as_ref()
            .and_then(|data| data.proposals.as_deref())
            .unwrap_or_default()
    }
}

fn first_seen<'a>(addresses: impl Iterator<Item = &'a str>) -> Vec<&'a str> {
    let mut seen = HashSet::new();
    addresses.filter(|address| seen.insert(*address)).collect()
}

impl Snapshot {
    pub fn new(proposals: Vec<Proposal>) -> Self {
        Self {
            data: SnapshotData {
                proposals,
                extra: Map::new(),
            },
            extra: Map::new(),
        }
    }

    pub fn proposals(&self) -> &[Proposal] {
        &self.data.proposals
    }

    pub fn proposals_mut(&mut self) -> &mut [Proposal] {
        &mut self.data.proposals
    }

    pub fn len(&self) -> usize {
        self.data.proposals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.proposals.is_empty()
    }

    /// Proposals whose proposer currently carries a non-empty name.
    pub fn named_count(&self) -> usize {
        self.data
            .proposals
            .iter()
            .filter(|proposal| proposal.has_name())
            .count()
    }

    /// Distinct proposer addresses in order of first appearance.
    pub fn distinct_proposers(&self) -> Vec<&str> {
        first_seen(
            self.data
                .proposals
                .iter()
                .map(|proposal| proposal.proposer.id.as_str()),
        )
    }
}

impl Proposal {
    pub fn from_upstream(raw: RawProposal, ens: Option<String>) -> Self {
        Self {
            id: raw.id,
            title: raw.title,
            status: raw.status,
            proposer: Proposer {
                id: raw.proposer.id,
                ens: Some(ens),
                extra: Map::new(),
            },
            extra: Map::new(),
        }
    }

    pub fn has_name(&self) -> bool {
        self.proposer.name().is_some_and(|name| !name.is_empty())
    }

    fn numeric_id(&self) -> Option<u128> {
        self.id.trim().parse().ok()
    }
}

impl Proposer {
    pub fn name(&self) -> Option<&str> {
        self.ens.as_ref()?.as_deref()
    }

    /// The `ens` value as stored: `None` when the key is absent.
    pub fn ens_entry(&self) -> Option<Option<&str>> {
        self.ens.as_ref().map(Option::as_deref)
    }

    pub fn set_ens(&mut self, name: Option<String>) {
        self.ens = Some(name);
    }
}

/// Sorts ascending by the integer value of `id`. Ids that are not integers
/// sort after all numeric ids, ordered lexicographically among themselves.
pub fn sort_by_numeric_id(proposals: &mut [Proposal]) {
    proposals.sort_by(|a, b| match (a.numeric_id(), b.numeric_id()) {
        (Some(left), Some(right)) => left.cmp(&right),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.id.cmp(&b.id),
    });
}
