//! Typed GraphQL request/response shapes for the proposals indexer.
//!
//! Pagination arguments travel as GraphQL variables, so the query document is
//! a constant and nothing is spliced into it.

use crate::rpc::graphql::UpstreamError;
use serde::{Deserialize, Serialize};

pub const PROPOSALS_QUERY: &str = "query Proposals($first: Int!, $skip: Int!) {
  proposals(orderBy: id, orderDirection: asc, first: $first, skip: $skip) {
    id
    title
    status
    proposer {
      id
    }
  }
}";

/// One offset/limit window over the upstream proposal list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub first: usize,
    pub skip: usize,
}

impl PageRequest {
    pub fn first_page(page_size: usize) -> Self {
        Self {
            first: page_size,
            skip: 0,
        }
    }

    pub fn next(self) -> Self {
        Self {
            first: self.first,
            skip: self.skip.saturating_add(self.first),
        }
    }

    /// A page shorter than requested is the last one.
    pub fn is_last(&self, returned: usize) -> bool {
        returned < self.first
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GraphQlRequest {
    query: &'static str,
    variables: PageRequest,
}

impl GraphQlRequest {
    pub fn proposals(page: PageRequest) -> Self {
        Self {
            query: PROPOSALS_QUERY,
            variables: page,
        }
    }

    pub fn page(&self) -> PageRequest {
        self.variables
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RawProposal {
    pub id: String,
    pub title: String,
    pub status: String,
    pub proposer: RawProposer,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RawProposer {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GraphQlResponse {
    #[serde(default)]
    data: Option<ProposalsData>,
    #[serde(default)]
    errors: Vec<GraphQlErrorEntry>,
}

#[derive(Debug, Deserialize)]
struct ProposalsData {
    #[serde(default)]
    proposals: Option<Vec<RawProposal>>,
}

#[derive(Debug, Deserialize)]
struct GraphQlErrorEntry {
    #[serde(default)]
    message: String,
}

impl GraphQlResponse {
    /// Extracts the page. A response without `data` is an empty page; any
    /// GraphQL error is surfaced rather than read as end-of-list.
    pub(crate) fn into_proposals(self) -> Result<Vec<RawProposal>, UpstreamError> {
        if !self.errors.is_empty() {
            return Err(UpstreamError::GraphQl {
                messages: self.errors.into_iter().map(|err| err.message).collect(),
            });
        }
        Ok(self
            .data
            .and_then(|data| data.proposals)
            .unwrap_or_default())
    }
}
