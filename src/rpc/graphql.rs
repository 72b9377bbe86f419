//! HTTP client for the GraphQL proposals indexer and the `ProposalSource`
//! trait the fetcher pages through.

use crate::rpc::options::RpcClientOptions;
use crate::rpc::query::{GraphQlRequest, GraphQlResponse, PageRequest, RawProposal};
use crate::runtime::config::SyncConfig;
use anyhow::{anyhow, Context, Result};
use futures::future::BoxFuture;
use reqwest::Client;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug)]
pub enum UpstreamError {
    Timeout { skip: usize },
    Status { status: u16, body: String },
    GraphQl { messages: Vec<String> },
}

impl fmt::Display for UpstreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpstreamError::Timeout { skip } => {
                write!(f, "proposals request at offset {skip} timed out")
            }
            UpstreamError::Status { status, body } => {
                write!(f, "HTTP error! status: {status}")?;
                if !body.is_empty() {
                    write!(f, " ({body})")?;
                }
                Ok(())
            }
            UpstreamError::GraphQl { messages } => {
                write!(f, "upstream returned GraphQL errors: {}", messages.join("; "))
            }
        }
    }
}

impl std::error::Error for UpstreamError {}

/// Anything that can serve one page of proposals.
pub trait ProposalSource: Send + Sync {
    fn fetch_page<'a>(&'a self, page: PageRequest) -> BoxFuture<'a, Result<Vec<RawProposal>>>;
}

impl<S: ProposalSource + ?Sized> ProposalSource for Arc<S> {
    fn fetch_page<'a>(&'a self, page: PageRequest) -> BoxFuture<'a, Result<Vec<RawProposal>>> {
        (**self).fetch_page(page)
    }
}

#[derive(Debug, Clone)]
pub struct GraphQlClient {
    endpoint: Arc<String>,
    client: Client,
}

impl ProposalSource for GraphQlClient {
    fn fetch_page<'a>(&'a self, page: PageRequest) -> BoxFuture<'a, Result<Vec<RawProposal>>> {
        Box::pin(self.fetch_page(page))
    }
}

impl GraphQlClient {
    pub fn new(endpoint: impl Into<String>) -> Result<Self> {
        Self::with_options(endpoint, RpcClientOptions::default())
    }

    pub fn with_options(endpoint: impl Into<String>, options: RpcClientOptions) -> Result<Self> {
        options.validate()?;

        let client = Client::builder()
            .timeout(options.request_timeout)
            .connect_timeout(options.connect_timeout)
            .build()
            .map_err(|err| anyhow!("failed to build GraphQL client: {err}"))?;

        Ok(Self {
            endpoint: Arc::new(endpoint.into()),
            client,
        })
    }

    pub fn from_config(config: &SyncConfig) -> Result<Self> {
        Self::with_options(
            config.graphql_endpoint().to_owned(),
            RpcClientOptions::from_config(config),
        )
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub async fn fetch_page(&self, page: PageRequest) -> Result<Vec<RawProposal>> {
        let request = GraphQlRequest::proposals(page);
        let start = Instant::now();

        let response = self
            .client
            .post(self.endpoint.as_str())
            .json(&request)
            .send()
            .await
            .map_err(|err| map_transport_error(page, err))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            }
            .into());
        }

        let payload: GraphQlResponse = response
            .json()
            .await
            .map_err(|err| map_transport_error(page, err))
            .with_context(|| format!("malformed proposals response at offset {}", page.skip))?;
        let proposals = payload.into_proposals()?;

        tracing::debug!(
            skip = page.skip,
            first = page.first,
            returned = proposals.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "proposals page received"
        );

        Ok(proposals)
    }
}

fn map_transport_error(page: PageRequest, err: reqwest::Error) -> anyhow::Error {
    if err.is_timeout() {
        return UpstreamError::Timeout { skip: page.skip }.into();
    }
    anyhow!(err).context(format!("proposals request at offset {} failed", page.skip))
}
