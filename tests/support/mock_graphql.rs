use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};

use anyhow::Result;
use hyper::StatusCode;
use serde_json::{json, Value};

use super::server::{JsonHandler, MockHttpServer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    /// Respond with this HTTP status from the given offset onwards.
    Status { from_skip: usize, status: u16 },
    /// Respond with a GraphQL `errors` payload from the given offset onwards.
    Errors { from_skip: usize },
}

/// Indexer stand-in serving proposals ordered by id as strings, the way a
/// subgraph sorts `ID` fields.
#[derive(Clone)]
pub struct MockIndexer {
    proposals: Arc<Vec<Value>>,
    requests: Arc<AtomicUsize>,
    failure: Arc<Mutex<Option<Failure>>>,
}

impl MockIndexer {
    /// `proposer_for` picks the proposer address of proposal `id`.
    pub fn new(total: u64, proposer_for: impl Fn(u64) -> String) -> Self {
        let mut ids: Vec<u64> = (1..=total).collect();
        ids.sort_by_key(|id| id.to_string());
        let proposals = ids
            .into_iter()
            .map(|id| {
                json!({
                    "id": id.to_string(),
                    "title": format!("Proposal {id}"),
                    "status": if id % 3 == 0 { "DEFEATED" } else { "EXECUTED" },
                    "proposer": { "id": proposer_for(id) },
                })
            })
            .collect();

        Self {
            proposals: Arc::new(proposals),
            requests: Arc::new(AtomicUsize::new(0)),
            failure: Arc::new(Mutex::new(None)),
        }
    }

    pub fn fail_with(&self, failure: Failure) {
        *self.failure.lock().expect("mock indexer poisoned") = Some(failure);
    }

    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    pub async fn serve(&self) -> Result<MockHttpServer> {
        let indexer = self.clone();
        let handler: JsonHandler = Arc::new(move |payload| indexer.handle(payload));
        MockHttpServer::start(handler).await
    }

    fn handle(&self, payload: Value) -> (StatusCode, Value) {
        self.requests.fetch_add(1, Ordering::SeqCst);

        let variables = &payload["variables"];
        let (Some(first), Some(skip)) = (variables["first"].as_u64(), variables["skip"].as_u64())
        else {
            return (
                StatusCode::BAD_REQUEST,
                json!({ "errors": [{ "message": "missing pagination variables" }] }),
            );
        };
        let (first, skip) = (first as usize, skip as usize);

        match *self.failure.lock().expect("mock indexer poisoned") {
            Some(Failure::Status { from_skip, status }) if skip >= from_skip => {
                let status = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY);
                return (status, json!({ "error": "upstream unavailable" }));
            }
            Some(Failure::Errors { from_skip }) if skip >= from_skip => {
                return (
                    StatusCode::OK,
                    json!({ "data": null, "errors": [{ "message": "indexer is syncing" }] }),
                );
            }
            _ => {}
        }

        let page: Vec<Value> = self.proposals.iter().skip(skip).take(first).cloned().collect();
        (StatusCode::OK, json!({ "data": { "proposals": page } }))
    }
}
