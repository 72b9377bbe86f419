use std::sync::{Arc, Mutex};

use crate::support::{
    helpers::init_tracing,
    server::{JsonHandler, MockHttpServer},
};
use anyhow::Result;
use hyper::StatusCode;
use proposal_sync::ens::{HttpGateway, OffchainGateway};
use proposal_sync::rpc::RpcClientOptions;
use proposal_sync::Address;
use serde_json::{json, Value};

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn gateway_posts_sender_and_calldata() -> Result<()> {
    init_tracing();
    let seen: Arc<Mutex<Vec<Value>>> = Arc::default();
    let recorded = seen.clone();
    let handler: JsonHandler = Arc::new(move |payload| {
        recorded.lock().expect("requests poisoned").push(payload);
        (StatusCode::OK, json!({ "data": "0xcafe01" }))
    });
    let server = MockHttpServer::start(handler).await?;

    let gateway = HttpGateway::with_options(RpcClientOptions::default())?;
    let sender = Address::from_bytes([0x44; 20]);
    let response = gateway
        .fetch(&format!("{}/lookup/{{sender}}", server.url()), sender, &[0x90, 0x61])
        .await?;
    assert_eq!(response, vec![0xca, 0xfe, 0x01]);

    let requests = seen.lock().expect("requests poisoned").clone();
    assert_eq!(
        requests,
        vec![json!({
            "data": "0x9061",
            "sender": sender.to_string(),
        })]
    );

    server.shutdown().await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn gateway_errors_are_reported() -> Result<()> {
    init_tracing();
    let handler: JsonHandler =
        Arc::new(|_| (StatusCode::NOT_FOUND, json!({ "message": "no record" })));
    let server = MockHttpServer::start(handler).await?;
    let gateway: Arc<dyn OffchainGateway> =
        Arc::new(HttpGateway::with_options(RpcClientOptions::default())?);
    let sender = Address::from_bytes([0x44; 20]);

    let status = gateway
        .fetch(&format!("{}/lookup", server.url()), sender, &[0x01])
        .await
        .expect_err("404 must fail");
    assert!(status.to_string().contains("HTTP 404"), "{status:#}");

    // The mock only accepts POST, so a `{data}` template (sent as GET) is refused.
    let refused = gateway
        .fetch(&format!("{}/{{sender}}/{{data}}.json", server.url()), sender, &[0x01])
        .await
        .expect_err("GET must be refused");
    assert!(refused.to_string().contains("HTTP 405"), "{refused:#}");

    server.shutdown().await;
    Ok(())
}
