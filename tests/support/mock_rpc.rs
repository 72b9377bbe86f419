use std::{
    collections::{HashMap, HashSet},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, RwLock,
    },
};

use anyhow::Result;
use hyper::StatusCode;
use proposal_sync::ens::{namehash, reverse_name, Address, Node, ENS_REGISTRY};
use serde_json::{json, Value};

use super::server::{JsonHandler, MockHttpServer};

const RESOLVER_SELECTOR: &str = "0178b8bf";
const NAME_SELECTOR: &str = "691f3431";
const ADDR_SELECTOR: &str = "3b3b57de";

/// A single public resolver answering both reverse and forward records.
pub const RESOLVER: Address = Address::from_bytes([0x42; 20]);

/// Ethereum node stand-in that implements just enough of the ENS registry and
/// a public resolver to answer `eth_call`.
#[derive(Clone, Default)]
pub struct MockEns {
    inner: Arc<RwLock<MockEnsInner>>,
    calls: Arc<AtomicUsize>,
}

#[derive(Default)]
struct MockEnsInner {
    resolvers: HashMap<Node, Address>,
    names: HashMap<Node, String>,
    addrs: HashMap<Node, Address>,
    reverting: HashSet<Node>,
}

impl MockEns {
    /// Registers `name` as the verified primary name of `address`.
    pub fn register(&self, address: &str, name: &str) {
        let address: Address = address.parse().expect("valid test address");
        let reverse = namehash(&reverse_name(&address));
        let forward = namehash(name);
        let mut inner = self.inner.write().expect("mock ens poisoned");
        inner.resolvers.insert(reverse, RESOLVER);
        inner.names.insert(reverse, name.to_owned());
        inner.resolvers.insert(forward, RESOLVER);
        inner.addrs.insert(forward, address);
    }

    /// Makes every lookup for `address` fail with an execution error.
    pub fn revert_for(&self, address: &str) {
        let address: Address = address.parse().expect("valid test address");
        let reverse = namehash(&reverse_name(&address));
        self.inner
            .write()
            .expect("mock ens poisoned")
            .reverting
            .insert(reverse);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub async fn serve(&self) -> Result<MockHttpServer> {
        let ens = self.clone();
        let handler: JsonHandler = Arc::new(move |payload| (StatusCode::OK, ens.handle(payload)));
        MockHttpServer::start(handler).await
    }

    fn handle(&self, call: Value) -> Value {
        let id = call.get("id").cloned().unwrap_or(Value::Null);
        let method = call
            .get("method")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        if method != "eth_call" {
            return error(id, -32601, format!("unknown method {method}"));
        }
        self.calls.fetch_add(1, Ordering::SeqCst);

        let request = &call["params"][0];
        let to = request["to"].as_str().and_then(|to| to.parse::<Address>().ok());
        let data = request["data"]
            .as_str()
            .and_then(|data| data.strip_prefix("0x"))
            .and_then(|data| hex::decode(data).ok());
        let (Some(to), Some(data)) = (to, data) else {
            return error(id, -32602, "invalid eth_call params");
        };
        if data.len() != 36 {
            return error(id, 3, "execution reverted");
        }

        let selector = hex::encode(&data[..4]);
        let mut node = [0u8; 32];
        node.copy_from_slice(&data[4..]);

        let inner = self.inner.read().expect("mock ens poisoned");
        if inner.reverting.contains(&node) {
            return error(id, 3, "execution reverted");
        }

        let registry: Address = ENS_REGISTRY.parse().expect("registry constant parses");
        let output = match selector.as_str() {
            RESOLVER_SELECTOR if to == registry => {
                address_word(inner.resolvers.get(&node).copied().unwrap_or(Address::ZERO))
            }
            NAME_SELECTOR if to == RESOLVER => {
                string_words(inner.names.get(&node).map(String::as_str).unwrap_or(""))
            }
            ADDR_SELECTOR if to == RESOLVER => {
                address_word(inner.addrs.get(&node).copied().unwrap_or(Address::ZERO))
            }
            _ => return error(id, 3, "execution reverted"),
        };

        success(id, Value::String(format!("0x{}", hex::encode(output))))
    }
}

fn address_word(address: Address) -> Vec<u8> {
    let mut out = vec![0u8; 12];
    out.extend_from_slice(address.as_bytes());
    out
}

fn string_words(value: &str) -> Vec<u8> {
    let mut out = word(32);
    out.extend(word(value.len() as u64));
    let mut data = value.as_bytes().to_vec();
    data.resize(value.len().div_ceil(32) * 32, 0);
    out.extend(data);
    out
}

fn word(value: u64) -> Vec<u8> {
    let mut out = vec![0u8; 24];
    out.extend_from_slice(&value.to_be_bytes());
    out
}

fn success(id: Value, result: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "result": result,
        "id": id,
    })
}

fn error(id: Value, code: i64, message: impl Into<String>) -> Value {
    json!({
        "jsonrpc": "2.0",
        "error": {
            "code": code,
            "message": message.into(),
        },
        "id": id,
    })
}
