// crates/config-gateway-registry/tests/common/mod.rs
// ============================================================================
// Module: Registry Test Servers
// Description: In-memory Consul and secret-store fakes on tiny_http.
// Purpose: Exercise the blocking HTTP clients against real sockets.
// Dependencies: base64, serde_json, tiny_http
// ============================================================================

//! ## Overview
//! [`FakeConsul`] implements the subset of the Consul HTTP API the registry
//! client uses: leader status, key/value GET (`keys`, `recurse`) and `/v1/txn`
//! with `set`, `delete` and `delete-tree`. Transactions apply all-or-nothing
//! and are capped at 64 operations. Every request is recorded with its ACL
//! header.

#![allow(dead_code, reason = "Shared test helpers may be unused in some cases.")]
#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only helpers."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use config_gateway_core::AccessToken;
use config_gateway_core::RegistryAddress;
use config_gateway_core::RegistryClientConfig;
use serde_json::Value;
use serde_json::json;
use tiny_http::Header;
use tiny_http::Method;
use tiny_http::Request;
use tiny_http::Response;
use tiny_http::Server;

// ============================================================================
// SECTION: Fake Consul
// ============================================================================

/// Request observed by a fake server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recorded {
    /// HTTP method.
    pub method: String,
    /// Raw request URL (path and query).
    pub url: String,
    /// Value of the token header, if any.
    pub token: Option<String>,
}

/// Shared fake Consul state.
#[derive(Debug, Default)]
pub struct ConsulState {
    /// Stored keys and raw values.
    pub kv: Mutex<BTreeMap<String, String>>,
    /// Requests observed.
    pub requests: Mutex<Vec<Recorded>>,
    /// Leader string reported by `/v1/status/leader`.
    pub leader: Mutex<String>,
    /// Status forced on every PUT when set.
    pub put_status: Mutex<Option<u16>>,
    /// Key whose `set` makes its transaction roll back.
    pub fail_key: Mutex<Option<String>>,
    /// Operation counts of the transactions received.
    pub txn_sizes: Mutex<Vec<usize>>,
}

/// Running fake Consul agent.
pub struct FakeConsul {
    /// Bound host.
    pub host: String,
    /// Bound port.
    pub port: u16,
    /// Shared state.
    pub state: Arc<ConsulState>,
}

impl FakeConsul {
    /// Starts a fake agent that reports a leader.
    pub fn start() -> Self {
        let server = Server::http("127.0.0.1:0").unwrap();
        let addr = server.server_addr().to_ip().unwrap();
        let state = Arc::new(ConsulState::default());
        *state.leader.lock().unwrap() = "127.0.0.1:8300".to_string();
        let shared = Arc::clone(&state);
        thread::spawn(move || {
            for request in server.incoming_requests() {
                handle(&shared, request);
            }
        });
        Self {
            host: addr.ip().to_string(),
            port: addr.port(),
            state,
        }
    }

    /// Seeds a raw key/value pair.
    pub fn seed(&self, key: &str, value: &str) {
        self.state.kv.lock().unwrap().insert(key.to_string(), value.to_string());
    }

    /// Returns a snapshot of the stored keys and values.
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.state.kv.lock().unwrap().clone()
    }

    /// Returns the recorded requests.
    pub fn requests(&self) -> Vec<Recorded> {
        self.state.requests.lock().unwrap().clone()
    }

    /// Builds a client configuration for `base_path`.
    pub fn client_config(&self, base_path: &str, token: &str) -> RegistryClientConfig {
        RegistryClientConfig {
            address: RegistryAddress {
                host: self.host.clone(),
                port: self.port,
                registry_type: "consul".to_string(),
                base_path: base_path.to_string(),
            },
            access_token: AccessToken::new(token),
        }
    }
}

/// Serves one request against the shared state.
fn handle(state: &ConsulState, request: Request) {
    let raw_url = request.url().to_string();
    let token = header_value(&request, "X-Consul-Token");
    state.requests.lock().unwrap().push(Recorded {
        method: request.method().to_string(),
        url: raw_url.clone(),
        token,
    });
    let (path, query) = raw_url.split_once('?').unwrap_or((raw_url.as_str(), ""));
    if path == "/v1/status/leader" {
        let leader = state.leader.lock().unwrap().clone();
        respond_json(request, 200, &json!(leader));
        return;
    }
    if path == "/v1/txn" && *request.method() == Method::Put {
        handle_txn(state, request);
        return;
    }
    let Some(key) = path.strip_prefix("/v1/kv/") else {
        respond_text(request, 404, "");
        return;
    };
    let key = key.replace("%20", " ");
    let recurse = query.split('&').any(|part| part.starts_with("recurse"));
    let keys_only = query.split('&').any(|part| part.starts_with("keys"));
    if *request.method() != Method::Get {
        respond_text(request, 405, "");
        return;
    }
    let kv = state.kv.lock().unwrap();
    let matched: Vec<(&String, &String)> = kv
        .iter()
        .filter(|(stored, _)| {
            if recurse || keys_only { stored.starts_with(&key) } else { **stored == key }
        })
        .collect();
    if matched.is_empty() {
        drop(kv);
        respond_text(request, 404, "");
        return;
    }
    let body = if keys_only {
        Value::Array(matched.iter().map(|(stored, _)| json!(stored)).collect())
    } else {
        Value::Array(
            matched
                .iter()
                .map(|(stored, value)| {
                    let encoded = if stored.ends_with('/') {
                        Value::Null
                    } else {
                        json!(STANDARD.encode(value.as_bytes()))
                    };
                    json!({"Key": stored, "Value": encoded, "Flags": 0})
                })
                .collect(),
        )
    };
    drop(kv);
    respond_json(request, 200, &body);
}

/// Applies a transaction to a copy of the store and commits it on success.
fn handle_txn(state: &ConsulState, mut request: Request) {
    if let Some(status) = *state.put_status.lock().unwrap() {
        respond_text(request, status, "rejected");
        return;
    }
    let mut body = String::new();
    request.as_reader().read_to_string(&mut body).unwrap();
    let operations: Vec<Value> = serde_json::from_str(&body).unwrap();
    state.txn_sizes.lock().unwrap().push(operations.len());
    if operations.len() > 64 {
        respond_text(request, 413, "Transaction contains too many operations");
        return;
    }
    let fail_key = state.fail_key.lock().unwrap().clone();
    let mut kv = state.kv.lock().unwrap();
    let mut staged = kv.clone();
    for (index, operation) in operations.iter().enumerate() {
        let op = &operation["KV"];
        let key = op["Key"].as_str().unwrap().to_string();
        match op["Verb"].as_str().unwrap() {
            "set" => {
                if fail_key.as_deref() == Some(key.as_str()) {
                    drop(kv);
                    let errors = json!({
                        "Results": null,
                        "Errors": [{"OpIndex": index, "What": "failed to set key"}],
                    });
                    respond_json(request, 409, &errors);
                    return;
                }
                let encoded = op["Value"].as_str().unwrap_or_default();
                let value = String::from_utf8(STANDARD.decode(encoded).unwrap()).unwrap();
                staged.insert(key, value);
            }
            "delete" => {
                staged.remove(&key);
            }
            "delete-tree" => staged.retain(|stored, _| !stored.starts_with(&key)),
            verb => panic!("unsupported txn verb {verb}"),
        }
    }
    *kv = staged;
    drop(kv);
    respond_json(request, 200, &json!({"Results": [], "Errors": null}));
}

// ============================================================================
// SECTION: Fake Secret Store
// ============================================================================

/// Spawns a secret store answering one request with `status` and `body`.
///
/// Returns the base URL and a handle yielding the recorded request.
pub fn spawn_secret_store(
    status: u16,
    body: &'static str,
) -> (String, thread::JoinHandle<Option<Recorded>>) {
    let server = Server::http("127.0.0.1:0").unwrap();
    let addr = server.server_addr().to_ip().unwrap();
    let url = format!("http://{addr}");
    let handle = thread::spawn(move || {
        let request = server.recv_timeout(Duration::from_secs(5)).ok().flatten()?;
        let recorded = Recorded {
            method: request.method().to_string(),
            url: request.url().to_string(),
            token: header_value(&request, "X-Vault-Token"),
        };
        respond_text(request, status, body);
        Some(recorded)
    });
    (url, handle)
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns a header value by case-insensitive name.
fn header_value(request: &Request, name: &'static str) -> Option<String> {
    request
        .headers()
        .iter()
        .find(|header| header.field.equiv(name))
        .map(|header| header.value.as_str().to_string())
}

/// Responds with a JSON body.
fn respond_json(request: Request, status: u16, body: &Value) {
    let header = Header::from_bytes("Content-Type", "application/json").unwrap();
    let response =
        Response::from_string(body.to_string()).with_status_code(status).with_header(header);
    let _ = request.respond(response);
}

/// Responds with a text body.
fn respond_text(request: Request, status: u16, body: &str) {
    let _ = request.respond(Response::from_string(body).with_status_code(status));
}
