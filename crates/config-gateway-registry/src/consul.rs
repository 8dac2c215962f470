// crates/config-gateway-registry/src/consul.rs
// ============================================================================
// Module: Consul Registry Client
// Description: Registry client backed by the Consul key/value HTTP API.
// Purpose: Read and replace one service's configuration subtree in Consul.
// Dependencies: config-gateway-core, base64, reqwest, serde, serde_json
// ============================================================================

//! ## Overview
//! [`ConsulClientFactory`] builds one [`ConsulRegistryClient`] per request,
//! bound to `http://<host>:<port>` and the service base path. Every call
//! carries the access token as `X-Consul-Token` when one was issued.
//!
//! Keys are matched exactly on the base path or beneath `<base>/`, so a
//! service whose name extends another's (`device-mqtt` and `device-mqtt-2`)
//! never sees its neighbour's keys. Base paths containing `.` or `..`
//! segments are refused before any request is built.
//!
//! Writes go through `/v1/txn`. An overwrite that fits in one transaction
//! deletes the old subtree and sets every new key atomically. Larger trees
//! are written first and stale keys are pruned afterwards, so a failed write
//! never leaves the service without its previous keys.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use config_gateway_core::AccessToken;
use config_gateway_core::ConfigurationTree;
use config_gateway_core::RegistryClient;
use config_gateway_core::RegistryClientConfig;
use config_gateway_core::RegistryClientFactory;
use config_gateway_core::RegistryError;
use reqwest::Method;
use reqwest::StatusCode;
use reqwest::Url;
use reqwest::blocking::Client;
use reqwest::blocking::Response;
use serde::Deserialize;
use serde::Serialize;
use serde::de::DeserializeOwned;
use toml::Value as TomlValue;

use crate::codec::FlatEntry;
use crate::codec::build_value;
use crate::codec::flatten_table;
use crate::codec::is_within;
use crate::http::DEFAULT_MAX_RESPONSE_BYTES;
use crate::http::build_client;
use crate::http::read_response_limited;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Registry type name served by this client.
pub const CONSUL_REGISTRY_TYPE: &str = "consul";
/// Header carrying the Consul ACL token.
const CONSUL_TOKEN_HEADER: &str = "X-Consul-Token";
/// Maximum operations Consul accepts in one transaction.
pub const MAX_TXN_OPERATIONS: usize = 64;

// ============================================================================
// SECTION: Factory
// ============================================================================

/// Builds Consul clients for resolved service addresses.
#[derive(Debug, Clone)]
pub struct ConsulClientFactory {
    /// Timeout applied to every registry call.
    timeout: Duration,
    /// Maximum registry response size in bytes.
    max_response_bytes: usize,
}

impl ConsulClientFactory {
    /// Creates a factory with the given per-call timeout.
    #[must_use]
    pub const fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            max_response_bytes: DEFAULT_MAX_RESPONSE_BYTES,
        }
    }

    /// Overrides the maximum registry response size.
    #[must_use]
    pub const fn with_max_response_bytes(mut self, max_response_bytes: usize) -> Self {
        self.max_response_bytes = max_response_bytes;
        self
    }
}

impl RegistryClientFactory for ConsulClientFactory {
    fn create(
        &self,
        config: &RegistryClientConfig,
    ) -> Result<Box<dyn RegistryClient>, RegistryError> {
        if config.address.registry_type != CONSUL_REGISTRY_TYPE {
            return Err(RegistryError::Client(format!(
                "unsupported registry type: {}",
                config.address.registry_type
            )));
        }
        let client = ConsulRegistryClient::new(config, self.timeout, self.max_response_bytes)?;
        Ok(Box::new(client))
    }
}

// ============================================================================
// SECTION: Client
// ============================================================================

/// Consul key/value entry as returned by `?recurse`.
#[derive(Debug, Deserialize)]
struct KvEntry {
    /// Full key.
    #[serde(rename = "Key")]
    key: String,
    /// Base64 value; null for folder keys.
    #[serde(rename = "Value", default)]
    value: Option<String>,
}

/// One key/value operation inside a `/v1/txn` request.
#[derive(Debug, Serialize)]
struct TxnOperation {
    /// Key/value operation body.
    #[serde(rename = "KV")]
    kv: TxnKv,
}

/// Key/value verb, key and optional base64 value.
#[derive(Debug, Serialize)]
struct TxnKv {
    /// Consul verb (`set`, `delete`, `delete-tree`).
    #[serde(rename = "Verb")]
    verb: &'static str,
    /// Target key.
    #[serde(rename = "Key")]
    key: String,
    /// Base64 value for `set`.
    #[serde(rename = "Value", skip_serializing_if = "Option::is_none")]
    value: Option<String>,
}

impl TxnOperation {
    /// Sets `key` to `value`.
    fn set(entry: &FlatEntry) -> Self {
        Self::kv("set", entry.key.clone(), Some(STANDARD.encode(entry.value.as_bytes())))
    }

    /// Deletes exactly `key`.
    const fn delete(key: String) -> Self {
        Self::kv("delete", key, None)
    }

    /// Deletes every key starting with `prefix`.
    const fn delete_tree(prefix: String) -> Self {
        Self::kv("delete-tree", prefix, None)
    }

    /// Builds a key/value operation.
    const fn kv(verb: &'static str, key: String, value: Option<String>) -> Self {
        Self {
            kv: TxnKv {
                verb,
                key,
                value,
            },
        }
    }
}

/// Body of a rolled-back transaction.
#[derive(Debug, Default, Deserialize)]
struct TxnFailure {
    /// Per-operation errors.
    #[serde(rename = "Errors", default)]
    errors: Option<Vec<TxnOperationError>>,
}

/// One failed transaction operation.
#[derive(Debug, Deserialize)]
struct TxnOperationError {
    /// Index of the failing operation.
    #[serde(rename = "OpIndex", default)]
    op_index: usize,
    /// Failure description.
    #[serde(rename = "What", default)]
    what: String,
}

/// Registry client bound to one service subtree in Consul.
pub struct ConsulRegistryClient {
    /// Blocking HTTP client.
    client: Client,
    /// Agent root URL.
    root: Url,
    /// Service base path (no trailing slash).
    base_path: String,
    /// ACL token; empty when security is disabled.
    token: AccessToken,
    /// Maximum registry response size in bytes.
    max_response_bytes: usize,
}

impl ConsulRegistryClient {
    /// Creates a client for the configured address.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Client`] when the address is not a valid URL
    /// or the HTTP client cannot be built.
    pub fn new(
        config: &RegistryClientConfig,
        timeout: Duration,
        max_response_bytes: usize,
    ) -> Result<Self, RegistryError> {
        let address = &config.address;
        let root = Url::parse(&format!("http://{}:{}/", address.host, address.port))
            .map_err(|_| RegistryError::Client("invalid registry address".to_string()))?;
        let base_path = address.base_path.trim_end_matches('/').to_string();
        if base_path.is_empty() {
            return Err(RegistryError::Client("registry base path must be non-empty".to_string()));
        }
        if has_dot_segment(&base_path) {
            return Err(RegistryError::Client(
                "registry base path must not contain `.` or `..` segments".to_string(),
            ));
        }
        let client = build_client(timeout).map_err(|err| RegistryError::Client(err.to_string()))?;
        Ok(Self {
            client,
            root,
            base_path,
            token: config.access_token.clone(),
            max_response_bytes,
        })
    }

    /// Returns the service base path.
    #[must_use]
    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    /// Builds `/v1/<segments..>` with each key segment percent-encoded.
    fn url(&self, prefix: &[&str], key: &str, query: Option<&str>) -> Result<Url, RegistryError> {
        if has_dot_segment(key) {
            return Err(RegistryError::Client(format!(
                "registry key `{key}` contains a dot segment"
            )));
        }
        let mut url = self.root.clone();
        url.path_segments_mut()
            .map_err(|()| RegistryError::Client("invalid registry address".to_string()))?
            .clear()
            .push("v1")
            .extend(prefix)
            .extend(key.split('/'));
        url.set_query(query);
        Ok(url)
    }

    /// Builds a key/value endpoint URL.
    fn kv_url(&self, key: &str, query: Option<&str>) -> Result<Url, RegistryError> {
        self.url(&["kv"], key, query)
    }

    /// Sends a request with the ACL token attached.
    fn send(
        &self,
        method: Method,
        url: Url,
        body: Option<String>,
    ) -> Result<Response, RegistryError> {
        let mut request = self.client.request(method, url);
        if !self.token.is_empty() {
            request = request.header(CONSUL_TOKEN_HEADER, self.token.expose());
        }
        if let Some(body) = body {
            request = request.body(body);
        }
        request.send().map_err(|_| RegistryError::Transport("registry request failed".to_string()))
    }

    /// Reads and decodes a JSON response body.
    fn read_json<T: DeserializeOwned>(&self, mut response: Response) -> Result<T, RegistryError> {
        let body = read_response_limited(&mut response, self.max_response_bytes)
            .map_err(|err| RegistryError::Transport(err.to_string()))?;
        serde_json::from_slice(&body)
            .map_err(|_| RegistryError::Data("invalid registry response".to_string()))
    }

    /// Lists keys under the base path; `None` when nothing is stored.
    fn list_keys(&self) -> Result<Option<BTreeSet<String>>, RegistryError> {
        let url = self.kv_url(&self.base_path, Some("keys=true"))?;
        let response = self.send(Method::GET, url, None)?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            StatusCode::OK => {
                let keys: Vec<String> = self.read_json(response)?;
                let keys: BTreeSet<String> =
                    keys.into_iter().filter(|key| is_within(&self.base_path, key)).collect();
                Ok((!keys.is_empty()).then_some(keys))
            }
            status => Err(RegistryError::Status(status.as_u16())),
        }
    }

    /// Applies one transaction; Consul rolls it back as a whole on failure.
    fn apply_txn(&self, operations: &[TxnOperation]) -> Result<(), RegistryError> {
        if operations.is_empty() {
            return Ok(());
        }
        let body = serde_json::to_string(operations)
            .map_err(|err| RegistryError::Data(err.to_string()))?;
        let url = self
            .root
            .join("v1/txn")
            .map_err(|_| RegistryError::Client("invalid registry address".to_string()))?;
        let response = self.send(Method::PUT, url, Some(body))?;
        match response.status() {
            StatusCode::OK => Ok(()),
            StatusCode::CONFLICT => {
                let failure: TxnFailure = self.read_json(response).unwrap_or_default();
                let detail = failure
                    .errors
                    .unwrap_or_default()
                    .into_iter()
                    .next()
                    .map_or_else(String::new, |err| {
                        format!(": operation {} {}", err.op_index, err.what)
                    });
                Err(RegistryError::Data(format!("registry rolled back the write{detail}")))
            }
            status => Err(RegistryError::Status(status.as_u16())),
        }
    }

    /// Applies operations in transaction-sized chunks, in order.
    fn apply_chunked(&self, operations: &[TxnOperation]) -> Result<(), RegistryError> {
        operations.chunks(MAX_TXN_OPERATIONS).try_for_each(|chunk| self.apply_txn(chunk))
    }

    /// Replaces the subtree with `entries`.
    fn replace_subtree(&self, entries: &[FlatEntry]) -> Result<(), RegistryError> {
        let mut operations = vec![
            TxnOperation::delete_tree(format!("{}/", self.base_path)),
            TxnOperation::delete(self.base_path.clone()),
        ];
        operations.extend(entries.iter().map(TxnOperation::set));
        if operations.len() <= MAX_TXN_OPERATIONS {
            return self.apply_txn(&operations);
        }
        let existing = self.list_keys()?.unwrap_or_default();
        let sets: Vec<TxnOperation> = entries.iter().map(TxnOperation::set).collect();
        self.apply_chunked(&sets)?;
        let written: BTreeSet<&str> = entries.iter().map(|entry| entry.key.as_str()).collect();
        let stale: Vec<TxnOperation> = existing
            .into_iter()
            .filter(|key| !written.contains(key.as_str()))
            .map(TxnOperation::delete)
            .collect();
        self.apply_chunked(&stale)
    }
}

impl RegistryClient for ConsulRegistryClient {
    fn is_alive(&self) -> bool {
        let Ok(url) = self.url(&["status"], "leader", None) else {
            return false;
        };
        let Ok(response) = self.send(Method::GET, url, None) else {
            return false;
        };
        if response.status() != StatusCode::OK {
            return false;
        }
        self.read_json::<String>(response).is_ok_and(|leader| !leader.is_empty())
    }

    fn has_configuration(&self) -> Result<bool, RegistryError> {
        Ok(self.list_keys()?.is_some())
    }

    fn get_configuration(&self) -> Result<TomlValue, RegistryError> {
        let url = self.kv_url(&self.base_path, Some("recurse=true"))?;
        let response = self.send(Method::GET, url, None)?;
        let entries: Vec<KvEntry> = match response.status() {
            StatusCode::NOT_FOUND => Vec::new(),
            StatusCode::OK => self.read_json(response)?,
            status => return Err(RegistryError::Status(status.as_u16())),
        };
        let pairs = entries
            .into_iter()
            .filter(|entry| is_within(&self.base_path, &entry.key))
            .map(decode_entry)
            .collect::<Result<Vec<_>, _>>()?;
        build_value(&self.base_path, pairs)
    }

    fn put_configuration_toml(
        &self,
        tree: &ConfigurationTree,
        overwrite: bool,
    ) -> Result<(), RegistryError> {
        let entries = flatten_table(&self.base_path, tree.as_table())?;
        if overwrite {
            return self.replace_subtree(&entries);
        }
        let existing = self.list_keys()?.unwrap_or_default();
        let missing: Vec<TxnOperation> = entries
            .iter()
            .filter(|entry| !existing.contains(&entry.key))
            .map(TxnOperation::set)
            .collect();
        self.apply_chunked(&missing)
    }
}

/// Returns true when any `/`-separated segment of `key` is `.` or `..`.
fn has_dot_segment(key: &str) -> bool {
    key.split('/').any(|segment| segment == "." || segment == "..")
}

/// Decodes a base64 entry value into text.
fn decode_entry(entry: KvEntry) -> Result<(String, String), RegistryError> {
    let Some(encoded) = entry.value else {
        return Ok((entry.key, String::new()));
    };
    let bytes = STANDARD
        .decode(encoded.as_bytes())
        .map_err(|_| RegistryError::Data(format!("invalid base64 value at `{}`", entry.key)))?;
    let text = String::from_utf8(bytes)
        .map_err(|_| RegistryError::Data(format!("non utf-8 value at `{}`", entry.key)))?;
    Ok((entry.key, text))
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::panic,
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::use_debug,
        reason = "Test-only assertions."
    )]

    use std::time::Duration;

    use config_gateway_core::AccessToken;
    use config_gateway_core::RegistryAddress;
    use config_gateway_core::RegistryClientConfig;
    use config_gateway_core::RegistryClientFactory;
    use config_gateway_core::RegistryError;

    use super::ConsulClientFactory;
    use super::ConsulRegistryClient;

    fn config(registry_type: &str, base_path: &str) -> RegistryClientConfig {
        RegistryClientConfig {
            address: RegistryAddress {
                host: "localhost".to_string(),
                port: 8500,
                registry_type: registry_type.to_string(),
                base_path: base_path.to_string(),
            },
            access_token: AccessToken::empty(),
        }
    }

    #[test]
    fn unsupported_registry_type_is_a_client_error() {
        let factory = ConsulClientFactory::new(Duration::from_secs(1));
        let Err(err) = factory.create(&config("etcd", "edgex/appservices/2.0/x")) else {
            panic!("etcd must be rejected");
        };
        assert_eq!(err, RegistryError::Client("unsupported registry type: etcd".to_string()));
    }

    #[test]
    fn key_segments_are_percent_encoded() {
        let client = ConsulRegistryClient::new(
            &config("consul", "edgex/appservices/2.0/my service"),
            Duration::from_secs(1),
            1024,
        )
        .unwrap();
        let url = client.kv_url(client.base_path(), Some("keys=true")).unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:8500/v1/kv/edgex/appservices/2.0/my%20service?keys=true"
        );
    }

    #[test]
    fn dot_segment_base_paths_are_refused() {
        for base_path in ["edgex/appservices/2.0/..", "edgex/./appservices/2.0/svc"] {
            let Err(err) = ConsulRegistryClient::new(
                &config("consul", base_path),
                Duration::from_secs(1),
                1024,
            ) else {
                panic!("{base_path} must be rejected");
            };
            assert!(matches!(err, RegistryError::Client(_)));
        }
    }

    #[test]
    fn folder_keys_keep_their_trailing_slash() {
        let client = ConsulRegistryClient::new(
            &config("consul", "edgex/appservices/2.0/svc"),
            Duration::from_secs(1),
            1024,
        )
        .unwrap();
        let url = client.kv_url("edgex/appservices/2.0/svc/", Some("recurse=true")).unwrap();
        assert_eq!(url.path(), "/v1/kv/edgex/appservices/2.0/svc/");
    }
}
