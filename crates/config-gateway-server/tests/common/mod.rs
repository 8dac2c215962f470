// crates/config-gateway-server/tests/common/mod.rs
// ============================================================================
// Module: Server Test Fixtures
// Description: In-memory registry, token provider, and audit capture.
// Purpose: Drive the HTTP router without sockets or external services.
// Dependencies: config-gateway-core, config-gateway-server, axum, tower
// ============================================================================

//! ## Overview
//! [`MemoryRegistry`] stores one tree per registry base path, which is enough
//! to observe deploy/fetch behavior end to end through the router.

#![allow(dead_code, reason = "Shared test helpers may be unused in some cases.")]
#![allow(clippy::unwrap_used, clippy::expect_used, reason = "Test-only helpers.")]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::Mutex;

use axum::Router;
use axum::body::Body;
use axum::extract::connect_info::MockConnectInfo;
use axum::http::Request;
use axum::http::Response;
use config_gateway_core::AccessToken;
use config_gateway_core::ClientResolver;
use config_gateway_core::ConfigGateway;
use config_gateway_core::ConfigurationTree;
use config_gateway_core::RegistryClient;
use config_gateway_core::RegistryClientConfig;
use config_gateway_core::RegistryClientFactory;
use config_gateway_core::RegistryError;
use config_gateway_core::RegistrySettings;
use config_gateway_core::RequestContext;
use config_gateway_core::SecurityGate;
use config_gateway_core::TokenError;
use config_gateway_core::TokenProvider;
use config_gateway_server::GatewayAuditEvent;
use config_gateway_server::GatewayAuditSink;
use config_gateway_server::ServerState;
use config_gateway_server::router;
use toml::Value as TomlValue;
use tower::ServiceExt;

// ============================================================================
// SECTION: Memory Registry
// ============================================================================

/// Registry base path of the `device-mqtt` service.
pub const DEVICE_MQTT_PATH: &str = "edgex/appservices/2.0/device-mqtt";

/// In-memory registry keyed by base path.
#[derive(Default)]
pub struct MemoryRegistry {
    /// Stored trees.
    pub trees: Arc<Mutex<BTreeMap<String, ConfigurationTree>>>,
    /// Client configurations passed to the factory.
    pub configs: Mutex<Vec<RegistryClientConfig>>,
    /// Whether clients report the registry as stopped.
    pub stopped: bool,
}

impl MemoryRegistry {
    /// Returns the stored tree for a base path.
    pub fn tree(&self, base_path: &str) -> Option<ConfigurationTree> {
        self.trees.lock().unwrap().get(base_path).cloned()
    }

    /// Stores a tree directly.
    pub fn seed(&self, base_path: &str, source: &str) {
        let tree = ConfigurationTree::from_table(toml::from_str(source).unwrap());
        self.trees.lock().unwrap().insert(base_path.to_string(), tree);
    }

    /// Returns the number of clients created.
    pub fn created(&self) -> usize {
        self.configs.lock().unwrap().len()
    }
}

impl RegistryClientFactory for MemoryRegistry {
    fn create(
        &self,
        config: &RegistryClientConfig,
    ) -> Result<Box<dyn RegistryClient>, RegistryError> {
        self.configs.lock().unwrap().push(config.clone());
        Ok(Box::new(MemoryClient {
            base_path: config.address.base_path.clone(),
            trees: Arc::clone(&self.trees),
            alive: !self.stopped,
        }))
    }
}

/// Client handed out by [`MemoryRegistry`].
struct MemoryClient {
    /// Namespace served.
    base_path: String,
    /// Shared storage.
    trees: Arc<Mutex<BTreeMap<String, ConfigurationTree>>>,
    /// Liveness reported.
    alive: bool,
}

impl RegistryClient for MemoryClient {
    fn is_alive(&self) -> bool {
        self.alive
    }

    fn has_configuration(&self) -> Result<bool, RegistryError> {
        Ok(self.trees.lock().unwrap().contains_key(&self.base_path))
    }

    fn get_configuration(&self) -> Result<TomlValue, RegistryError> {
        let tree = self.trees.lock().unwrap().get(&self.base_path).cloned().unwrap_or_default();
        Ok(TomlValue::Table(tree.into_table()))
    }

    fn put_configuration_toml(
        &self,
        tree: &ConfigurationTree,
        _overwrite: bool,
    ) -> Result<(), RegistryError> {
        self.trees.lock().unwrap().insert(self.base_path.clone(), tree.clone());
        Ok(())
    }
}

// ============================================================================
// SECTION: Token Provider
// ============================================================================

/// Token provider returning a fixed result and recording caller tokens.
pub struct RecordingTokenProvider {
    /// Result returned on every call.
    pub result: Result<AccessToken, TokenError>,
    /// Caller tokens observed.
    pub callers: Mutex<Vec<Option<String>>>,
}

impl RecordingTokenProvider {
    /// Creates a provider returning `result`.
    pub fn new(result: Result<AccessToken, TokenError>) -> Arc<Self> {
        Arc::new(Self {
            result,
            callers: Mutex::new(Vec::new()),
        })
    }

    /// Returns the caller tokens observed.
    pub fn callers(&self) -> Vec<Option<String>> {
        self.callers.lock().unwrap().clone()
    }
}

impl TokenProvider for RecordingTokenProvider {
    fn acquire_token(&self, context: &RequestContext) -> Result<AccessToken, TokenError> {
        let caller = context.caller_token.as_ref().map(|token| token.expose().to_string());
        self.callers.lock().unwrap().push(caller);
        self.result.clone()
    }
}

// ============================================================================
// SECTION: Audit Capture
// ============================================================================

/// Audit sink keeping events in memory.
#[derive(Default)]
pub struct CapturingAuditSink {
    /// Recorded events.
    pub events: Mutex<Vec<GatewayAuditEvent>>,
}

impl CapturingAuditSink {
    /// Returns the recorded events.
    pub fn events(&self) -> Vec<GatewayAuditEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl GatewayAuditSink for CapturingAuditSink {
    fn record(&self, event: &GatewayAuditEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

// ============================================================================
// SECTION: Harness
// ============================================================================

/// Router plus the collaborators it was built over.
pub struct Harness {
    /// Router under test.
    pub app: Router,
    /// Backing registry.
    pub registry: Arc<MemoryRegistry>,
    /// Captured audit events.
    pub audit: Arc<CapturingAuditSink>,
}

impl Harness {
    /// Builds an insecure harness.
    pub fn open(registry: MemoryRegistry) -> Self {
        Self::build(registry, SecurityGate::disabled(), 1024 * 1024)
    }

    /// Builds a harness with an explicit gate and body limit.
    pub fn build(registry: MemoryRegistry, gate: SecurityGate, max_body_bytes: usize) -> Self {
        let registry = Arc::new(registry);
        let audit = Arc::new(CapturingAuditSink::default());
        let factory: Arc<dyn RegistryClientFactory> = registry.clone();
        let sink: Arc<dyn GatewayAuditSink> = audit.clone();
        let resolver = ClientResolver::new(settings(), factory);
        let state = ServerState::new(ConfigGateway::new(gate, resolver), max_body_bytes, sink);
        let peer = SocketAddr::from(([127, 0, 0, 1], 40_100));
        let app = router(Arc::new(state)).layer(MockConnectInfo(peer));
        Self {
            app,
            registry,
            audit,
        }
    }

    /// Sends one request through a fresh clone of the router.
    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.app.clone().oneshot(request).await.unwrap()
    }
}

/// Registry settings used by the harness.
pub fn settings() -> RegistrySettings {
    RegistrySettings {
        host: "localhost".to_string(),
        port: 8500,
        registry_type: "consul".to_string(),
        config_registry_stem: "edgex/appservices/".to_string(),
        service_version: "2.0".to_string(),
    }
}

/// Builds a deploy request.
pub fn put_config(service_key: &str, body: impl Into<Body>) -> Request<Body> {
    Request::put(format!("/api/v2/registrycenter/config/{service_key}"))
        .header("content-type", "application/json")
        .body(body.into())
        .unwrap()
}

/// Builds a fetch request.
pub fn get_config(service_key: &str) -> Request<Body> {
    Request::get(format!("/api/v2/registrycenter/config/{service_key}"))
        .body(Body::empty())
        .unwrap()
}

/// Reads a response body as text.
pub async fn body_text(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}
