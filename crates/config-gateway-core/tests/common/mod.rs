// crates/config-gateway-core/tests/common/mod.rs
// ============================================================================
// Module: Common Test Fixtures
// Description: Spy registry and token provider doubles for workflow tests.
// Purpose: Record every collaborator interaction for assertion.
// Dependencies: config-gateway-core
// ============================================================================

//! ## Overview
//! The spy registry records each factory and client call so tests can assert
//! both what happened and what never happened (zero registry interactions on
//! malformed input, no tree read when nothing is stored).

#![allow(dead_code, reason = "Shared test helpers may be unused in some cases.")]
#![allow(clippy::unwrap_used, reason = "Test-only lock handling.")]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::Mutex;

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
use toml::Value as TomlValue;

// ============================================================================
// SECTION: Spy Registry
// ============================================================================

/// Scripted registry behavior.
#[derive(Debug, Clone)]
pub struct RegistryScript {
    /// Error returned by the factory instead of a client.
    pub create_error: Option<RegistryError>,
    /// Liveness reported by clients.
    pub alive: bool,
    /// Result of `has_configuration`.
    pub has_configuration: Result<bool, RegistryError>,
    /// Result of `get_configuration`.
    pub stored: Result<TomlValue, RegistryError>,
    /// Error returned by `put_configuration_toml`.
    pub write_error: Option<RegistryError>,
}

impl Default for RegistryScript {
    fn default() -> Self {
        Self {
            create_error: None,
            alive: true,
            has_configuration: Ok(true),
            stored: Ok(TomlValue::Table(toml::Table::new())),
            write_error: None,
        }
    }
}

/// Interactions recorded by the spy registry.
#[derive(Debug, Default)]
pub struct RegistryLog {
    /// Ordered call names.
    pub calls: Mutex<Vec<&'static str>>,
    /// Client configurations passed to the factory.
    pub configs: Mutex<Vec<RegistryClientConfig>>,
    /// Trees written with their overwrite flag.
    pub writes: Mutex<Vec<(ConfigurationTree, bool)>>,
}

impl RegistryLog {
    /// Returns the ordered call names.
    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    /// Records a call name.
    fn record(&self, call: &'static str) {
        self.calls.lock().unwrap().push(call);
    }
}

/// Spy registry acting as client factory.
pub struct SpyRegistry {
    /// Shared interaction log.
    pub log: Arc<RegistryLog>,
    /// Behavior handed to each client.
    pub script: RegistryScript,
}

impl SpyRegistry {
    /// Creates a spy registry with the given script.
    pub fn new(script: RegistryScript) -> Self {
        Self {
            log: Arc::new(RegistryLog::default()),
            script,
        }
    }
}

impl RegistryClientFactory for SpyRegistry {
    fn create(
        &self,
        config: &RegistryClientConfig,
    ) -> Result<Box<dyn RegistryClient>, RegistryError> {
        self.log.record("create");
        self.log.configs.lock().unwrap().push(config.clone());
        if let Some(err) = &self.script.create_error {
            return Err(err.clone());
        }
        Ok(Box::new(SpyClient {
            log: Arc::clone(&self.log),
            script: self.script.clone(),
        }))
    }
}

/// Client handed out by [`SpyRegistry`].
struct SpyClient {
    /// Shared interaction log.
    log: Arc<RegistryLog>,
    /// Scripted behavior.
    script: RegistryScript,
}

impl RegistryClient for SpyClient {
    fn is_alive(&self) -> bool {
        self.log.record("is_alive");
        self.script.alive
    }

    fn has_configuration(&self) -> Result<bool, RegistryError> {
        self.log.record("has_configuration");
        self.script.has_configuration.clone()
    }

    fn get_configuration(&self) -> Result<TomlValue, RegistryError> {
        self.log.record("get_configuration");
        self.script.stored.clone()
    }

    fn put_configuration_toml(
        &self,
        tree: &ConfigurationTree,
        overwrite: bool,
    ) -> Result<(), RegistryError> {
        self.log.record("put_configuration_toml");
        self.log.writes.lock().unwrap().push((tree.clone(), overwrite));
        self.script.write_error.clone().map_or(Ok(()), Err)
    }
}

// ============================================================================
// SECTION: Token Provider
// ============================================================================

/// Token provider returning a fixed result and counting calls.
pub struct ScriptedTokenProvider {
    /// Result returned on every call.
    pub result: Result<AccessToken, TokenError>,
    /// Number of calls observed.
    pub calls: Mutex<usize>,
}

impl ScriptedTokenProvider {
    /// Creates a provider returning `result`.
    pub fn new(result: Result<AccessToken, TokenError>) -> Arc<Self> {
        Arc::new(Self {
            result,
            calls: Mutex::new(0),
        })
    }

    /// Returns the number of calls observed.
    pub fn call_count(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

impl TokenProvider for ScriptedTokenProvider {
    fn acquire_token(&self, _context: &RequestContext) -> Result<AccessToken, TokenError> {
        *self.calls.lock().unwrap() += 1;
        self.result.clone()
    }
}

// ============================================================================
// SECTION: Builders
// ============================================================================

/// Registry settings used across tests.
pub fn sample_settings() -> RegistrySettings {
    RegistrySettings {
        host: "localhost".to_string(),
        port: 8500,
        registry_type: "consul".to_string(),
        config_registry_stem: "edgex/appservices/".to_string(),
        service_version: "2.0".to_string(),
    }
}

/// Builds a gateway over a spy registry, returning the interaction log.
pub fn gateway_with(script: RegistryScript, gate: SecurityGate) -> (ConfigGateway, Arc<RegistryLog>) {
    let registry = SpyRegistry::new(script);
    let log = Arc::clone(&registry.log);
    let resolver = ClientResolver::new(sample_settings(), Arc::new(registry));
    (ConfigGateway::new(gate, resolver), log)
}

/// Builds an insecure gateway over a spy registry.
pub fn open_gateway(script: RegistryScript) -> (ConfigGateway, Arc<RegistryLog>) {
    gateway_with(script, SecurityGate::disabled())
}
