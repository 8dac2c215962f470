// crates/config-gateway-core/src/runtime/resolver.rs
// ============================================================================
// Module: Client Resolver
// Description: Per-request registry client construction and liveness check.
// Purpose: Bind a fresh registry client to one service namespace.
// Dependencies: crate::{core, interfaces}, thiserror
// ============================================================================

//! ## Overview
//! The resolver combines the process-wide [`RegistrySettings`] with the
//! caller's [`ServiceKey`] and access token, asks the factory for a client,
//! and verifies liveness before handing the client out. Clients are never
//! cached; each request owns the client it resolved.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use thiserror::Error;

use crate::core::AccessToken;
use crate::core::RegistryAddress;
use crate::core::RegistrySettings;
use crate::core::ServiceKey;
use crate::interfaces::RegistryClient;
use crate::interfaces::RegistryClientConfig;
use crate::interfaces::RegistryClientFactory;

// ============================================================================
// SECTION: Resolver
// ============================================================================

/// Resolves live registry clients for service keys.
#[derive(Clone)]
pub struct ClientResolver {
    /// Registry connection settings.
    settings: RegistrySettings,
    /// Factory used to construct clients.
    factory: Arc<dyn RegistryClientFactory>,
}

impl ClientResolver {
    /// Creates a resolver over the given settings and factory.
    #[must_use]
    pub fn new(settings: RegistrySettings, factory: Arc<dyn RegistryClientFactory>) -> Self {
        Self {
            settings,
            factory,
        }
    }

    /// Returns the client configuration a resolve call would use.
    #[must_use]
    pub fn client_config(&self, service_key: &ServiceKey, token: &AccessToken) -> RegistryClientConfig {
        RegistryClientConfig {
            address: self.address_for(service_key),
            access_token: token.clone(),
        }
    }

    /// Returns the registry address for a service.
    #[must_use]
    pub fn address_for(&self, service_key: &ServiceKey) -> RegistryAddress {
        self.settings.address_for(service_key)
    }

    /// Constructs and liveness-checks a client for a service.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::Connection`] when the client cannot be built and
    /// [`ResolveError::NotRunning`] when the registry is not alive.
    pub fn resolve(
        &self,
        service_key: &ServiceKey,
        token: &AccessToken,
    ) -> Result<Box<dyn RegistryClient>, ResolveError> {
        let config = self.client_config(service_key, token);
        let client = self
            .factory
            .create(&config)
            .map_err(|err| ResolveError::Connection(err.to_string()))?;
        if !client.is_alive() {
            return Err(ResolveError::NotRunning(config.address.registry_type));
        }
        Ok(client)
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Client resolution failures.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// Client construction failed.
    #[error("Connection to Registry could not be made: {0}")]
    Connection(String),
    /// Registry did not pass the liveness check.
    #[error("Registry ({0}) is not running")]
    NotRunning(String),
}

impl ResolveError {
    /// Returns a stable label for the failure.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Connection(_) => "connection",
            Self::NotRunning(_) => "not_running",
        }
    }
}
