// crates/config-gateway-core/src/interfaces/mod.rs
// ============================================================================
// Module: Config Gateway Interfaces
// Description: Collaborator contracts for registries and token providers.
// Purpose: Define the seams the gateway workflows are written against.
// Dependencies: crate::core, thiserror, toml
// ============================================================================

//! ## Overview
//! The gateway talks to two external systems: the configuration registry and
//! the secrets provider that issues registry access tokens. Both are reached
//! through the traits below so workflows can be exercised with in-memory
//! fakes. All calls are synchronous; callers running on an async reactor must
//! move them to a blocking context.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::net::IpAddr;

use thiserror::Error;
use toml::Value as TomlValue;

use crate::core::AccessToken;
use crate::core::ConfigurationTree;
use crate::core::RegistryAddress;

// ============================================================================
// SECTION: Request Context
// ============================================================================

/// Per-request metadata handed to the token provider.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// Request identifier for auditing.
    pub request_id: Option<String>,
    /// Peer IP address when available.
    pub peer_ip: Option<IpAddr>,
    /// Secrets-provider credential presented by the caller.
    pub caller_token: Option<AccessToken>,
}

impl RequestContext {
    /// Builds a context for in-process callers such as the CLI.
    #[must_use]
    pub fn local(caller_token: Option<AccessToken>) -> Self {
        Self {
            request_id: None,
            peer_ip: None,
            caller_token,
        }
    }

    /// Builds a context for an HTTP request.
    #[must_use]
    pub const fn http(peer_ip: Option<IpAddr>, caller_token: Option<AccessToken>) -> Self {
        Self {
            request_id: None,
            peer_ip,
            caller_token,
        }
    }

    /// Returns a copy with the request identifier set.
    #[must_use]
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }
}

// ============================================================================
// SECTION: Registry Client
// ============================================================================

/// Everything needed to construct a registry client for one service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryClientConfig {
    /// Address and namespace of the service subtree.
    pub address: RegistryAddress,
    /// Access credential attached to every registry call (may be empty).
    pub access_token: AccessToken,
}

/// Registry client failures.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// Client could not be constructed from the supplied configuration.
    #[error("registry client error: {0}")]
    Client(String),
    /// Network or protocol failure while talking to the registry.
    #[error("registry transport error: {0}")]
    Transport(String),
    /// Registry answered with an unexpected status.
    #[error("registry returned status {0}")]
    Status(u16),
    /// Registry data could not be decoded or encoded.
    #[error("registry data error: {0}")]
    Data(String),
}

/// Live handle bound to one service namespace.
pub trait RegistryClient: Send {
    /// Returns true when the registry reports itself alive.
    fn is_alive(&self) -> bool;

    /// Returns true when any configuration exists under the namespace.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] when the registry cannot be queried.
    fn has_configuration(&self) -> Result<bool, RegistryError>;

    /// Reads the configuration stored under the namespace.
    ///
    /// The value is untyped; callers must check that it is a table.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] when the read fails.
    fn get_configuration(&self) -> Result<TomlValue, RegistryError>;

    /// Writes a configuration tree under the namespace.
    ///
    /// With `overwrite` the existing subtree is replaced; without it, keys
    /// already present are left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] when the registry rejects the write.
    fn put_configuration_toml(
        &self,
        tree: &ConfigurationTree,
        overwrite: bool,
    ) -> Result<(), RegistryError>;
}

/// Constructs registry clients.
pub trait RegistryClientFactory: Send + Sync {
    /// Creates a client bound to the configured address.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] when the client cannot be constructed.
    fn create(&self, config: &RegistryClientConfig)
    -> Result<Box<dyn RegistryClient>, RegistryError>;
}

// ============================================================================
// SECTION: Token Provider
// ============================================================================

/// Token acquisition failure carrying the status to surface to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("token acquisition failed with status {status}: {message}")]
pub struct TokenError {
    /// HTTP status describing the failure.
    pub status: u16,
    /// Diagnostic message (never contains token material).
    pub message: String,
}

impl TokenError {
    /// Builds a token error.
    #[must_use]
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

/// Issues registry access tokens in secured mode.
pub trait TokenProvider: Send + Sync {
    /// Acquires a registry access token for the request.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError`] when no token can be issued.
    fn acquire_token(&self, context: &RequestContext) -> Result<AccessToken, TokenError>;
}
