// crates/config-gateway-core/src/runtime/gateway.rs
// ============================================================================
// Module: Config Gateway Workflows
// Description: Deploy and fetch operations over a service's registry subtree.
// Purpose: Orchestrate gate, resolver, conversion, and registry calls.
// Dependencies: crate::{core, interfaces, runtime}, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! [`ConfigGateway::deploy`] decodes the caller payload before touching the
//! network, then runs the security gate, resolves a client, converts the
//! document to a tree and overwrites the service subtree.
//! [`ConfigGateway::fetch`] runs the gate, resolves a client, checks that
//! configuration exists, reads it, type-checks the result and encodes it as
//! JSON. Each failure maps to one [`GatewayError`] variant carrying its own
//! status class; nothing is retried.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Serialize;
use thiserror::Error;

use crate::core::ConfigurationDocument;
use crate::core::ConfigurationTree;
use crate::core::ConversionError;
use crate::core::ServiceKey;
use crate::core::TypeCheckError;
use crate::interfaces::RegistryError;
use crate::interfaces::RequestContext;
use crate::runtime::gate::GateError;
use crate::runtime::gate::SecurityGate;
use crate::runtime::resolver::ClientResolver;
use crate::runtime::resolver::ResolveError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Content type of a successful fetch response.
pub const JSON_CONTENT_TYPE: &str = "application/json;charset=UTF-8";

// ============================================================================
// SECTION: Operations
// ============================================================================

/// Gateway operation classification.
///
/// # Invariants
/// - Variants are stable for audit labeling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    /// Write a configuration tree.
    Deploy,
    /// Read a configuration tree.
    Fetch,
}

/// Request-scoped deploy and fetch workflows.
#[derive(Clone)]
pub struct ConfigGateway {
    /// Token gate run before any registry access.
    gate: SecurityGate,
    /// Per-request registry client resolver.
    resolver: ClientResolver,
}

impl ConfigGateway {
    /// Creates a gateway from its collaborators.
    #[must_use]
    pub const fn new(gate: SecurityGate, resolver: ClientResolver) -> Self {
        Self {
            gate,
            resolver,
        }
    }

    /// Returns the security gate.
    #[must_use]
    pub const fn gate(&self) -> &SecurityGate {
        &self.gate
    }

    /// Returns the client resolver.
    #[must_use]
    pub const fn resolver(&self) -> &ClientResolver {
        &self.resolver
    }

    /// Replaces the stored configuration of a service.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError`] describing the first failing step.
    pub fn deploy(
        &self,
        context: &RequestContext,
        service_key: &str,
        payload: &[u8],
    ) -> Result<(), GatewayError> {
        let service_key = parse_service_key(service_key)?;
        let document: ConfigurationDocument = serde_json::from_slice(payload)
            .map_err(|err| GatewayError::MalformedInput(err.to_string()))?;
        let token = self.gate.authorize(context).map_err(GatewayError::SecurityGate)?;
        let client = self.resolver.resolve(&service_key, &token).map_err(|source| {
            GatewayError::Unreachable {
                operation: Operation::Deploy,
                source,
            }
        })?;
        let tree = ConfigurationTree::from_document(&document).map_err(GatewayError::Conversion)?;
        client.put_configuration_toml(&tree, true).map_err(GatewayError::Write)
    }

    /// Reads the stored configuration of a service as a JSON body.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError`] describing the first failing step.
    pub fn fetch(
        &self,
        context: &RequestContext,
        service_key: &str,
    ) -> Result<Vec<u8>, GatewayError> {
        let service_key = parse_service_key(service_key)?;
        let token = self.gate.authorize(context).map_err(GatewayError::SecurityGate)?;
        let client = self.resolver.resolve(&service_key, &token).map_err(|source| {
            GatewayError::Unreachable {
                operation: Operation::Fetch,
                source,
            }
        })?;
        if !client.has_configuration().map_err(GatewayError::Retrieval)? {
            return Err(GatewayError::NotFound(service_key));
        }
        let raw = client.get_configuration().map_err(GatewayError::Retrieval)?;
        let tree = ConfigurationTree::try_from(raw).map_err(GatewayError::TypeCheck)?;
        let document =
            tree.to_document().map_err(|err| GatewayError::Serialization(err.to_string()))?;
        serde_json::to_vec(&document).map_err(|err| GatewayError::Serialization(err.to_string()))
    }
}

/// Validates the caller-supplied service key.
fn parse_service_key(service_key: &str) -> Result<ServiceKey, GatewayError> {
    ServiceKey::new(service_key).map_err(|_| GatewayError::InvalidServiceKey)
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Gateway workflow failures.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
/// - Messages never contain token material.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// Service key was empty or not a single path segment.
    #[error("service key must be a single non-empty path segment")]
    InvalidServiceKey,
    /// Payload is not a JSON object.
    #[error("malformed configuration payload: {0}")]
    MalformedInput(String),
    /// Security gate refused the request.
    #[error(transparent)]
    SecurityGate(GateError),
    /// Registry client could not be resolved.
    #[error("{source}")]
    Unreachable {
        /// Operation that attempted the resolution.
        operation: Operation,
        /// Resolution failure.
        source: ResolveError,
    },
    /// Document has no tree representation.
    #[error("{0}")]
    Conversion(ConversionError),
    /// Registry rejected or failed the write.
    #[error("{0}")]
    Write(RegistryError),
    /// No configuration exists for the service.
    #[error("service [{0}] not found on register center")]
    NotFound(ServiceKey),
    /// Registry read failed.
    #[error("could not get configuration from Configuration: {0}")]
    Retrieval(RegistryError),
    /// Registry returned something other than a configuration table.
    #[error("Configuration from Registry failed type check")]
    TypeCheck(TypeCheckError),
    /// Configuration could not be encoded as JSON.
    #[error("{0}")]
    Serialization(String),
}

impl GatewayError {
    /// Returns the HTTP status class of the failure.
    ///
    /// Resolution failures are reported as 500 for deploy and 404 for fetch.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::InvalidServiceKey | Self::MalformedInput(_) => 400,
            Self::SecurityGate(err) => err.status,
            Self::Unreachable {
                operation: Operation::Deploy,
                ..
            } => 500,
            Self::Unreachable {
                operation: Operation::Fetch,
                ..
            }
            | Self::NotFound(_) => 404,
            Self::Write(_) => 502,
            Self::Conversion(_)
            | Self::Retrieval(_)
            | Self::TypeCheck(_)
            | Self::Serialization(_) => 500,
        }
    }

    /// Returns a stable label for the failure.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::InvalidServiceKey => "invalid_service_key",
            Self::MalformedInput(_) => "malformed_input",
            Self::SecurityGate(_) => "security_gate",
            Self::Unreachable {
                source,
                ..
            } => source.kind(),
            Self::Conversion(_) => "conversion",
            Self::Write(_) => "write",
            Self::NotFound(_) => "not_found",
            Self::Retrieval(_) => "retrieval",
            Self::TypeCheck(_) => "type_check",
            Self::Serialization(_) => "serialization",
        }
    }
}
