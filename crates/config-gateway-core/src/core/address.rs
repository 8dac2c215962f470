// crates/config-gateway-core/src/core/address.rs
// ============================================================================
// Module: Registry Addressing
// Description: Process-wide registry settings and per-service addresses.
// Purpose: Derive the registry namespace for a service deterministically.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! [`RegistrySettings`] is the explicitly passed value object holding the
//! registry connection settings. Combining it with a [`ServiceKey`] yields a
//! [`RegistryAddress`] whose base path is
//! `<config_registry_stem><service_version>/<service_key>`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Serialize;

use crate::core::identifiers::ServiceKey;

// ============================================================================
// SECTION: Settings
// ============================================================================

/// Registry connection settings shared by every request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrySettings {
    /// Registry host name or IP.
    pub host: String,
    /// Registry port.
    pub port: u16,
    /// Registry implementation label (for example `consul`).
    pub registry_type: String,
    /// Namespace stem prefixed to every service path.
    pub config_registry_stem: String,
    /// Service version segment appended to the stem.
    pub service_version: String,
}

impl RegistrySettings {
    /// Builds the registry address for a service.
    #[must_use]
    pub fn address_for(&self, service_key: &ServiceKey) -> RegistryAddress {
        RegistryAddress {
            host: self.host.clone(),
            port: self.port,
            registry_type: self.registry_type.clone(),
            base_path: format!(
                "{}{}/{}",
                self.config_registry_stem,
                self.service_version,
                service_key.as_str()
            ),
        }
    }
}

// ============================================================================
// SECTION: Address
// ============================================================================

/// Network address and namespace of one service's configuration subtree.
///
/// # Invariants
/// - Identical settings and service keys always produce equal addresses.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct RegistryAddress {
    /// Registry host name or IP.
    pub host: String,
    /// Registry port.
    pub port: u16,
    /// Registry implementation label.
    pub registry_type: String,
    /// Namespace under which the service configuration lives.
    pub base_path: String,
}

// ============================================================================
// SECTION: Tests
// ============================================================================
