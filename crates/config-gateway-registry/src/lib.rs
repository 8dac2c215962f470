// crates/config-gateway-registry/src/lib.rs
// ============================================================================
// Module: Config Gateway Registry
// Description: Registry clients and token providers for the config gateway.
// Purpose: Connect gateway workflows to Consul and the secret store.
// Dependencies: config-gateway-core, base64, reqwest, serde
// ============================================================================

//! ## Overview
//! This crate provides the production implementations of the gateway's
//! collaborator traits: a Consul key/value registry client with its factory,
//! and a secret-store token provider for secured mode. All HTTP calls are
//! blocking, bounded by timeouts and response-size limits, and never follow
//! redirects.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod codec;
pub mod consul;
pub mod http;
pub mod secret_store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use consul::CONSUL_REGISTRY_TYPE;
pub use consul::ConsulClientFactory;
pub use consul::ConsulRegistryClient;
pub use secret_store::SECRET_STORE_TOKEN_HEADER;
pub use secret_store::SecretStoreError;
pub use secret_store::SecretStoreTokenProvider;
