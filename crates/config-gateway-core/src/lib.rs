// crates/config-gateway-core/src/lib.rs
// ============================================================================
// Module: Config Gateway Core Library
// Description: Public API surface for the Config Gateway core.
// Purpose: Expose core types, collaborator interfaces, and request workflows.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! Config Gateway core synchronizes one service's configuration between an
//! administrative caller and a hierarchical configuration registry. Callers
//! exchange flat JSON documents; the registry persists nested TOML trees.
//! The core is transport-agnostic and integrates with registries and token
//! providers only through the traits in [`interfaces`].

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use core::*;

pub use interfaces::RegistryClient;
pub use interfaces::RegistryClientConfig;
pub use interfaces::RegistryClientFactory;
pub use interfaces::RegistryError;
pub use interfaces::RequestContext;
pub use interfaces::TokenError;
pub use interfaces::TokenProvider;
pub use runtime::ClientResolver;
pub use runtime::ConfigGateway;
pub use runtime::GateError;
pub use runtime::GatewayError;
pub use runtime::JSON_CONTENT_TYPE;
pub use runtime::Operation;
pub use runtime::ResolveError;
pub use runtime::SecurityGate;
