// crates/config-gateway-core/src/core/mod.rs
// ============================================================================
// Module: Config Gateway Core Types
// Description: Identifiers, registry addressing, and configuration shapes.
// Purpose: Provide request-scoped value types shared by every workflow step.
// Dependencies: serde, serde_json, toml
// ============================================================================

//! ## Overview
//! Core types cover the caller-facing identifiers, the deterministic registry
//! address derived from process settings, and the two configuration shapes
//! (flat JSON document and nested TOML tree) with conversions between them.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod address;
pub mod identifiers;
pub mod tree;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use address::RegistryAddress;
pub use address::RegistrySettings;
pub use identifiers::AccessToken;
pub use identifiers::InvalidServiceKey;
pub use identifiers::ServiceKey;
pub use tree::ConfigurationDocument;
pub use tree::ConfigurationTree;
pub use tree::ConversionError;
pub use tree::TypeCheckError;
pub use tree::value_from_json;
pub use tree::value_to_json;
