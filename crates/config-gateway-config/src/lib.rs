// crates/config-gateway-config/src/lib.rs
// ============================================================================
// Module: Config Gateway Config Library
// Description: Canonical config model and validation.
// Purpose: Single source of truth for config-gateway.toml semantics.
// Dependencies: config-gateway-core, serde, toml
// ============================================================================

//! ## Overview
//! `config-gateway-config` defines the configuration model for the config
//! gateway: HTTP server limits, registry connection settings, optional
//! secured mode and audit output. Validation is strict and fail-closed.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
