// crates/config-gateway-core/src/runtime/mod.rs
// ============================================================================
// Module: Config Gateway Runtime
// Description: Security gate, client resolver, and request workflows.
// Purpose: Compose the per-request deploy and fetch operations.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! Runtime components run strictly in order: [`SecurityGate`], then
//! [`ClientResolver`], then the deploy or fetch steps of [`ConfigGateway`].
//! Every failure terminates the request at the step where it was detected.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod gate;
pub mod gateway;
pub mod resolver;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use gate::GateError;
pub use gate::SecurityGate;
pub use gateway::ConfigGateway;
pub use gateway::GatewayError;
pub use gateway::JSON_CONTENT_TYPE;
pub use gateway::Operation;
pub use resolver::ClientResolver;
pub use resolver::ResolveError;
