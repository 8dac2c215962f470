// crates/config-gateway-server/src/lib.rs
// ============================================================================
// Module: Config Gateway Server
// Description: HTTP surface and audit logging for the config gateway.
// Purpose: Route deploy and fetch requests into the gateway workflows.
// Dependencies: config-gateway-core, config-gateway-config, config-gateway-registry, axum, tokio
// ============================================================================

//! ## Overview
//! The server exposes [`config_gateway_core::ConfigGateway`] over HTTP. Each
//! request runs the blocking workflow off the async reactor and emits one
//! structured audit event. Inputs are untrusted: bodies are size-limited and
//! tokens never reach logs or error messages.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod audit;
pub mod server;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::GatewayAuditEvent;
pub use audit::GatewayAuditEventParams;
pub use audit::GatewayAuditSink;
pub use audit::GatewayFileAuditSink;
pub use audit::GatewayNoopAuditSink;
pub use audit::GatewayOutcome;
pub use audit::GatewayStderrAuditSink;
pub use server::GatewayServer;
pub use server::ServerError;
pub use server::ServerState;
pub use server::build_audit_sink;
pub use server::build_gateway;
pub use server::router;
