// crates/config-gateway-server/src/audit.rs
// ============================================================================
// Module: Gateway Audit Logging
// Description: Structured audit events for gateway request handling.
// Purpose: Emit one redacted JSON line per deploy or fetch request.
// Dependencies: config-gateway-core, serde, serde_json
// ============================================================================

//! ## Overview
//! Audit events record what was asked and how it ended: operation, service
//! key, status, error label and byte counts. Tokens and payload contents are
//! never recorded.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use config_gateway_core::Operation;
use serde::Serialize;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Request outcome classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayOutcome {
    /// Request completed successfully.
    Ok,
    /// Request failed.
    Error,
}

/// Gateway audit event payload.
#[derive(Debug, Clone, Serialize)]
pub struct GatewayAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Request identifier.
    pub request_id: String,
    /// Peer IP address when available.
    pub peer_ip: Option<String>,
    /// Gateway operation.
    pub operation: Operation,
    /// Service key from the request path.
    pub service_key: String,
    /// Request outcome.
    pub outcome: GatewayOutcome,
    /// HTTP status returned.
    pub status: u16,
    /// Normalized error kind label.
    pub error_kind: Option<&'static str>,
    /// Request body size in bytes.
    pub request_bytes: usize,
    /// Response body size in bytes.
    pub response_bytes: usize,
}

/// Inputs required to construct an audit event.
pub struct GatewayAuditEventParams {
    /// Request identifier.
    pub request_id: String,
    /// Peer IP address if known.
    pub peer_ip: Option<String>,
    /// Gateway operation.
    pub operation: Operation,
    /// Service key from the request path.
    pub service_key: String,
    /// HTTP status returned.
    pub status: u16,
    /// Normalized error kind label.
    pub error_kind: Option<&'static str>,
    /// Request body size in bytes.
    pub request_bytes: usize,
    /// Response body size in bytes.
    pub response_bytes: usize,
}

impl GatewayAuditEvent {
    /// Creates a new audit event with a consistent timestamp.
    ///
    /// The outcome is derived from the status class.
    #[must_use]
    pub fn new(params: GatewayAuditEventParams) -> Self {
        let timestamp_ms =
            SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis();
        let outcome = if (200 .. 300).contains(&params.status) {
            GatewayOutcome::Ok
        } else {
            GatewayOutcome::Error
        };
        Self {
            event: "gateway_request",
            timestamp_ms,
            request_id: params.request_id,
            peer_ip: params.peer_ip,
            operation: params.operation,
            service_key: params.service_key,
            outcome,
            status: params.status,
            error_kind: params.error_kind,
            request_bytes: params.request_bytes,
            response_bytes: params.response_bytes,
        }
    }
}

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Audit sink for gateway request events.
pub trait GatewayAuditSink: Send + Sync {
    /// Record an audit event.
    fn record(&self, event: &GatewayAuditEvent);
}

/// Audit sink that logs JSON lines to stderr.
pub struct GatewayStderrAuditSink;

impl GatewayAuditSink for GatewayStderrAuditSink {
    fn record(&self, event: &GatewayAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

/// Audit sink that logs JSON lines to a file.
pub struct GatewayFileAuditSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl GatewayFileAuditSink {
    /// Opens the audit log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl GatewayAuditSink for GatewayFileAuditSink {
    fn record(&self, event: &GatewayAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

/// No-op audit sink.
pub struct GatewayNoopAuditSink;

impl GatewayAuditSink for GatewayNoopAuditSink {
    fn record(&self, _event: &GatewayAuditEvent) {}
}

// ============================================================================
// SECTION: Tests
// ============================================================================
