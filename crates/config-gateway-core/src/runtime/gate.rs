// crates/config-gateway-core/src/runtime/gate.rs
// ============================================================================
// Module: Security Gate
// Description: Optional registry token acquisition for secured deployments.
// Purpose: Block registry access until a token is issued in secured mode.
// Dependencies: crate::interfaces, thiserror
// ============================================================================

//! ## Overview
//! The security gate is configured once at startup. When disabled it yields
//! the empty token without side effects. When enabled it asks the
//! [`TokenProvider`] for a token and fails closed: any provider error, or a
//! provider that returns an empty token, aborts the request with a non-2xx
//! status.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use thiserror::Error;

use crate::core::AccessToken;
use crate::interfaces::RequestContext;
use crate::interfaces::TokenProvider;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Status used when a provider failure carries a success status.
const FALLBACK_FAILURE_STATUS: u16 = 500;

// ============================================================================
// SECTION: Gate
// ============================================================================

/// Security gate in front of the client resolver.
#[derive(Clone)]
pub struct SecurityGate {
    /// Token provider, present only in secured mode.
    provider: Option<Arc<dyn TokenProvider>>,
}

impl SecurityGate {
    /// Returns a gate that always yields the empty token.
    #[must_use]
    pub const fn disabled() -> Self {
        Self {
            provider: None,
        }
    }

    /// Returns a gate that requires a token from `provider`.
    #[must_use]
    pub fn enabled(provider: Arc<dyn TokenProvider>) -> Self {
        Self {
            provider: Some(provider),
        }
    }

    /// Returns true when secured mode is active.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.provider.is_some()
    }

    /// Acquires the access token for a request.
    ///
    /// # Errors
    ///
    /// Returns [`GateError`] when secured mode is active and no usable token
    /// was issued.
    pub fn authorize(&self, context: &RequestContext) -> Result<AccessToken, GateError> {
        let Some(provider) = &self.provider else {
            return Ok(AccessToken::empty());
        };
        match provider.acquire_token(context) {
            Ok(token) if token.is_empty() => Err(GateError {
                status: FALLBACK_FAILURE_STATUS,
                detail: "token provider returned an empty token".to_string(),
            }),
            Ok(token) => Ok(token),
            Err(err) => Err(GateError {
                status: failure_status(err.status),
                detail: err.message,
            }),
        }
    }
}

/// Keeps provider statuses unless they claim success.
const fn failure_status(status: u16) -> u16 {
    if matches!(status, 200..=299) { FALLBACK_FAILURE_STATUS } else { status }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Security gate failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unable to get registry acl token")]
pub struct GateError {
    /// Non-2xx status surfaced verbatim to the caller.
    pub status: u16,
    /// Provider diagnostic, kept out of the caller-facing message.
    pub detail: String,
}

// ============================================================================
// SECTION: Tests
// ============================================================================
