// crates/config-gateway-registry/src/secret_store.rs
// ============================================================================
// Module: Secret Store Token Provider
// Description: Exchanges caller secret-store tokens for registry ACL tokens.
// Purpose: Back the security gate in secured deployments.
// Dependencies: config-gateway-core, reqwest, serde, thiserror
// ============================================================================

//! ## Overview
//! The provider calls `GET <secret_store_url>/v1/consul/creds/<role>` with the
//! caller's token in `X-Vault-Token` and returns the issued registry token.
//! Failures carry the status surfaced to the caller:
//! - no caller token: 401
//! - upstream non-200: the upstream status
//! - upstream unreachable: 503
//! - unreadable body or empty token: 500
//!
//! Token values never appear in error messages.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use config_gateway_core::AccessToken;
use config_gateway_core::RequestContext;
use config_gateway_core::TokenError;
use config_gateway_core::TokenProvider;
use reqwest::StatusCode;
use reqwest::Url;
use serde::Deserialize;
use thiserror::Error;

use crate::http::build_client;
use crate::http::read_response_limited;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Header carrying the caller's secret-store token.
pub const SECRET_STORE_TOKEN_HEADER: &str = "X-Vault-Token";
/// Maximum credential response size in bytes.
const MAX_CREDS_RESPONSE_BYTES: usize = 64 * 1024;

// ============================================================================
// SECTION: Provider
// ============================================================================

/// Credential response envelope.
#[derive(Debug, Deserialize)]
struct CredsResponse {
    /// Issued credential data.
    data: CredsData,
}

/// Issued credential data.
#[derive(Debug, Deserialize)]
struct CredsData {
    /// Registry ACL token.
    token: String,
}

/// Token provider backed by a secret store's registry secrets engine.
#[derive(Debug, Clone)]
pub struct SecretStoreTokenProvider {
    /// Credential endpoint for the configured role.
    creds_url: Url,
    /// Timeout applied to every secret-store call.
    timeout: Duration,
}

impl SecretStoreTokenProvider {
    /// Creates a provider for `role` at the secret store rooted at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`SecretStoreError`] when the URL cannot carry a path or the
    /// role is empty.
    pub fn new(base_url: &Url, role: &str, timeout: Duration) -> Result<Self, SecretStoreError> {
        let role = role.trim();
        if role.is_empty() {
            return Err(SecretStoreError::InvalidRole);
        }
        let mut creds_url = base_url.clone();
        creds_url
            .path_segments_mut()
            .map_err(|()| SecretStoreError::InvalidUrl)?
            .pop_if_empty()
            .extend(["v1", "consul", "creds", role]);
        creds_url.set_query(None);
        Ok(Self {
            creds_url,
            timeout,
        })
    }

    /// Returns the credential endpoint.
    #[must_use]
    pub const fn creds_url(&self) -> &Url {
        &self.creds_url
    }
}

impl TokenProvider for SecretStoreTokenProvider {
    fn acquire_token(&self, context: &RequestContext) -> Result<AccessToken, TokenError> {
        let caller = context
            .caller_token
            .as_ref()
            .filter(|token| !token.is_empty())
            .ok_or_else(|| TokenError::new(401, "missing secret store token"))?;
        let client = build_client(self.timeout).map_err(|err| TokenError::new(500, err))?;
        let mut response = client
            .get(self.creds_url.clone())
            .header(SECRET_STORE_TOKEN_HEADER, caller.expose())
            .send()
            .map_err(|_| TokenError::new(503, "secret store unreachable"))?;
        let status = response.status();
        if status != StatusCode::OK {
            return Err(TokenError::new(
                status.as_u16(),
                format!("secret store returned status {}", status.as_u16()),
            ));
        }
        let body = read_response_limited(&mut response, MAX_CREDS_RESPONSE_BYTES)
            .map_err(|err| TokenError::new(500, err))?;
        let creds: CredsResponse = serde_json::from_slice(&body)
            .map_err(|_| TokenError::new(500, "invalid secret store response"))?;
        if creds.data.token.trim().is_empty() {
            return Err(TokenError::new(500, "secret store issued an empty token"));
        }
        Ok(AccessToken::new(creds.data.token))
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Secret-store provider construction errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SecretStoreError {
    /// Base URL cannot carry a path.
    #[error("secret store url cannot be used as a base")]
    InvalidUrl,
    /// Token role is empty.
    #[error("secret store token role must be non-empty")]
    InvalidRole,
}

// ============================================================================
// SECTION: Tests
// ============================================================================
