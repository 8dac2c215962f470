// crates/config-gateway-registry/src/http.rs
// ============================================================================
// Module: Bounded HTTP Helpers
// Description: Shared blocking HTTP client construction and body limits.
// Purpose: Keep outbound calls bounded in time and size.
// Dependencies: reqwest
// ============================================================================

//! ## Overview
//! Outbound clients never follow redirects and always carry a timeout.
//! Response bodies are read through [`read_response_limited`], which rejects
//! bodies larger than the configured limit and truncated bodies.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Read;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::blocking::Response;
use reqwest::redirect::Policy;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default maximum response size accepted from upstream services.
pub const DEFAULT_MAX_RESPONSE_BYTES: usize = 4 * 1024 * 1024;
/// User agent sent on outbound requests.
const USER_AGENT: &str = concat!("config-gateway/", env!("CARGO_PKG_VERSION"));

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Builds a blocking client with the gateway's outbound policy.
///
/// # Errors
///
/// Returns a diagnostic message when the client cannot be built.
pub fn build_client(timeout: Duration) -> Result<Client, &'static str> {
    Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .redirect(Policy::none())
        .build()
        .map_err(|_| "http client build failed")
}

/// Reads the response body while enforcing a byte limit.
///
/// # Errors
///
/// Returns a diagnostic message when the body is too large, truncated, or
/// unreadable.
pub fn read_response_limited(
    response: &mut Response,
    max_bytes: usize,
) -> Result<Vec<u8>, &'static str> {
    let expected_len = response.content_length();
    let max_bytes_u64 = u64::try_from(max_bytes).map_err(|_| "response size limit exceeds u64")?;
    if let Some(expected) = expected_len
        && expected > max_bytes_u64
    {
        return Err("http response exceeds size limit");
    }
    let mut buf = Vec::new();
    let limit = max_bytes_u64.saturating_add(1);
    let mut handle = response.take(limit);
    handle.read_to_end(&mut buf).map_err(|_| "failed to read response")?;
    if buf.len() > max_bytes {
        return Err("http response exceeds size limit");
    }
    if let Some(expected) = expected_len {
        let expected = usize::try_from(expected).map_err(|_| "invalid response length")?;
        if buf.len() < expected {
            return Err("http response truncated");
        }
    }
    Ok(buf)
}
