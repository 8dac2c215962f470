// crates/config-gateway-core/src/core/identifiers.rs
// ============================================================================
// Module: Config Gateway Identifiers
// Description: Service keys and opaque access tokens.
// Purpose: Provide strongly typed request identifiers with stable wire forms.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! A [`ServiceKey`] names the service whose configuration subtree a request
//! targets. It is used verbatim when composing the registry namespace, so it
//! must be exactly one path segment: non-empty, free of `/`, and neither `.`
//! nor `..`. An [`AccessToken`] is an opaque registry
//! credential that lives for one request and never prints its value.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Service Key
// ============================================================================

/// Identifier naming a deployed service.
///
/// # Invariants
/// - Never empty.
/// - Names exactly one namespace segment: no `/`, not `.` or `..`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ServiceKey(String);

impl ServiceKey {
    /// Creates a service key from caller input.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidServiceKey`] when the value is empty, contains `/`,
    /// or is a dot segment.
    pub fn new(key: impl Into<String>) -> Result<Self, InvalidServiceKey> {
        let key = key.into();
        if key.is_empty() || key.contains('/') || key == "." || key == ".." {
            return Err(InvalidServiceKey);
        }
        Ok(Self(key))
    }

    /// Returns the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ServiceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl TryFrom<&str> for ServiceKey {
    type Error = InvalidServiceKey;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Rejected service key input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("service key must be a single non-empty path segment")]
pub struct InvalidServiceKey;

// ============================================================================
// SECTION: Access Token
// ============================================================================

/// Opaque registry access credential.
///
/// # Invariants
/// - Empty when security is disabled.
/// - `Debug` output never contains the token value.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    /// Wraps a token issued by a token provider.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the empty token used when security is disabled.
    #[must_use]
    pub const fn empty() -> Self {
        Self(String::new())
    }

    /// Returns true when no credential is attached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the raw token value for attaching to outbound requests.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            f.write_str("AccessToken(<empty>)")
        } else {
            f.write_str("AccessToken(<redacted>)")
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::panic,
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::use_debug,
        reason = "Test-only assertions."
    )]

    use super::AccessToken;
    use super::InvalidServiceKey;
    use super::ServiceKey;

    #[test]
    fn service_key_rejects_empty_input() {
        assert_eq!(ServiceKey::new(""), Err(InvalidServiceKey));
    }

    #[test]
    fn service_key_is_used_verbatim() {
        let key = ServiceKey::new(" device mqtt.v2").expect("single segment");
        assert_eq!(key.as_str(), " device mqtt.v2");
    }

    #[test]
    fn service_key_rejects_path_traversal() {
        for key in [".", "..", "a/b", "../other-service", "device-mqtt/"] {
            assert_eq!(ServiceKey::new(key), Err(InvalidServiceKey), "{key}");
        }
        assert!(ServiceKey::new("...").is_ok());
    }

    #[test]
    fn access_token_debug_is_redacted() {
        let token = AccessToken::new("s3cr3t");
        let rendered = format!("{token:?}");
        assert!(!rendered.contains("s3cr3t"));
        assert_eq!(format!("{:?}", AccessToken::empty()), "AccessToken(<empty>)");
    }
}
