// crates/config-gateway-config/src/config.rs
// ============================================================================
// Module: Config Gateway Configuration
// Description: Configuration loading and validation for the config gateway.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: config-gateway-core, serde, toml, url
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! Missing or invalid configuration fails closed. Every section has defaults
//! so an empty file describes a local, insecure gateway talking to a registry
//! on `localhost:8500`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use config_gateway_core::RegistrySettings;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use url::Url;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "config-gateway.toml";
/// Environment variable used to override the config path.
pub(crate) const CONFIG_ENV_VAR: &str = "CONFIG_GATEWAY_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum length of a registry host name.
pub(crate) const MAX_HOST_LENGTH: usize = 253;
/// Minimum outbound timeout in milliseconds.
pub(crate) const MIN_TIMEOUT_MS: u64 = 100;
/// Maximum outbound timeout in milliseconds.
pub(crate) const MAX_TIMEOUT_MS: u64 = 60_000;
/// Default outbound timeout in milliseconds.
pub(crate) const DEFAULT_TIMEOUT_MS: u64 = 5_000;
/// Default HTTP bind address.
pub(crate) const DEFAULT_BIND: &str = "127.0.0.1:4000";
/// Default registry port.
pub(crate) const DEFAULT_REGISTRY_PORT: u16 = 8500;
/// Default namespace stem under which service trees live.
pub(crate) const DEFAULT_CONFIG_REGISTRY_STEM: &str = "edgex/appservices/";
/// Default service version path segment.
pub(crate) const DEFAULT_SERVICE_VERSION: &str = "2.0";
/// Default secret-store role used for registry token issuance.
pub(crate) const DEFAULT_TOKEN_ROLE: &str = "config-gateway";

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Config gateway configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// HTTP server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Registry connection configuration.
    #[serde(default)]
    pub registry: RegistryConfig,
    /// Registry token acquisition configuration.
    #[serde(default)]
    pub security: SecurityConfig,
    /// Audit logging configuration.
    #[serde(default)]
    pub audit: AuditConfig,
}

impl GatewayConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.registry.validate()?;
        self.security.validate()?;
        self.audit.validate()
    }

    /// Returns the registry settings handed to the client resolver.
    #[must_use]
    pub fn registry_settings(&self) -> RegistrySettings {
        RegistrySettings {
            host: self.registry.host.trim().to_string(),
            port: self.registry.port,
            registry_type: self.registry.registry_type.as_str().to_string(),
            config_registry_stem: self.registry.config_registry_stem.clone(),
            service_version: self.registry.service_version.clone(),
        }
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Bind address for the HTTP listener.
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Maximum request body size in bytes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl ServerConfig {
    /// Returns the parsed bind address.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the bind address is not a socket address.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.bind
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid("invalid bind address".to_string()))
    }

    /// Validates server configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_body_bytes == 0 {
            return Err(ConfigError::Invalid(
                "max_body_bytes must be greater than zero".to_string(),
            ));
        }
        self.bind_addr().map(|_| ())
    }
}

/// Supported registry backends.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum RegistryType {
    /// Consul key/value store.
    #[default]
    Consul,
}

impl RegistryType {
    /// Returns the registry type name used in addresses and messages.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Consul => "consul",
        }
    }
}

/// Registry connection configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegistryConfig {
    /// Registry host name.
    #[serde(default = "default_registry_host")]
    pub host: String,
    /// Registry port.
    #[serde(default = "default_registry_port")]
    pub port: u16,
    /// Registry backend type.
    #[serde(default, rename = "type")]
    pub registry_type: RegistryType,
    /// Namespace stem prefixed to every service path.
    #[serde(default = "default_config_registry_stem")]
    pub config_registry_stem: String,
    /// Service version path segment.
    #[serde(default = "default_service_version")]
    pub service_version: String,
    /// Per-request timeout for registry calls in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            host: default_registry_host(),
            port: default_registry_port(),
            registry_type: RegistryType::default(),
            config_registry_stem: default_config_registry_stem(),
            service_version: default_service_version(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl RegistryConfig {
    /// Returns the registry call timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Validates registry configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        let host = self.host.trim();
        if host.is_empty() {
            return Err(ConfigError::Invalid("registry.host must be non-empty".to_string()));
        }
        if host.len() > MAX_HOST_LENGTH {
            return Err(ConfigError::Invalid("registry.host exceeds max length".to_string()));
        }
        if host.contains(['/', '?', '#', ' ']) {
            return Err(ConfigError::Invalid(
                "registry.host must be a bare host name".to_string(),
            ));
        }
        if self.port == 0 {
            return Err(ConfigError::Invalid("registry.port must be greater than zero".to_string()));
        }
        if self.config_registry_stem.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "registry.config_registry_stem must be non-empty".to_string(),
            ));
        }
        if self.config_registry_stem.starts_with('/') {
            return Err(ConfigError::Invalid(
                "registry.config_registry_stem must be relative".to_string(),
            ));
        }
        let version = self.service_version.trim();
        if version.is_empty() || version.contains('/') {
            return Err(ConfigError::Invalid(
                "registry.service_version must be a single non-empty segment".to_string(),
            ));
        }
        validate_timeout("registry.timeout_ms", self.timeout_ms)
    }
}

/// Registry token acquisition configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SecurityConfig {
    /// Enables secured mode.
    #[serde(default)]
    pub enabled: bool,
    /// Base URL of the secret store issuing registry tokens.
    #[serde(default)]
    pub secret_store_url: Option<String>,
    /// Secret-store role used to issue registry tokens.
    #[serde(default = "default_token_role")]
    pub token_role: String,
    /// Per-request timeout for secret-store calls in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            secret_store_url: None,
            token_role: default_token_role(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl SecurityConfig {
    /// Returns the secret-store call timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Returns the parsed secret-store URL when configured.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the URL is missing in secured mode or is
    /// not an http(s) URL.
    pub fn secret_store_url(&self) -> Result<Option<Url>, ConfigError> {
        let Some(raw) = self.secret_store_url.as_deref() else {
            if self.enabled {
                return Err(ConfigError::Invalid(
                    "security.secret_store_url is required when security is enabled".to_string(),
                ));
            }
            return Ok(None);
        };
        let url = Url::parse(raw.trim())
            .map_err(|_| ConfigError::Invalid("security.secret_store_url is invalid".to_string()))?;
        match url.scheme() {
            "http" | "https" => Ok(Some(url)),
            _ => Err(ConfigError::Invalid(
                "security.secret_store_url must use http or https".to_string(),
            )),
        }
    }

    /// Validates security configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        self.secret_store_url()?;
        if self.enabled {
            let role = self.token_role.trim();
            if role.is_empty() {
                return Err(ConfigError::Invalid(
                    "security.token_role must be non-empty".to_string(),
                ));
            }
            if role.contains(['/', '?', '#']) {
                return Err(ConfigError::Invalid(
                    "security.token_role must be a single path segment".to_string(),
                ));
            }
        }
        validate_timeout("security.timeout_ms", self.timeout_ms)
    }
}

/// Audit logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuditConfig {
    /// Enables audit event emission.
    #[serde(default = "default_audit_enabled")]
    pub enabled: bool,
    /// Optional audit log path (JSON lines); stderr when unset.
    #[serde(default)]
    pub path: Option<String>,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: default_audit_enabled(),
            path: None,
        }
    }
}

impl AuditConfig {
    /// Validates audit configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(path) = &self.path {
            validate_path_string("audit.path", path)?;
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from CLI or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against security limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(trimmed).components() {
        let component_value = component.as_os_str().to_string_lossy();
        if component_value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

/// Validates an outbound timeout against the allowed range.
fn validate_timeout(field: &str, value: u64) -> Result<(), ConfigError> {
    if (MIN_TIMEOUT_MS ..= MAX_TIMEOUT_MS).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::Invalid(format!(
            "{field} must be between {MIN_TIMEOUT_MS} and {MAX_TIMEOUT_MS}"
        )))
    }
}

/// Default HTTP bind address.
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}

/// Default maximum request body size in bytes.
pub(crate) const fn default_max_body_bytes() -> usize {
    1024 * 1024
}

/// Default registry host.
fn default_registry_host() -> String {
    "localhost".to_string()
}

/// Default registry port.
const fn default_registry_port() -> u16 {
    DEFAULT_REGISTRY_PORT
}

/// Default namespace stem.
fn default_config_registry_stem() -> String {
    DEFAULT_CONFIG_REGISTRY_STEM.to_string()
}

/// Default service version segment.
fn default_service_version() -> String {
    DEFAULT_SERVICE_VERSION.to_string()
}

/// Default outbound timeout in milliseconds.
const fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

/// Default secret-store role.
fn default_token_role() -> String {
    DEFAULT_TOKEN_ROLE.to_string()
}

/// Audit logging is on unless disabled explicitly.
const fn default_audit_enabled() -> bool {
    true
}
