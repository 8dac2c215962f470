// crates/config-gateway-server/src/server.rs
// ============================================================================
// Module: Gateway HTTP Server
// Description: axum routes for deploying and fetching service configuration.
// Purpose: Translate HTTP requests into gateway workflow calls.
// Dependencies: config-gateway-core, config-gateway-config, config-gateway-registry, axum, tokio
// ============================================================================

//! ## Overview
//! Routes:
//! - `PUT /api/v2/registrycenter/config/{servicekey}`: deploy, 204 on success
//! - `GET /api/v2/registrycenter/config/{servicekey}`: fetch, 200 JSON
//! - `GET /api/v2/ping`: gateway liveness
//!
//! Failures answer with the workflow's status and a plain-text message.
//! Workflows are blocking and run on the blocking thread pool. Bodies larger
//! than `server.max_body_bytes` are rejected with 413 before decoding.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use axum::Router;
use axum::body::Bytes;
use axum::extract::ConnectInfo;
use axum::extract::DefaultBodyLimit;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::StatusCode;
use axum::http::header::AUTHORIZATION;
use axum::http::header::CONTENT_TYPE;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::routing::get;
use config_gateway_config::AuditConfig;
use config_gateway_config::GatewayConfig;
use config_gateway_core::AccessToken;
use config_gateway_core::ClientResolver;
use config_gateway_core::ConfigGateway;
use config_gateway_core::GatewayError;
use config_gateway_core::JSON_CONTENT_TYPE;
use config_gateway_core::Operation;
use config_gateway_core::RequestContext;
use config_gateway_core::SecurityGate;
use config_gateway_registry::ConsulClientFactory;
use config_gateway_registry::SECRET_STORE_TOKEN_HEADER;
use config_gateway_registry::SecretStoreTokenProvider;
use thiserror::Error;

use crate::audit::GatewayAuditEvent;
use crate::audit::GatewayAuditEventParams;
use crate::audit::GatewayAuditSink;
use crate::audit::GatewayFileAuditSink;
use crate::audit::GatewayNoopAuditSink;
use crate::audit::GatewayStderrAuditSink;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Route serving deploy and fetch.
pub const CONFIG_ROUTE: &str = "/api/v2/registrycenter/config/{servicekey}";
/// Route serving gateway liveness.
pub const PING_ROUTE: &str = "/api/v2/ping";
/// Header carrying a caller-supplied request identifier.
pub const CORRELATION_ID_HEADER: &str = "X-Correlation-ID";
/// Maximum accepted correlation identifier length.
const MAX_CORRELATION_ID_LENGTH: usize = 128;

// ============================================================================
// SECTION: Gateway Server
// ============================================================================

/// Config gateway HTTP server instance.
pub struct GatewayServer {
    /// Socket address to bind.
    bind: SocketAddr,
    /// Shared handler state.
    state: Arc<ServerState>,
}

impl GatewayServer {
    /// Builds a server from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] when configuration is invalid or a collaborator
    /// cannot be initialized.
    pub fn from_config(config: &GatewayConfig) -> Result<Self, ServerError> {
        config.validate().map_err(|err| ServerError::Config(err.to_string()))?;
        let bind = config.server.bind_addr().map_err(|err| ServerError::Config(err.to_string()))?;
        let gateway = build_gateway(config)?;
        if !gateway.gate().is_enabled() {
            emit_insecure_warning();
        }
        let audit = build_audit_sink(&config.audit)?;
        let state = Arc::new(ServerState::new(gateway, config.server.max_body_bytes, audit));
        Ok(Self {
            bind,
            state,
        })
    }

    /// Returns the configured bind address.
    #[must_use]
    pub const fn bind_addr(&self) -> SocketAddr {
        self.bind
    }

    /// Serves HTTP requests until the listener fails.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] when binding or serving fails.
    pub async fn serve(self) -> Result<(), ServerError> {
        let app = router(self.state);
        let listener = tokio::net::TcpListener::bind(self.bind)
            .await
            .map_err(|_| ServerError::Transport("http bind failed".to_string()))?;
        axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
            .await
            .map_err(|_| ServerError::Transport("http server failed".to_string()))
    }
}

/// Builds the gateway workflows from configuration.
///
/// # Errors
///
/// Returns [`ServerError`] when the secret-store provider cannot be built.
pub fn build_gateway(config: &GatewayConfig) -> Result<ConfigGateway, ServerError> {
    let factory = ConsulClientFactory::new(config.registry.timeout());
    let resolver = ClientResolver::new(config.registry_settings(), Arc::new(factory));
    let gate = if config.security.enabled {
        let url = config
            .security
            .secret_store_url()
            .map_err(|err| ServerError::Config(err.to_string()))?
            .ok_or_else(|| ServerError::Config("secret store url required".to_string()))?;
        let provider = SecretStoreTokenProvider::new(
            &url,
            &config.security.token_role,
            config.security.timeout(),
        )
        .map_err(|err| ServerError::Init(err.to_string()))?;
        SecurityGate::enabled(Arc::new(provider))
    } else {
        SecurityGate::disabled()
    };
    Ok(ConfigGateway::new(gate, resolver))
}

/// Builds the audit sink selected by configuration.
///
/// # Errors
///
/// Returns [`ServerError`] when the audit log file cannot be opened.
pub fn build_audit_sink(config: &AuditConfig) -> Result<Arc<dyn GatewayAuditSink>, ServerError> {
    if !config.enabled {
        return Ok(Arc::new(GatewayNoopAuditSink));
    }
    match config.path.as_deref() {
        Some(path) => {
            let sink = GatewayFileAuditSink::new(Path::new(path))
                .map_err(|_| ServerError::Init("audit log open failed".to_string()))?;
            Ok(Arc::new(sink))
        }
        None => Ok(Arc::new(GatewayStderrAuditSink)),
    }
}

/// Warns that registry calls run without an ACL token.
fn emit_insecure_warning() {
    let _ = writeln!(
        std::io::stderr(),
        "config-gateway: WARNING: security is disabled; registry calls carry no ACL token"
    );
}

// ============================================================================
// SECTION: Router
// ============================================================================

/// Shared state for HTTP handlers.
pub struct ServerState {
    /// Gateway workflows.
    gateway: ConfigGateway,
    /// Maximum allowed request body size.
    max_body_bytes: usize,
    /// Audit sink for request events.
    audit: Arc<dyn GatewayAuditSink>,
    /// Counter for generated request identifiers.
    next_request_id: AtomicU64,
}

impl ServerState {
    /// Creates handler state.
    #[must_use]
    pub fn new(
        gateway: ConfigGateway,
        max_body_bytes: usize,
        audit: Arc<dyn GatewayAuditSink>,
    ) -> Self {
        Self {
            gateway,
            max_body_bytes,
            audit,
            next_request_id: AtomicU64::new(1),
        }
    }

    /// Builds the request context for an inbound HTTP request.
    fn request_context(&self, peer: SocketAddr, headers: &HeaderMap) -> RequestContext {
        let request_id = correlation_id(headers).unwrap_or_else(|| {
            format!("req-{}", self.next_request_id.fetch_add(1, Ordering::Relaxed))
        });
        RequestContext::http(Some(peer.ip()), caller_token(headers)).with_request_id(request_id)
    }

    /// Records the audit event for a finished request.
    fn record(&self, exchange: Exchange<'_>, reply: &Reply) {
        self.audit.record(&GatewayAuditEvent::new(GatewayAuditEventParams {
            request_id: exchange.context.request_id.clone().unwrap_or_default(),
            peer_ip: exchange.context.peer_ip.map(|ip| ip.to_string()),
            operation: exchange.operation,
            service_key: exchange.service_key.to_string(),
            status: reply.status.as_u16(),
            error_kind: reply.error_kind,
            request_bytes: exchange.request_bytes,
            response_bytes: reply.body_len(),
        }));
    }
}

/// Builds the gateway router over shared state.
#[must_use]
pub fn router(state: Arc<ServerState>) -> Router {
    let max_body_bytes = state.max_body_bytes;
    Router::new()
        .route(CONFIG_ROUTE, get(handle_fetch).put(handle_deploy))
        .route(PING_ROUTE, get(handle_ping))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .with_state(state)
}

// ============================================================================
// SECTION: Handlers
// ============================================================================

/// Handles deploy requests.
async fn handle_deploy(
    State(state): State<Arc<ServerState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    axum::extract::Path(service_key): axum::extract::Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let context = state.request_context(peer, &headers);
    let request_bytes = body.len();
    let gateway = state.gateway.clone();
    let task_context = context.clone();
    let task_key = service_key.clone();
    let joined =
        tokio::task::spawn_blocking(move || gateway.deploy(&task_context, &task_key, &body)).await;
    let reply = match joined {
        Ok(Ok(())) => Reply::no_content(),
        Ok(Err(err)) => Reply::failure(&err),
        Err(_) => Reply::worker_failure(),
    };
    state.record(
        Exchange {
            context: &context,
            operation: Operation::Deploy,
            service_key: &service_key,
            request_bytes,
        },
        &reply,
    );
    reply.into_response()
}

/// Handles fetch requests.
async fn handle_fetch(
    State(state): State<Arc<ServerState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    axum::extract::Path(service_key): axum::extract::Path<String>,
    headers: HeaderMap,
) -> Response {
    let context = state.request_context(peer, &headers);
    let gateway = state.gateway.clone();
    let task_context = context.clone();
    let task_key = service_key.clone();
    let joined =
        tokio::task::spawn_blocking(move || gateway.fetch(&task_context, &task_key)).await;
    let reply = match joined {
        Ok(Ok(body)) => Reply::json(body),
        Ok(Err(err)) => Reply::failure(&err),
        Err(_) => Reply::worker_failure(),
    };
    state.record(
        Exchange {
            context: &context,
            operation: Operation::Fetch,
            service_key: &service_key,
            request_bytes: 0,
        },
        &reply,
    );
    reply.into_response()
}

/// Handles gateway liveness probes.
async fn handle_ping() -> &'static str {
    "pong"
}

// ============================================================================
// SECTION: Request Parsing
// ============================================================================

/// Extracts the caller's secret-store token.
///
/// `X-Vault-Token` wins over `Authorization: Bearer`.
fn caller_token(headers: &HeaderMap) -> Option<AccessToken> {
    let direct = headers
        .get(SECRET_STORE_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|token| !token.is_empty());
    let bearer = || {
        headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
    };
    direct.or_else(bearer).map(AccessToken::new)
}

/// Returns a caller-supplied correlation id when it is printable and bounded.
fn correlation_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get(CORRELATION_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|id| {
            !id.is_empty()
                && id.len() <= MAX_CORRELATION_ID_LENGTH
                && id.chars().all(|ch| ch.is_ascii_graphic())
        })
        .map(str::to_string)
}

// ============================================================================
// SECTION: Responses
// ============================================================================

/// Request facts recorded alongside the reply.
struct Exchange<'a> {
    /// Request context.
    context: &'a RequestContext,
    /// Operation served.
    operation: Operation,
    /// Service key from the path.
    service_key: &'a str,
    /// Request body size in bytes.
    request_bytes: usize,
}

/// Response body variants.
enum ReplyBody {
    /// No body.
    Empty,
    /// JSON document.
    Json(Vec<u8>),
    /// Plain-text error message.
    Text(String),
}

/// Handler outcome prior to conversion into an HTTP response.
struct Reply {
    /// HTTP status.
    status: StatusCode,
    /// Response body.
    body: ReplyBody,
    /// Error label for audit.
    error_kind: Option<&'static str>,
}

impl Reply {
    /// Successful deploy.
    const fn no_content() -> Self {
        Self {
            status: StatusCode::NO_CONTENT,
            body: ReplyBody::Empty,
            error_kind: None,
        }
    }

    /// Successful fetch.
    const fn json(body: Vec<u8>) -> Self {
        Self {
            status: StatusCode::OK,
            body: ReplyBody::Json(body),
            error_kind: None,
        }
    }

    /// Workflow failure.
    fn failure(err: &GatewayError) -> Self {
        let status =
            StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        Self {
            status,
            body: ReplyBody::Text(err.to_string()),
            error_kind: Some(err.kind()),
        }
    }

    /// Blocking task panicked or was cancelled.
    fn worker_failure() -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: ReplyBody::Text("request handler failed".to_string()),
            error_kind: Some("internal"),
        }
    }

    /// Returns the response body size in bytes.
    fn body_len(&self) -> usize {
        match &self.body {
            ReplyBody::Empty => 0,
            ReplyBody::Json(body) => body.len(),
            ReplyBody::Text(message) => message.len(),
        }
    }
}

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        match self.body {
            ReplyBody::Empty => self.status.into_response(),
            ReplyBody::Json(body) => {
                (self.status, [(CONTENT_TYPE, JSON_CONTENT_TYPE)], body).into_response()
            }
            ReplyBody::Text(message) => (self.status, message).into_response(),
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Gateway server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Configuration errors.
    #[error("config error: {0}")]
    Config(String),
    /// Initialization errors.
    #[error("init error: {0}")]
    Init(String),
    /// Transport errors.
    #[error("transport error: {0}")]
    Transport(String),
}

// ============================================================================
// SECTION: Tests
// ============================================================================
