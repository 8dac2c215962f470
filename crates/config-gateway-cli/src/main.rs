// crates/config-gateway-cli/src/main.rs
// ============================================================================
// Module: Config Gateway CLI Entry Point
// Description: Command dispatcher for serving and one-shot gateway workflows.
// Purpose: Run the HTTP server or deploy/fetch a service configuration locally.
// Dependencies: clap, config-gateway-config, config-gateway-core, config-gateway-server, tokio
// ============================================================================

//! ## Overview
//! The `config-gateway` binary starts the HTTP server, validates configuration,
//! or runs a single deploy or fetch directly against the configured registry.
//! One-shot commands use the same workflows as the server, so failures carry
//! the same messages; the HTTP status class is reported alongside.

// ============================================================================
// SECTION: Modules
// ============================================================================


// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::File;
use std::io::Read;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Args;
use clap::Parser;
use clap::Subcommand;
use config_gateway_config::GatewayConfig;
use config_gateway_core::AccessToken;
use config_gateway_core::ConfigGateway;
use config_gateway_core::GatewayError;
use config_gateway_core::RequestContext;
use config_gateway_server::GatewayServer;
use config_gateway_server::build_gateway;
use thiserror::Error;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "config-gateway", version, disable_help_subcommand = true)]
struct Cli {
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the config gateway HTTP server.
    Serve(ServeCommand),
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
    /// Replace a service's stored configuration with a JSON document.
    Deploy(DeployCommand),
    /// Print a service's stored configuration as JSON.
    Fetch(FetchCommand),
}

/// Arguments for the `serve` command.
#[derive(Args, Debug)]
struct ServeCommand {
    /// Optional config file path (defaults to config-gateway.toml or env override).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Configuration subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Validate a config gateway configuration file.
    Validate(ConfigValidateCommand),
}

/// Arguments for config validation.
#[derive(Args, Debug)]
struct ConfigValidateCommand {
    /// Optional config file path (defaults to config-gateway.toml or env override).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Arguments for the `deploy` command.
#[derive(Args, Debug)]
struct DeployCommand {
    /// Service key whose configuration is replaced.
    #[arg(long, value_name = "KEY")]
    service_key: String,
    /// Path to the JSON configuration document.
    #[arg(long, value_name = "PATH")]
    input: PathBuf,
    /// Optional config file path (defaults to config-gateway.toml or env override).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Secret-store token exchanged for a registry ACL token (secured mode).
    #[arg(long, value_name = "TOKEN")]
    secret_store_token: Option<String>,
}

/// Arguments for the `fetch` command.
#[derive(Args, Debug)]
struct FetchCommand {
    /// Service key whose configuration is read.
    #[arg(long, value_name = "KEY")]
    service_key: String,
    /// Optional config file path (defaults to config-gateway.toml or env override).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Secret-store token exchanged for a registry ACL token (secured mode).
    #[arg(long, value_name = "TOKEN")]
    secret_store_token: Option<String>,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper for user-facing messages.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`].
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }

    /// Wraps a workflow failure with its status class.
    fn workflow(err: &GatewayError) -> Self {
        Self::new(format!("{} (status {})", err, err.status_code()))
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

/// Bounded file read failures.
#[derive(Debug, Error)]
enum ReadLimitError {
    /// File could not be opened or read.
    #[error("{0}")]
    Io(std::io::Error),
    /// File exceeds the size limit.
    #[error("file is {size} bytes, limit is {limit}")]
    TooLarge {
        /// Observed size in bytes.
        size: u64,
        /// Configured limit in bytes.
        limit: usize,
    },
}

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    match run(Cli::parse()).await {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
async fn run(cli: Cli) -> CliResult<ExitCode> {
    match cli.command {
        Commands::Serve(command) => command_serve(command).await,
        Commands::Config {
            command,
        } => match command {
            ConfigCommand::Validate(command) => command_config_validate(&command),
        },
        Commands::Deploy(command) => command_deploy(command).await,
        Commands::Fetch(command) => command_fetch(command).await,
    }
}

// ============================================================================
// SECTION: Commands
// ============================================================================

/// Executes the `serve` command.
async fn command_serve(command: ServeCommand) -> CliResult<ExitCode> {
    let config = load_config(command.config.as_deref())?;
    let server = GatewayServer::from_config(&config)
        .map_err(|err| CliError::new(format!("server init failed: {err}")))?;
    write_stderr_line(&format!("config-gateway: listening on {}", server.bind_addr()))
        .map_err(|err| CliError::new(output_error("stderr", &err)))?;
    server.serve().await.map_err(|err| CliError::new(format!("server failed: {err}")))?;
    Ok(ExitCode::SUCCESS)
}

/// Executes the `config validate` command.
fn command_config_validate(command: &ConfigValidateCommand) -> CliResult<ExitCode> {
    let _config = load_config(command.config.as_deref())?;
    write_stdout_line("config ok").map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

/// Executes the `deploy` command.
async fn command_deploy(command: DeployCommand) -> CliResult<ExitCode> {
    let config = load_config(command.config.as_deref())?;
    let payload = read_bytes_with_limit(&command.input, config.server.max_body_bytes)
        .map_err(|err| {
            CliError::new(format!("failed to read {}: {err}", command.input.display()))
        })?;
    let gateway = build_cli_gateway(&config)?;
    let context = local_context(&gateway, command.secret_store_token)?;
    let service_key = command.service_key;
    tokio::task::spawn_blocking(move || gateway.deploy(&context, &service_key, &payload))
        .await
        .map_err(|err| CliError::new(format!("deploy task failed: {err}")))?
        .map_err(|err| CliError::workflow(&err))?;
    write_stdout_line("deployed").map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

/// Executes the `fetch` command.
async fn command_fetch(command: FetchCommand) -> CliResult<ExitCode> {
    let config = load_config(command.config.as_deref())?;
    let gateway = build_cli_gateway(&config)?;
    let context = local_context(&gateway, command.secret_store_token)?;
    let service_key = command.service_key;
    let body = tokio::task::spawn_blocking(move || gateway.fetch(&context, &service_key))
        .await
        .map_err(|err| CliError::new(format!("fetch task failed: {err}")))?
        .map_err(|err| CliError::workflow(&err))?;
    write_stdout_bytes(&body).map_err(|err| CliError::new(output_error("stdout", &err)))?;
    write_stdout_line("").map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Loads and validates configuration.
fn load_config(path: Option<&Path>) -> CliResult<GatewayConfig> {
    GatewayConfig::load(path).map_err(|err| CliError::new(format!("config load failed: {err}")))
}

/// Builds gateway workflows for one-shot commands.
fn build_cli_gateway(config: &GatewayConfig) -> CliResult<ConfigGateway> {
    build_gateway(config).map_err(|err| CliError::new(format!("gateway init failed: {err}")))
}

/// Builds the request context for a one-shot command.
///
/// Secured mode requires a caller token.
fn local_context(
    gateway: &ConfigGateway,
    secret_store_token: Option<String>,
) -> CliResult<RequestContext> {
    let token = secret_store_token.filter(|token| !token.trim().is_empty());
    if gateway.gate().is_enabled() && token.is_none() {
        return Err(CliError::new(
            "security is enabled; --secret-store-token is required".to_string(),
        ));
    }
    Ok(RequestContext::local(token.map(AccessToken::new)).with_request_id("cli"))
}

/// Reads a file while enforcing a size limit.
fn read_bytes_with_limit(path: &Path, max_bytes: usize) -> Result<Vec<u8>, ReadLimitError> {
    let file = File::open(path).map_err(ReadLimitError::Io)?;
    let size = file.metadata().map_err(ReadLimitError::Io)?.len();
    let limit = u64::try_from(max_bytes).unwrap_or(u64::MAX);
    if size > limit {
        return Err(ReadLimitError::TooLarge {
            size,
            limit: max_bytes,
        });
    }
    let mut bytes = Vec::new();
    file.take(limit.saturating_add(1)).read_to_end(&mut bytes).map_err(ReadLimitError::Io)?;
    if bytes.len() > max_bytes {
        return Err(ReadLimitError::TooLarge {
            size: u64::try_from(bytes.len()).unwrap_or(u64::MAX),
            limit: max_bytes,
        });
    }
    Ok(bytes)
}

/// Writes a line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes raw bytes to stdout without adding a newline.
fn write_stdout_bytes(bytes: &[u8]) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    stdout.write_all(bytes)
}

/// Writes a line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Formats an output stream failure.
fn output_error(stream: &str, error: &std::io::Error) -> String {
    format!("failed to write to {stream}: {error}")
}

/// Emits an error message and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
