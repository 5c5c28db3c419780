//! Startup helpers for the summary client console.

use std::process::ExitCode;
use std::sync::Arc;

use tokio::io::BufReader;

use crate::console::{self, Console, ConsoleError};
use crate::gateway::{GatewayConfig, HttpSummaryGateway};
use crate::session::SessionTracker;

/// Run the interactive console (used by the `summary-client` binary).
///
/// # Returns
/// `ExitCode::SUCCESS` on EOF or `/quit`, `1` on failure.
#[must_use]
pub fn run() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    tracing::info!("Starting summary client v{}", env!("CARGO_PKG_VERSION"));

    let config = GatewayConfig::from_env();
    tracing::info!("Summarization endpoint: {}", config.base_url);

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("Failed to create runtime: {e}");
            return ExitCode::from(1);
        }
    };

    if let Err(e) = rt.block_on(serve(&config)) {
        tracing::error!("Console error: {e}");
        return ExitCode::from(1);
    }

    ExitCode::SUCCESS
}

/// Build a tracker backed by the HTTP gateway.
///
/// # Errors
/// Returns an error if the gateway cannot be created.
pub fn initialize(config: &GatewayConfig) -> Result<SessionTracker, ConsoleError> {
    let gateway = HttpSummaryGateway::new(config)?;
    Ok(SessionTracker::new(Arc::new(gateway), config.key_prefix.clone()))
}

/// Drive the console on stdin/stdout until EOF or `/quit`.
///
/// # Errors
/// Returns an error if the gateway cannot be created or stdio fails.
pub async fn serve(config: &GatewayConfig) -> Result<(), ConsoleError> {
    let mut console = Console::new(initialize(config)?);
    let input = BufReader::new(tokio::io::stdin());
    let mut output = tokio::io::stdout();
    console::run_console(&mut console, input, &mut output).await
}
