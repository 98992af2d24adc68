//! Toolwire Server - Headless Daemon
//!
//! A pure Rust HTTP server that:
//! - Exposes breaker, rate-limit and health status on /api/resilience/*
//! - Serves Prometheus metrics on /metrics
//! - Doubles as a CLI for one-off resilient probes against an upstream
//!
//! Access via: http://localhost:8046

use anyhow::Result;
use clap::Parser;
use std::io::Write;
use std::net::SocketAddr;
use std::process::ExitCode;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, warn};

mod api;
mod cli;
mod router;
mod state;
#[cfg(test)]
mod test_helpers;

use cli::{Cli, Commands, DEFAULT_PORT};
use state::AppState;
use toolwire_core::modules::{config, logger};
use toolwire_core::{CallOptions, ResilienceContext, ResilientClient, UpstreamResponse};
use toolwire_types::{CallError, ResilienceConfig};

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let config_path = config::resolve_config_path(cli.config.as_deref());
    let resilience_config = config::load_config(&config_path)
        .map_err(|e| anyhow::anyhow!("Failed to load {}: {}", config_path.display(), e))?;

    let _log_guard = logger::init_logging(&resilience_config.logging)?;

    match cli.command.unwrap_or(Commands::Serve { port: DEFAULT_PORT }) {
        Commands::Serve { port } => {
            let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;
            runtime.block_on(serve(resilience_config, port))?;
            Ok(ExitCode::SUCCESS)
        },
        Commands::Probe { url, upstream, method, retries, json } => {
            probe(resilience_config, &url, upstream, &method, retries, json)
        },
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&resilience_config)?);
            Ok(ExitCode::SUCCESS)
        },
    }
}

async fn serve(resilience_config: ResilienceConfig, port: u16) -> Result<()> {
    info!("Toolwire Server starting on port {}...", port);

    if let Err(e) = toolwire_core::metrics::init_metrics() {
        warn!(error = %e, "Prometheus recorder unavailable, /metrics will be empty");
    }

    let resilience = Arc::new(ResilienceContext::new(resilience_config)?);
    let state = AppState::new(resilience);
    let app = router::build_router(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("Server listening on http://{}", addr);
    info!("Resilience status at http://localhost:{}/api/resilience/health", port);

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

/// One blocking call through the full breaker/limiter/retry path.
fn probe(
    resilience_config: ResilienceConfig,
    url: &str,
    upstream: Option<String>,
    method: &str,
    retries: Option<u32>,
    json: bool,
) -> Result<ExitCode> {
    let method = reqwest::Method::from_str(&method.to_uppercase())
        .map_err(|e| anyhow::anyhow!("Invalid method '{}': {}", method, e))?;

    let ctx = Arc::new(ResilienceContext::new(resilience_config)?);
    let client = ResilientClient::new(ctx)?;

    let mut options = CallOptions::new(method, url);
    if let Some(name) = upstream {
        options = options.upstream(name);
    }
    if let Some(n) = retries {
        options = options.max_retries(n);
    }

    let succeeded = report_probe(client.call(&options), json, &mut std::io::stdout().lock())?;
    Ok(if succeeded { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

/// Print the outcome and report whether the call succeeded. In JSON mode a
/// failure is written to `out` instead of being returned as an error.
fn report_probe(
    result: Result<UpstreamResponse, CallError>,
    json: bool,
    out: &mut dyn Write,
) -> Result<bool> {
    match (result, json) {
        (Ok(response), true) => {
            let value = serde_json::json!({
                "upstream": response.upstream,
                "status": response.status.as_u16(),
                "attempts": response.attempts,
                "body": response.text(),
            });
            writeln!(out, "{}", serde_json::to_string_pretty(&value)?)?;
            Ok(true)
        },
        (Ok(response), false) => {
            writeln!(
                out,
                "{} {} after {} attempt(s)",
                response.upstream, response.status, response.attempts
            )?;
            Ok(true)
        },
        (Err(e), true) => {
            writeln!(out, "{}", serde_json::to_string_pretty(&e)?)?;
            Ok(false)
        },
        (Err(e), false) => Err(anyhow::anyhow!(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderMap;
    use reqwest::StatusCode;
    use toolwire_types::ErrorKind;

    fn success() -> UpstreamResponse {
        UpstreamResponse {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: "{}".into(),
            upstream: "fred".to_string(),
            attempts: 2,
        }
    }

    fn failure() -> CallError {
        CallError::new(ErrorKind::Server5xx, "fred", "HTTP 503 Service Unavailable").with_status(503)
    }

    #[test]
    fn test_json_failure_prints_once_and_fails() {
        let mut out = Vec::new();
        let succeeded = report_probe(Err(failure()), true, &mut out).unwrap();

        assert!(!succeeded);
        let printed: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(printed["kind"], "SERVER_5XX");
        assert_eq!(printed["status"], 503);
    }

    #[test]
    fn test_plain_failure_is_returned_as_error() {
        let mut out = Vec::new();
        let err = report_probe(Err(failure()), false, &mut out).unwrap_err();

        assert!(out.is_empty());
        assert!(err.to_string().contains("503"));
    }

    #[test]
    fn test_success_reports() {
        let mut out = Vec::new();
        assert!(report_probe(Ok(success()), false, &mut out).unwrap());
        assert_eq!(String::from_utf8(out).unwrap(), "fred 200 OK after 2 attempt(s)\n");

        let mut out = Vec::new();
        assert!(report_probe(Ok(success()), true, &mut out).unwrap());
        let printed: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(printed["attempts"], 2);
    }
}
