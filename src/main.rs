#![cfg_attr(not(test), deny(clippy::panic))]

use clap::Parser;
use pairline_server::config;
use pairline_server::logging;
use pairline_server::server::{ChatServer, ServerConfig};
use pairline_server::verification::build_verifier;
use pairline_server::websocket;
use std::net::SocketAddr;
use tokio_util::sync::CancellationToken;

/// Pairline -- anonymous random one-to-one chat over WebSocket
#[derive(Parser, Debug)]
#[command(name = "pairline-server")]
#[command(about = "An in-memory WebSocket server that pairs strangers for one-to-one chat")]
#[command(version)]
struct Cli {
    /// Validate configuration and exit without starting the server.
    /// Useful for CI/CD pipelines and pre-deployment checks.
    #[arg(long, short = 'c', conflicts_with = "print_config")]
    validate_config: bool,

    /// Print the loaded configuration to stdout (as JSON) and exit.
    #[arg(long, conflicts_with = "validate_config")]
    print_config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let cfg = config::load();

    if cli.print_config {
        let json = serde_json::to_string_pretty(&cfg)
            .map_err(|e| anyhow::anyhow!("Failed to serialize config: {e}"))?;
        println!("{json}");
        return Ok(());
    }

    // load() only reports problems on stderr; here they become fatal.
    let validation_result = config::validate_config(&cfg);

    if cli.validate_config {
        match validation_result {
            Ok(()) => {
                println!("Configuration validation passed");
                println!();
                println!("Configuration summary:");
                println!("  Port: {}", cfg.port);
                println!(
                    "  Liveness interval: {}s",
                    cfg.server.liveness_interval_secs
                );
                println!("  Join timeout: {}s", cfg.websocket.join_timeout_secs);
                println!(
                    "  Max display name length: {}",
                    cfg.protocol.max_display_name_length
                );
                println!("  Human verification: {}", cfg.verification.enabled);
                println!(
                    "  Metrics auth required: {}",
                    cfg.security.require_metrics_auth
                );
                return Ok(());
            }
            Err(e) => {
                eprintln!("Configuration validation failed:\n{e}");
                std::process::exit(1);
            }
        }
    }

    validation_result?;

    let _log_guard = logging::init_with_config(&cfg.logging);

    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.port));
    tracing::info!(%addr, "Starting Pairline server");

    let verifier = build_verifier(&cfg.verification)?;
    let server = ChatServer::new(
        ServerConfig::from_config(&cfg),
        cfg.protocol.clone(),
        verifier,
    );

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => tracing::info!("Shutdown signal received"),
            Err(err) => tracing::error!(error = %err, "Failed to listen for shutdown signal"),
        }
        signal_token.cancel();
    });

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(
        %addr,
        cors_origins = %cfg.security.cors_origins,
        "Server started over HTTP - WebSocket: /ws (and /socket), Metrics: /metrics"
    );

    websocket::run_server(listener, server, &cfg.security.cors_origins, shutdown).await?;

    tracing::info!("Server stopped");
    Ok(())
}

#[cfg(test)]
mod cli_tests {
    use super::Cli;
    use clap::Parser;

    #[test]
    fn test_cli_default_no_flags() {
        let cli = Cli::try_parse_from(["pairline-server"]).unwrap();
        assert!(!cli.validate_config);
        assert!(!cli.print_config);
    }

    #[test]
    fn test_cli_validate_config_short() {
        let cli = Cli::try_parse_from(["pairline-server", "-c"]).unwrap();
        assert!(cli.validate_config);
        assert!(!cli.print_config);
    }

    #[test]
    fn test_cli_print_config() {
        let cli = Cli::try_parse_from(["pairline-server", "--print-config"]).unwrap();
        assert!(!cli.validate_config);
        assert!(cli.print_config);
    }

    #[test]
    fn test_cli_validate_and_print_config_conflict() {
        let result = Cli::try_parse_from(["pairline-server", "--validate-config", "--print-config"]);
        let err = result.unwrap_err();
        assert!(err.to_string().contains("cannot be used with"));
    }

    #[test]
    fn test_cli_help_contains_flags() {
        let err = Cli::try_parse_from(["pairline-server", "--help"]).unwrap_err();
        let help_text = err.to_string();
        assert!(help_text.contains("--validate-config"));
        assert!(help_text.contains("--print-config"));
    }
}
