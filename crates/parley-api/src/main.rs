//! Parley CLI and server entry point.
//!
//! Binary name: `parley`
//!
//! Parses CLI arguments, loads configuration from the data directory, then
//! dispatches to a command or starts the HTTP/WebSocket server.

mod cli;
mod http;
mod state;
mod sweeper;

use std::path::PathBuf;

use clap::Parser;
use parley_infra::config::load_server_config;
use parley_infra::filesystem::resolve_data_dir;
use parley_observe::tracing_setup::{TracingOptions, init_tracing, shutdown_tracing};
use parley_types::config::ServerConfig;
use tokio_util::sync::CancellationToken;

use cli::{Cli, Commands};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_tracing(&TracingOptions {
        default_filter: cli.log_filter().to_string(),
        json: cli.log_json,
        enable_otel: cli.otel,
    })
    .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

    let data_dir = resolve_data_dir();
    let mut config = load_server_config(&data_dir).await;

    let result = match cli.command {
        Commands::Serve { port, host } => {
            cli::apply_overrides(&mut config, host, port);
            serve(data_dir, config, cli.quiet).await
        }
        Commands::Characters => cli::characters::list_characters(&data_dir, cli.json).await,
        Commands::Config => cli::config::show_config(&data_dir, &config, cli.json),
    };

    shutdown_tracing();
    result
}

async fn serve(data_dir: PathBuf, config: ServerConfig, quiet: bool) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState::init(data_dir, config).await?;
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    if !quiet {
        println!(
            "  {} Parley listening on {}",
            console::style("⚡").bold(),
            console::style(format!("ws://{addr}/api/v1/session")).cyan()
        );
        println!("  {}", console::style("Press Ctrl+C to stop").dim());
    }

    let sweeper = sweeper::spawn_speech_sweeper(
        state.speech_registry.clone(),
        sweeper::SWEEP_INTERVAL,
        sweeper::SPEECH_MAX_AGE,
        state.shutdown.clone(),
    );

    let shutdown = state.shutdown.clone();
    let router = http::router::build_router(state);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .await?;

    // Stop the sweeper and any session still running.
    shutdown.cancel();
    let _ = sweeper.await;

    if !quiet {
        println!("\n  Server stopped.");
    }
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM, then cancel every running session.
async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for Ctrl+C: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!("failed to install SIGTERM handler: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
        _ = shutdown.cancelled() => {},
    }

    tracing::info!("shutting down");
    shutdown.cancel();
}
