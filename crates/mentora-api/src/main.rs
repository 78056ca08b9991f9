//! Mentora server entry point.
//!
//! Binary name: `mentora`
//!
//! Loads configuration, builds the provider fallback chain, wires the
//! engine to the SQLite store, and serves the chat-adapter HTTP boundary.

mod http;
mod state;

use std::path::PathBuf;

use anyhow::bail;
use clap::Parser;

use state::AppState;

#[derive(Parser)]
#[command(name = "mentora", about = "AI tutoring backend core", version)]
struct Cli {
    /// Path to config.toml
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    /// Address to bind
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port to bind
    #[arg(long, default_value_t = 8600)]
    port: u16,

    /// Export spans to stdout via OpenTelemetry
    #[arg(long)]
    otel: bool,

    /// Emit logs as newline-delimited JSON
    #[arg(long)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_format = if cli.log_json {
        mentora_observe::tracing_setup::LogFormat::Json
    } else {
        mentora_observe::tracing_setup::LogFormat::Text
    };
    mentora_observe::tracing_setup::init_tracing(log_format, cli.otel)
        .map_err(|e| anyhow::anyhow!("tracing init failed: {e}"))?;

    let config = mentora_infra::config::load_config(&cli.config).await;
    let state = AppState::init(config).await?;

    // Refuse to serve a chain that can never answer.
    if !state.router.has_provider() {
        bail!(
            "no AI providers registered; configure [[providers]] in {} and set their API key env vars",
            cli.config.display()
        );
    }

    let addr = format!("{}:{}", cli.host, cli.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, providers = ?state.router.provider_names(), "mentora listening");

    let router = http::router::build_router(state);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    mentora_observe::tracing_setup::shutdown_tracing();
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
