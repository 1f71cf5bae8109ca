use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use zreport_api::background;
use zreport_api::config::ServerConfig;
use zreport_api::router::build_app_router;
use zreport_api::state::AppState;
use zreport_core::clock::SystemClock;

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "zreport_api=debug,zreport_zabbix=debug,zreport_core=info,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            tracing::error!("{message}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), String> {
    // --- Configuration ---
    let config = ServerConfig::from_env().map_err(|e| format!("Invalid configuration: {e}"))?;
    tracing::info!(
        host = %config.host,
        port = %config.port,
        auth_mode = config.auth_mode.as_str(),
        zabbix_url = %config.zabbix.url,
        "Loaded server configuration"
    );

    let addr = SocketAddr::new(
        config
            .host
            .parse()
            .map_err(|e| format!("Invalid HOST address '{}': {e}", config.host))?,
        config.port,
    );

    // --- App state ---
    let state = AppState::new(config, Arc::new(SystemClock))
        .map_err(|e| format!("Failed to build Zabbix client: {e}"))?;

    // --- Background tasks ---
    let cancel = CancellationToken::new();
    let sweep = tokio::spawn(background::session_sweep::run(
        Arc::clone(&state.sessions),
        background::session_sweep::SWEEP_INTERVAL,
        cancel.clone(),
    ));

    // --- Router ---
    let app = build_app_router(state).map_err(|e| e.to_string())?;

    // --- Start server ---
    tracing::info!(%addr, "Starting server");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| format!("Failed to bind to {addr}: {e}"))?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .map_err(|e| format!("Server error: {e}"))?;

    cancel.cancel();
    if let Err(e) = sweep.await {
        tracing::warn!(error = %e, "Session sweep task ended abnormally");
    }

    tracing::info!("Graceful shutdown complete");
    Ok(())
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
