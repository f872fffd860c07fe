//! stockwatch gateway binary.
//!
//! Config path: first CLI argument, else `STOCKWATCH_CONFIG`, else
//! `stockwatch.yaml` in the working directory.

use std::process::ExitCode;

use tracing_subscriber::{fmt, EnvFilter};

use stockwatch_gateway::{app_state::AppState, config, router};

#[tokio::main]
async fn main() -> ExitCode {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("STOCKWATCH_CONFIG").ok())
        .unwrap_or_else(|| config::DEFAULT_PATH.to_string());

    match run(&path).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, config = %path, "stockwatch-gateway failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(path: &str) -> stockwatch_core::Result<()> {
    let cfg = config::load_from_file(path)?;
    let state = AppState::new(cfg)?;
    let listen = state.cfg().server.listen_addr()?;
    let app = router::build_router(state.clone());

    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .map_err(|e| stockwatch_core::StockwatchError::Internal(format!("bind {listen}: {e}")))?;
    tracing::info!(%listen, "stockwatch-gateway starting");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(state))
        .await
        .map_err(|e| stockwatch_core::StockwatchError::Internal(format!("server failed: {e}")))
}

async fn shutdown_signal(state: AppState) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "ctrl-c handler unavailable");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    state.set_draining();
    tracing::info!("signal received, starting graceful shutdown");
}
