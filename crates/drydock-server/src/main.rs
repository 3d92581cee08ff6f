use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use drydock_core::DrydockConfig;
use tokio::net::TcpListener;

#[derive(Parser)]
#[command(
    name = "drydock-server",
    about = "Receive images and deployment files, deploy them with docker stack"
)]
#[command(version)]
struct Cli {
    /// Path to drydock.toml (defaults to ./drydock.toml if present)
    #[arg(long, env = "DRYDOCK_CONFIG")]
    config: Option<PathBuf>,
    /// Address to listen on, e.g. 0.0.0.0:8080
    #[arg(long, env = "DRYDOCK_BIND")]
    bind: Option<String>,
    /// Directory holding <service>/deploy.yml
    #[arg(long, env = "DRYDOCK_DATA_DIR")]
    data_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Before parsing, so .env can supply the DRYDOCK_* variables.
    let dotenv_loaded = dotenvy::dotenv().is_ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
    tracing::debug!(dotenv = dotenv_loaded, "starting drydock-server");

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => DrydockConfig::load_file(path)?,
        None => DrydockConfig::load(Path::new("."))?,
    };
    let mut server = config.server;
    if let Some(bind) = cli.bind {
        server.bind = bind;
    }
    if let Some(data_dir) = cli.data_dir {
        server.data_dir = data_dir;
    }

    let listener = TcpListener::bind(&server.bind)
        .await
        .with_context(|| format!("failed to bind {}", server.bind))?;
    tracing::info!(
        bind = %server.bind,
        data_dir = %server.data_dir.display(),
        docker = %server.docker,
        "drydock-server listening"
    );

    axum::serve(listener, drydock_server::app(&server))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("drydock-server stopped");
    Ok(())
}

async fn shutdown_signal() {
    match termination().await {
        Ok(signal) => tracing::info!(signal, "shutdown requested"),
        Err(e) => {
            tracing::error!(error = %e, "failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
    }
}

/// Ctrl-C, or SIGTERM on unix. Resolves with the signal's name.
async fn termination() -> std::io::Result<&'static str> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut sigterm = signal(SignalKind::terminate())?;
        tokio::select! {
            _ = sigterm.recv() => Ok("SIGTERM"),
            signal = tokio::signal::ctrl_c() => signal.map(|()| "Ctrl-C"),
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await.map(|()| "Ctrl-C")
    }
}
