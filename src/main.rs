use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use commitmail::config::Config;
use commitmail::git::MirrorStore;
use commitmail::github::InstallationAuthenticator;
use commitmail::locks::RepoLocks;
use commitmail::metrics::MetricsRegistry;
use commitmail::notify::MultimailNotifier;
use commitmail::stats::StatsLog;
use commitmail::{http, tls, AppState};

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(name = "commitmail", about = "GitHub push-to-email notification relay")]
struct Cli {
    /// TLS hostname (use localhost to disable https).
    #[arg(long, env = "TLS_HOSTNAME")]
    hostname: String,

    /// Directory for persistent data.
    #[arg(long, env = "PERSIST_PATH", default_value = "persist")]
    persist: PathBuf,

    /// Port to listen on.
    #[arg(long, env = "PORT", default_value_t = 443)]
    port: u16,
}

// ---------------------------------------------------------------------------
// Graceful shutdown
// ---------------------------------------------------------------------------

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("received SIGINT"),
        () = terminate => info!("received SIGTERM"),
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    // ---- TLS crypto provider (must be installed before any rustls usage) ----
    rustls::crypto::aws_lc_rs::default_provider()
        .install_default()
        .expect("failed to install rustls CryptoProvider");

    // ---- CLI ----
    let cli = Cli::parse();

    // ---- Tracing ----
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    // ---- Config ----
    let config = Config::from_parts(cli.hostname, cli.persist, cli.port)?;
    let config = Arc::new(config);

    info!(hostname = %config.hostname, port = config.port, "starting commitmail");

    if config.smtp_password.is_none() {
        warn!("no MAIL_SMTP_PASSWORD set, notifier will print to stdout");
    }
    if config.github_app.is_none() {
        info!("no GitHub App credentials; fetching anonymously (public repositories only)");
    }

    // ---- Persistent directories ----
    tokio::fs::create_dir_all(config.repos_dir())
        .await
        .with_context(|| format!("failed to create repos dir: {}", config.repos_dir().display()))?;
    tokio::fs::create_dir_all(config.tls_keys_dir())
        .await
        .context("failed to create tls_keys dir")?;

    // ---- Shared state ----
    let stats = StatsLog::open(&config.stats_log_path()).await?;
    let installation_auth = config
        .github_app
        .as_ref()
        .map(|app| Arc::new(InstallationAuthenticator::new(app, config.github_api_base.clone())));

    let state = AppState {
        config: Arc::clone(&config),
        mirrors: MirrorStore::new(config.repos_dir()),
        locks: RepoLocks::new(),
        stats,
        metrics: MetricsRegistry::new(),
        notifier: Arc::new(MultimailNotifier::from_config(&config)),
        installation_auth,
    };

    let app = http::create_router(Arc::new(state));
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));

    // ---- Serve ----
    if config.insecure {
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind HTTP listener on {addr}"))?;

        info!(%addr, "HTTP server listening (TLS disabled)");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .context("HTTP server error")?;
    } else {
        let acceptor = tls::acme_acceptor(&config);
        let handle = axum_server::Handle::new();

        tokio::spawn({
            let handle = handle.clone();
            let grace = config.shutdown_grace;
            async move {
                shutdown_signal().await;
                handle.graceful_shutdown(Some(grace));
            }
        });

        info!(%addr, hostname = %config.hostname, "HTTPS server listening");

        axum_server::bind(addr)
            .acceptor(acceptor)
            .handle(handle)
            .serve(app.into_make_service())
            .await
            .context("HTTPS server error")?;
    }

    info!("commitmail shut down cleanly");
    Ok(())
}
