//! TLS via ACME.
//!
//! Certificate acquisition and renewal are delegated to `rustls-acme`; this
//! module only wires its certificate resolver into a rustls server config
//! and hands back an acceptor for `axum-server`.  Keys and certificates are
//! cached under `<persist>/tls_keys`, so restarts do not re-issue.

use std::sync::Arc;

use futures::StreamExt;
use rustls_acme::axum::AxumAcceptor;
use rustls_acme::caches::DirCache;
use rustls_acme::AcmeConfig;
use tracing::{error, info};

use crate::config::Config;

/// Build the TLS acceptor for `<hostname>` and `www.<hostname>` and spawn
/// the background task that drives ACME order/renewal events.
pub fn acme_acceptor(config: &Config) -> AxumAcceptor {
    let domains = vec![config.hostname.clone(), format!("www.{}", config.hostname)];

    let mut state = AcmeConfig::new(domains)
        .cache(DirCache::new(config.tls_keys_dir()))
        .directory_lets_encrypt(true)
        .state();

    let rustls_config = rustls::ServerConfig::builder()
        .with_no_client_auth()
        .with_cert_resolver(state.resolver());

    let acceptor = state.axum_acceptor(Arc::new(rustls_config));

    tokio::spawn(async move {
        loop {
            match state.next().await {
                Some(Ok(ok)) => info!(event = ?ok, "acme event"),
                Some(Err(err)) => error!(error = %err, "acme error"),
                None => break,
            }
        }
    });

    acceptor
}
