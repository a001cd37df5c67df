//! Main axum router and HTTP request handlers for the relay.
//!
//! Routes:
//! - `POST /webhook`  - GitHub webhook receiver (the whole point)
//! - `GET  /`         - static landing page
//! - `GET  /healthz`  - health check
//! - `GET  /metrics`  - Prometheus metrics
//!
//! Response contract for `/webhook`: `200 "Pong"` for pings, `200 "OK"` for
//! pushes (including the opted-out no-op), plain `200` for event kinds with
//! no work attached, and `400 <reason>` for every authentication, parsing,
//! config, sync, or notification failure.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{DefaultBodyLimit, State},
    http::{HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Router,
};
use bytes::Bytes;
use secrecy::ExposeSecret;
use tracing::{debug, info, instrument, warn};

use crate::error::PipelineError;
use crate::events::{self, Event};
use crate::metrics::{EventLabels, StageLabels, SyncLabels, SyncResult};
use crate::pipeline::{self, PushOutcome, GITHUB_HOST};
use crate::AppState;

/// Webhook bodies larger than this are rejected rather than buffered.
const MAX_BODY_BYTES: usize = 1024 * 1024;

static INDEX_HTML: &str = include_str!("../../assets/index.html");

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the axum [`Router`] with all HTTP routes and shared state.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handle_index))
        .route("/webhook", post(handle_webhook))
        .route("/healthz", get(crate::health::health_handler))
        .route("/metrics", get(handle_metrics))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `GET /` -- the landing page, byte-identical regardless of backend state.
async fn handle_index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// `POST /webhook`
#[instrument(skip(state, headers, body))]
async fn handle_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    match process_webhook(&state, &headers, &body).await {
        Ok(response) => response,
        Err(e) => {
            state
                .metrics
                .metrics
                .pipeline_failures_total
                .get_or_create(&StageLabels {
                    stage: e.stage().to_string(),
                })
                .inc();
            warn!(error = %e, "webhook rejected");
            e.into_response()
        }
    }
}

async fn process_webhook(
    state: &AppState,
    headers: &HeaderMap,
    body: &Bytes,
) -> Result<Response, PipelineError> {
    crate::auth::verify_signature(
        state.config.webhook_secret.expose_secret().as_bytes(),
        headers,
        body,
    )?;

    let kind = headers
        .get(events::EVENT_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| PipelineError::Parse("no event type specified".into()))?;

    let event = events::parse(kind, body)?;
    state
        .metrics
        .metrics
        .webhook_events_total
        .get_or_create(&EventLabels {
            event: event.kind().to_string(),
        })
        .inc();

    match &event {
        Event::Ping(ping) => handle_ping(state, ping).await,
        Event::Push(push) => handle_push(state, push).await,
        Event::Installation(ev) | Event::InstallationRepositories(ev) => {
            let account = ev
                .installation
                .account
                .as_ref()
                .map(|a| a.login.as_str())
                .unwrap_or("");
            info!(
                event = event.kind(),
                action = %ev.action,
                account,
                installation_id = ev.installation.id,
                "installation change"
            );
            state.stats.record(event.kind(), None, &ev.action).await;
            Ok(StatusCode::OK.into_response())
        }
        Event::Other { kind } => {
            // Accepted silently so the sender does not build up retries.
            debug!(event = %kind, "ignoring unhandled webhook event kind");
            Ok(StatusCode::OK.into_response())
        }
    }
}

/// Ping: liveness acknowledgment, plus a mirror pre-warm when the payload
/// names a repository.
async fn handle_ping(
    state: &AppState,
    ping: &events::PingEvent,
) -> Result<Response, PipelineError> {
    if let Some(repo) = &ping.repository {
        info!(repo = %repo.full_name, sender = %ping.sender.login, "ping");

        let _guard = state.locks.acquire(&repo.full_name).await;
        let synced = state
            .mirrors
            .sync(GITHUB_HOST, &repo.full_name, &repo.clone_url, &[])
            .await;
        let result = match &synced {
            Ok(_) => SyncResult::Ok,
            Err(_) => SyncResult::Failed,
        };
        state
            .metrics
            .metrics
            .mirror_syncs_total
            .get_or_create(&SyncLabels { result })
            .inc();
        let outcome = if synced.is_ok() { "ok" } else { "failed" };
        state
            .stats
            .record("ping", Some(&repo.full_name), outcome)
            .await;
        synced?;
    } else {
        state.stats.record("ping", None, "ok").await;
    }

    Ok((StatusCode::OK, "Pong").into_response())
}

/// Push: the full pipeline under its deadline.
async fn handle_push(
    state: &AppState,
    push: &events::PushEvent,
) -> Result<Response, PipelineError> {
    let repo = &push.repository;
    info!(
        repo = %repo.full_name,
        git_ref = %push.git_ref,
        sender = %push.sender.login,
        "processing push"
    );

    let started = Instant::now();
    let outcome = match tokio::time::timeout(
        state.config.pipeline_timeout,
        pipeline::handle_push(state, push),
    )
    .await
    {
        Ok(result) => result,
        Err(_) => Err(PipelineError::Timeout(state.config.pipeline_timeout)),
    };
    state
        .metrics
        .metrics
        .pipeline_duration_seconds
        .observe(started.elapsed().as_secs_f64());

    match outcome {
        Ok(PushOutcome::Notified(output)) => {
            info!(
                repo = %repo.full_name,
                git_ref = %push.git_ref,
                before = short_sha(&push.before),
                after = short_sha(&push.after),
                "push notification sent"
            );
            if !output.stdout.trim().is_empty() {
                debug!(stdout = %output.stdout.trim(), "notifier output");
            }
            state.stats.record("push", Some(&repo.full_name), "ok").await;
            Ok((StatusCode::OK, "OK").into_response())
        }
        Ok(PushOutcome::NotOptedIn) => {
            state
                .stats
                .record("push", Some(&repo.full_name), "not-opted-in")
                .await;
            Ok((StatusCode::OK, "OK").into_response())
        }
        Err(e) => {
            state
                .stats
                .record("push", Some(&repo.full_name), "failed")
                .await;
            Err(e)
        }
    }
}

/// `GET /metrics`
///
/// Returns Prometheus metrics collected by the relay.
async fn handle_metrics(State(state): State<Arc<AppState>>) -> Response {
    let mut buf = String::new();
    match prometheus_client::encoding::text::encode(&mut buf, &state.metrics.registry) {
        Ok(()) => (
            StatusCode::OK,
            [(
                axum::http::header::CONTENT_TYPE,
                "application/openmetrics-text; version=1.0.0; charset=utf-8",
            )],
            buf,
        )
            .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("metrics encoding failed: {e}"),
        )
            .into_response(),
    }
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn short_sha(sha: &str) -> &str {
    sha.get(..8).unwrap_or(sha)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_sha_truncates_long_values() {
        assert_eq!(short_sha("0123456789abcdef"), "01234567");
    }

    #[test]
    fn short_sha_keeps_short_values() {
        assert_eq!(short_sha("012"), "012");
    }
}
