//! The push pipeline.
//!
//! Sequencing for one authenticated push event: installation token →
//! mirror sync → config resolution → notifier dispatch.  Every step either
//! advances or aborts the whole push with a [`PipelineError`]; nothing is
//! retried here (delivery retry belongs to the webhook sender).

use tracing::info;

use crate::error::PipelineError;
use crate::events::PushEvent;
use crate::metrics::{SyncLabels, SyncResult};
use crate::notify::{NotifyOutput, NotifyRequest};
use crate::repo_config::{self, Resolution};
use crate::AppState;

/// The only source host currently relayed.
pub const GITHUB_HOST: &str = "github.com";

#[derive(Debug)]
pub enum PushOutcome {
    /// The notifier ran; carries its captured stdout.
    Notified(NotifyOutput),
    /// No commit-emails.json at HEAD -- success, nothing sent.
    NotOptedIn,
}

/// Run the full pipeline for one push.
///
/// Holds the repository lock for the duration: the sync must not race a
/// concurrent delivery for the same repository, and the notifier reads the
/// mirror afterwards, so the mirror has to stay put until it finishes.
pub async fn handle_push(
    state: &AppState,
    event: &PushEvent,
) -> Result<PushOutcome, PipelineError> {
    let repo = &event.repository;
    let _guard = state.locks.acquire(&repo.full_name).await;

    // Installation tokens are minted per push, never cached or retried.
    let env_vars = match (&state.installation_auth, event.installation) {
        (Some(auth), Some(installation)) => auth.token(installation.id).await?.git_env(),
        _ => Vec::new(),
    };

    let synced = state
        .mirrors
        .sync(GITHUB_HOST, &repo.full_name, &repo.clone_url, &env_vars)
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
    let mirror = synced?;

    let config = match repo_config::resolve(&mirror).await? {
        Resolution::Configured(config) => config,
        Resolution::NotOptedIn => {
            info!(
                repo = %repo.full_name,
                "repository has no commit-emails.json; skipping notification"
            );
            return Ok(PushOutcome::NotOptedIn);
        }
    };

    let request = NotifyRequest {
        git_dir: mirror,
        config,
        before: event.before.clone(),
        after: event.after.clone(),
        git_ref: event.git_ref.clone(),
        pusher: event.pusher.name.clone(),
    };

    state.metrics.metrics.notifier_invocations_total.inc();
    match state.notifier.notify(&request).await {
        Ok(output) => Ok(PushOutcome::Notified(output)),
        Err(e) => {
            state.metrics.metrics.notifier_failures_total.inc();
            Err(e)
        }
    }
}
