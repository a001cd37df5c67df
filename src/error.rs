//! Error taxonomy for the push pipeline.
//!
//! Every failure mode a webhook delivery can hit maps to one variant here,
//! and every variant maps to an HTTP 400 with a human-readable reason.  A
//! repository that has not opted in is *not* an error (see
//! [`crate::repo_config::Resolution`]).

use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Bad or missing webhook signature.  Rejected before any processing.
    #[error("signature verification failed: {0}")]
    Auth(String),
    /// Malformed JSON or a missing required field in the event payload.
    #[error("failed to parse payload: {0}")]
    Parse(String),
    /// A commit-emails.json that exists but cannot be used.
    #[error("invalid commit-emails.json: {0}")]
    Config(String),
    /// Clone or fetch of the bare mirror failed; carries the git stderr.
    #[error("git sync failed: {0}")]
    GitSync(String),
    /// Installation token signing or exchange failed.
    #[error("installation token exchange failed: {0}")]
    InstallationAuth(String),
    /// The notifier subprocess exited non-zero.
    #[error("notifier failed ({status}): {stderr}")]
    Notifier { status: String, stderr: String },
    /// The push pipeline exceeded its deadline.
    #[error("push pipeline timed out after {0:?}")]
    Timeout(Duration),
}

impl PipelineError {
    /// Stable stage label for metrics and logs.
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Auth(_) => "auth",
            Self::Parse(_) => "parse",
            Self::Config(_) => "config",
            Self::GitSync(_) => "git_sync",
            Self::InstallationAuth(_) => "installation_auth",
            Self::Notifier { .. } => "notifier",
            Self::Timeout(_) => "timeout",
        }
    }
}

impl IntoResponse for PipelineError {
    fn into_response(self) -> Response {
        (StatusCode::BAD_REQUEST, self.to_string()).into_response()
    }
}
